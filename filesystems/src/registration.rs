use checkfs_core::{AdapterRegistry, FilesystemAdapter, FixedFingerprint, GateConfig};
use log::warn;
use std::sync::Arc;

use crate::families::ext::Ext4Adapter;
use crate::families::none::NoneAdapter;
use crate::families::xfs::XfsAdapter;

/// Register all built-in adapters in priority order: ext4, xfs, none
pub fn register_builtin_adapters(registry: &mut AdapterRegistry, config: &GateConfig) {
    let ext4 = match config.debug_fingerprint() {
        Some(fingerprint) => {
            warn!("DEBUG! ext4 fingerprint fixed to {}", fingerprint);
            Ext4Adapter::with_source(Arc::new(FixedFingerprint(fingerprint)))
        }
        None => Ext4Adapter::new(),
    };

    registry.register(Arc::new(ext4) as Arc<dyn FilesystemAdapter>);
    registry.register(Arc::new(XfsAdapter) as Arc<dyn FilesystemAdapter>);
    registry.register(Arc::new(NoneAdapter) as Arc<dyn FilesystemAdapter>);
}

/// Registry holding the built-in adapters
pub fn builtin_registry(config: &GateConfig) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    register_builtin_adapters(&mut registry, config);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkfs_core::test_utils::{MockDeviceOpener, MockDisk, MockMountProbe};
    use checkfs_core::{AvailabilityGate, CheckParameters, DeviceId, ErrorKind, FilesystemKind, CHECK_PARAMETERS_SIZE_EXT4};

    #[test]
    fn test_priority_order() {
        let registry = builtin_registry(&GateConfig::default());
        assert_eq!(
            registry.kinds(),
            vec![FilesystemKind::Ext4, FilesystemKind::Xfs, FilesystemKind::Unknown]
        );
    }

    #[test]
    fn test_reregistering_keeps_position() {
        let mut registry = builtin_registry(&GateConfig::default());
        registry.register(Arc::new(Ext4Adapter::new()));
        assert_eq!(registry.kinds()[0], FilesystemKind::Ext4);
        assert_eq!(registry.kinds().len(), 3);
    }

    #[test]
    fn test_tiny_device_falls_through_to_unsupported() {
        let disk = MockDisk::new(DeviceId::new(7, 5), vec![0u8; 1024]);
        let gate = AvailabilityGate::new(
            Arc::new(MockDeviceOpener::new(&[disk.clone()])),
            Arc::new(MockMountProbe::new(&[disk.clone()])),
            builtin_registry(&GateConfig::default()),
        );

        let status = gate.check_store_available(disk.id()).unwrap_err();
        assert_eq!(status.error_code(), ErrorKind::Unsupported);

        let params = CheckParameters::from_bytes(vec![0u8; CHECK_PARAMETERS_SIZE_EXT4 as usize]);
        let err = gate.check_tracker_available(disk.id(), Some(&params)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(disk.opens(), disk.closes());
    }
}
