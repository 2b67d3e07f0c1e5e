pub mod device;
pub mod mount;

#[cfg(target_os = "linux")]
pub mod linux;

pub use device::{FileBlockDevice, ImageDeviceOpener};
pub use mount::{parse_mountinfo, MountEntry, MountInfoProbe};

#[cfg(target_os = "linux")]
pub use linux::{device_id_for_path, LinuxDeviceOpener};

use checkfs_core::{AvailabilityGate, BlockDevice, CheckFsError, DeviceId, DeviceOpener, GateConfig};
use std::sync::Arc;

/// Opens configured images first, then real block devices.
pub struct PlatformDeviceOpener {
    images: ImageDeviceOpener,
    #[cfg(target_os = "linux")]
    devices: LinuxDeviceOpener,
}

impl PlatformDeviceOpener {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            images: ImageDeviceOpener::new(config.images.clone()),
            #[cfg(target_os = "linux")]
            devices: LinuxDeviceOpener::new(&config.sysfs_root, &config.dev_root),
        }
    }
}

impl DeviceOpener for PlatformDeviceOpener {
    fn open(&self, device: DeviceId) -> Result<Box<dyn BlockDevice>, CheckFsError> {
        if self.images.contains(device) {
            return self.images.open(device);
        }
        #[cfg(target_os = "linux")]
        {
            self.devices.open(device)
        }
        #[cfg(not(target_os = "linux"))]
        {
            self.images.open(device)
        }
    }
}

/// Gate wired to the host: platform opener, mountinfo probe and the
/// built-in adapters.
pub fn gate_from_config(config: &GateConfig) -> AvailabilityGate {
    AvailabilityGate::new(
        Arc::new(PlatformDeviceOpener::from_config(config)),
        Arc::new(MountInfoProbe::new(&config.mountinfo_path).with_sysfs_root(&config.sysfs_root)),
        checkfs_filesystems::builtin_registry(config),
    )
}
