// ext4 fingerprint adapter: superblock CRC captured at unmount

use super::core::{checksum::crc32c_ext4, constants::EXT4_FEATURE_INCOMPAT_JOURNAL_DEV, structures::Ext4Superblock};
use checkfs_core::{
    BlockDevice, Capture, CheckFsError, FilesystemAdapter, FilesystemKind, Fingerprint, FingerprintSource,
    Verdict, CHECK_PARAMETERS_SIZE_EXT4,
};
use log::{debug, info, warn};
use std::sync::Arc;

/// Production fingerprint: CRC32c over the whole 1024-byte superblock.
///
/// Any mount, even read-only, rewrites the mount count and times in the
/// superblock, so the value changes whenever the filesystem was touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperblockCrc;

impl FingerprintSource for SuperblockCrc {
    fn fingerprint(&self, metadata: &[u8]) -> Fingerprint {
        Fingerprint::new(crc32c_ext4(metadata, !0))
    }
}

pub struct Ext4Adapter {
    source: Arc<dyn FingerprintSource>,
}

impl Ext4Adapter {
    pub fn new() -> Self {
        Self::with_source(Arc::new(SuperblockCrc))
    }

    pub fn with_source(source: Arc<dyn FingerprintSource>) -> Self {
        Self { source }
    }

    fn superblock(device: &mut dyn BlockDevice) -> Result<Option<Ext4Superblock>, CheckFsError> {
        let sb = match Ext4Superblock::read(device) {
            Ok(sb) => sb,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Device [{}] is too small for an ext superblock", device.id());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if !sb.is_valid_magic() {
            debug!("No ext superblock magic on device [{}] (found 0x{:04X})", device.id(), sb.s_magic());
            return Ok(None);
        }
        if sb.has_feature_incompat(EXT4_FEATURE_INCOMPAT_JOURNAL_DEV) {
            debug!("Device [{}] is an external ext journal, not a filesystem", device.id());
            return Ok(None);
        }
        Ok(Some(sb))
    }
}

impl Default for Ext4Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesystemAdapter for Ext4Adapter {
    fn kind(&self) -> FilesystemKind {
        FilesystemKind::Ext4
    }

    fn record_size(&self) -> u32 {
        CHECK_PARAMETERS_SIZE_EXT4
    }

    fn compute_fingerprint_at_unmount(&self, device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError> {
        let Some(sb) = Self::superblock(device)? else {
            return Ok(Capture::Unsupported);
        };

        if let Some(reason) = sb.unclean_reason() {
            warn!("Device [{}] was not unmounted cleanly: {}", device.id(), reason);
            return Err(CheckFsError::NotCleanlyUnmounted {
                device: device.id(),
                reason,
            });
        }
        sb.verify_checksum().map_err(|reason| {
            CheckFsError::CorruptMetadata(format!("device [{}]: {}", device.id(), reason))
        })?;

        let fingerprint = self.source.fingerprint(sb.as_bytes());
        info!(
            "ext4 superblock on device [{}]: uuid {}, mount count {}, last write {}, fingerprint {}",
            device.id(),
            sb.uuid_string(),
            sb.s_mnt_count(),
            sb.s_wtime(),
            fingerprint
        );
        Ok(Capture::Fingerprint(fingerprint))
    }

    fn verify_fingerprint(&self, device: &mut dyn BlockDevice, stored: Fingerprint) -> Result<Verdict, CheckFsError> {
        let Some(sb) = Self::superblock(device)? else {
            return Ok(Verdict::Unsupported);
        };

        let current = self.source.fingerprint(sb.as_bytes());
        if let Err(reason) = sb.verify_checksum() {
            warn!("Device [{}] superblock is not trustworthy: {}", device.id(), reason);
            return Ok(Verdict::Mismatch { current });
        }

        if current == stored {
            debug!("Device [{}] superblock fingerprint {} unchanged", device.id(), current);
            Ok(Verdict::Match)
        } else {
            info!(
                "ext4 superblock on device [{}] (uuid {}) changed: mount count {}, last write {}",
                device.id(),
                sb.uuid_string(),
                sb.s_mnt_count(),
                sb.s_wtime()
            );
            Ok(Verdict::Mismatch { current })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{blank_image, init_test_logging, simulate_offline_mount, xfs_image, Ext4ImageBuilder};
    use checkfs_core::test_utils::{MockDeviceOpener, MockDisk};
    use checkfs_core::{DeviceId, DeviceOpener, ErrorKind, FixedFingerprint};

    const DISK: DeviceId = DeviceId::new(8, 16);

    fn open(disk: &MockDisk) -> Box<dyn BlockDevice> {
        MockDeviceOpener::new(&[disk.clone()]).open(disk.id()).unwrap()
    }

    fn capture(adapter: &Ext4Adapter, disk: &MockDisk) -> Fingerprint {
        match adapter.compute_fingerprint_at_unmount(open(disk).as_mut()).unwrap() {
            Capture::Fingerprint(f) => f,
            Capture::Unsupported => panic!("ext4 image not recognised"),
        }
    }

    #[test]
    fn test_same_fingerprint_matches() {
        init_test_logging();
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().build());
        let fp = capture(&adapter, &disk);

        let verdict = adapter.verify_fingerprint(open(&disk).as_mut(), fp).unwrap();
        assert_eq!(verdict, Verdict::Match);
    }

    #[test]
    fn test_any_bit_difference_mismatches() {
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().build());
        let fp = capture(&adapter, &disk);

        for bit in [0u32, 1, 8, 31] {
            let other = Fingerprint::new(fp.value() ^ (1 << bit));
            let verdict = adapter.verify_fingerprint(open(&disk).as_mut(), other).unwrap();
            assert_eq!(verdict, Verdict::Mismatch { current: fp });
        }
    }

    #[test]
    fn test_offline_mount_changes_fingerprint() {
        let adapter = Ext4Adapter::new();
        let mut image = Ext4ImageBuilder::new().metadata_csum(true).build();
        let disk = MockDisk::new(DISK, image.clone());
        let fp = capture(&adapter, &disk);

        simulate_offline_mount(&mut image);
        disk.write(0, &image);

        let verdict = adapter.verify_fingerprint(open(&disk).as_mut(), fp).unwrap();
        assert!(matches!(verdict, Verdict::Mismatch { current } if current != fp));
    }

    #[test]
    fn test_non_ext_device_is_unsupported() {
        let adapter = Ext4Adapter::new();
        for image in [xfs_image(), blank_image()] {
            let disk = MockDisk::new(DISK, image);
            let capture = adapter.compute_fingerprint_at_unmount(open(&disk).as_mut()).unwrap();
            assert_eq!(capture, Capture::Unsupported);
            let verdict = adapter
                .verify_fingerprint(open(&disk).as_mut(), Fingerprint::new(0))
                .unwrap();
            assert_eq!(verdict, Verdict::Unsupported);
        }
    }

    #[test]
    fn test_device_too_small_for_superblock_is_unsupported() {
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, vec![0u8; 1024]);
        assert_eq!(
            adapter.compute_fingerprint_at_unmount(open(&disk).as_mut()).unwrap(),
            Capture::Unsupported
        );
        assert_eq!(
            adapter.verify_fingerprint(open(&disk).as_mut(), Fingerprint::new(0)).unwrap(),
            Verdict::Unsupported
        );
    }

    #[test]
    fn test_unclean_filesystem_refused_at_capture() {
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().needs_recovery(true).build());
        let err = adapter.compute_fingerprint_at_unmount(open(&disk).as_mut()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotCleanlyUnmounted);
    }

    #[test]
    fn test_corrupt_checksum() {
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().metadata_csum(true).build());
        let fp = capture(&adapter, &disk);

        // Flip a byte without fixing up s_checksum
        disk.write(1024 + 0x100, &[0x42]);

        let err = adapter.compute_fingerprint_at_unmount(open(&disk).as_mut()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptMetadata);
        let verdict = adapter.verify_fingerprint(open(&disk).as_mut(), fp).unwrap();
        assert!(matches!(verdict, Verdict::Mismatch { .. }));
    }

    #[test]
    fn test_fixed_source_follows_same_checks() {
        let fixed = Fingerprint::new(0x0BAD_F00D);
        let adapter = Ext4Adapter::with_source(Arc::new(FixedFingerprint(fixed)));

        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().build());
        assert_eq!(capture(&adapter, &disk), fixed);

        let dirty = MockDisk::new(DISK, Ext4ImageBuilder::new().state(0).build());
        assert!(adapter.compute_fingerprint_at_unmount(open(&dirty).as_mut()).is_err());

        let blank = MockDisk::new(DISK, blank_image());
        assert_eq!(
            adapter.compute_fingerprint_at_unmount(open(&blank).as_mut()).unwrap(),
            Capture::Unsupported
        );
    }

    #[test]
    fn test_read_error_propagates() {
        let adapter = Ext4Adapter::new();
        let disk = MockDisk::new(DISK, Ext4ImageBuilder::new().build());
        disk.fail_reads(true);
        let err = adapter.compute_fingerprint_at_unmount(open(&disk).as_mut()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
