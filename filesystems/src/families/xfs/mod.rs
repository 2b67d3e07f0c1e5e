// XFS slot: recognised on disk, not fingerprinted yet
//
// Both adapter operations report Unsupported so the gate falls through to
// the next adapter and, failing that, denies. Fingerprinting XFS needs the
// primary superblock CRC (sb_crc at 0xE0) on v5 filesystems.

use crate::detection::FilesystemDetector;
use checkfs_core::{
    BlockDevice, Capture, CheckFsError, FilesystemAdapter, FilesystemKind, Fingerprint, Verdict,
    CHECK_PARAMETERS_SIZE_XFS,
};
use log::warn;

/// "XFSB", stored big-endian at offset 0 of the primary superblock
pub const XFS_SB_MAGIC: u32 = 0x5846_5342;

pub struct XfsDetector;

impl FilesystemDetector for XfsDetector {
    fn detect(boot_sector: &[u8], _ext_superblock: Option<&[u8]>) -> Option<FilesystemKind> {
        let magic = boot_sector.get(..4)?;
        if u32::from_be_bytes([magic[0], magic[1], magic[2], magic[3]]) == XFS_SB_MAGIC {
            Some(FilesystemKind::Xfs)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct XfsAdapter;

impl XfsAdapter {
    fn note_if_xfs(device: &mut dyn BlockDevice) {
        let mut sector = [0u8; 512];
        if device.read_at(0, &mut sector).is_ok() && XfsDetector::detect(&sector, None).is_some() {
            warn!(
                "Device [{}] carries XFS; offline change detection is not available for it",
                device.id()
            );
        }
    }
}

impl FilesystemAdapter for XfsAdapter {
    fn kind(&self) -> FilesystemKind {
        FilesystemKind::Xfs
    }

    fn record_size(&self) -> u32 {
        CHECK_PARAMETERS_SIZE_XFS
    }

    fn compute_fingerprint_at_unmount(&self, device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError> {
        Self::note_if_xfs(device);
        Ok(Capture::Unsupported)
    }

    fn verify_fingerprint(&self, device: &mut dyn BlockDevice, _stored: Fingerprint) -> Result<Verdict, CheckFsError> {
        Self::note_if_xfs(device);
        Ok(Verdict::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{xfs_image, Ext4ImageBuilder};
    use checkfs_core::test_utils::{MockDeviceOpener, MockDisk};
    use checkfs_core::{DeviceId, DeviceOpener};

    #[test]
    fn test_xfs_is_recognised_but_unsupported() {
        let disk = MockDisk::new(DeviceId::new(8, 32), xfs_image());
        let opener = MockDeviceOpener::new(&[disk.clone()]);
        let adapter = XfsAdapter;

        let mut device = opener.open(disk.id()).unwrap();
        assert_eq!(
            adapter.compute_fingerprint_at_unmount(device.as_mut()).unwrap(),
            Capture::Unsupported
        );
        assert_eq!(
            adapter.verify_fingerprint(device.as_mut(), Fingerprint::new(1)).unwrap(),
            Verdict::Unsupported
        );
    }

    #[test]
    fn test_unreadable_device_still_unsupported() {
        let disk = MockDisk::new(DeviceId::new(8, 32), Ext4ImageBuilder::new().build());
        disk.fail_reads(true);
        let mut device = MockDeviceOpener::new(&[disk.clone()]).open(disk.id()).unwrap();
        assert_eq!(
            XfsAdapter.compute_fingerprint_at_unmount(device.as_mut()).unwrap(),
            Capture::Unsupported
        );
    }

    #[test]
    fn test_detector() {
        assert_eq!(XfsDetector::detect(&xfs_image(), None), Some(FilesystemKind::Xfs));
        assert_eq!(XfsDetector::detect(&[0u8; 512], None), None);
        assert_eq!(XfsDetector::detect(&[0x58], None), None);
    }
}
