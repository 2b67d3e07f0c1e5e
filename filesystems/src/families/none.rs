// Placeholder adapter for filesystems nothing else recognises

use checkfs_core::{
    BlockDevice, Capture, CheckFsError, FilesystemAdapter, FilesystemKind, Fingerprint, Verdict,
};

/// Filesystem kind unknown: every operation is Unsupported.
#[derive(Debug, Default)]
pub struct NoneAdapter;

impl FilesystemAdapter for NoneAdapter {
    fn kind(&self) -> FilesystemKind {
        FilesystemKind::Unknown
    }

    fn record_size(&self) -> u32 {
        0
    }

    fn compute_fingerprint_at_unmount(&self, _device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError> {
        Ok(Capture::Unsupported)
    }

    fn verify_fingerprint(&self, _device: &mut dyn BlockDevice, _stored: Fingerprint) -> Result<Verdict, CheckFsError> {
        Ok(Verdict::Unsupported)
    }
}
