// On-disk signature probing, used for diagnostics only

use checkfs_core::{BlockDevice, CheckFsError, FilesystemKind};

/// Recognises one filesystem family from its on-disk signature.
pub trait FilesystemDetector {
    /// `sector0` is the first 512 bytes of the device; `ext_superblock` the
    /// 1024 bytes at offset 1024, absent on devices too small to hold them.
    fn detect(sector0: &[u8], ext_superblock: Option<&[u8]>) -> Option<FilesystemKind>;
}

/// Reads sector 0 and the ext superblock area.
pub fn read_detection_data(device: &mut dyn BlockDevice) -> Result<(Vec<u8>, Option<Vec<u8>>), CheckFsError> {
    let mut boot_sector = vec![0u8; 512];
    device.read_at(0, &mut boot_sector)?;

    // Devices smaller than 2 KiB cannot hold an ext superblock
    let mut buffer = vec![0u8; 1024];
    let ext_superblock = match device.read_at(1024, &mut buffer) {
        Ok(()) => Some(buffer),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(e.into()),
    };

    Ok((boot_sector, ext_superblock))
}

/// Filesystem on `device`, checked in adapter priority order.
pub fn detect_filesystem_kind(device: &mut dyn BlockDevice) -> Result<FilesystemKind, CheckFsError> {
    let (boot_sector, ext_superblock) = read_detection_data(device)?;

    if let Some(kind) = crate::families::ext::ExtDetector::detect(&boot_sector, ext_superblock.as_deref()) {
        return Ok(kind);
    }

    if let Some(kind) = crate::families::xfs::XfsDetector::detect(&boot_sector, ext_superblock.as_deref()) {
        return Ok(kind);
    }

    Ok(FilesystemKind::Unknown)
}
