// EXT4 native support: superblock parsing and the fingerprint adapter
// The same superblock layout covers ext2 and ext3, so one adapter serves the family.

pub mod adapter;
pub mod core;

pub use self::adapter::{Ext4Adapter, SuperblockCrc};

use self::core::constants::*;
use crate::detection::FilesystemDetector;
use checkfs_core::FilesystemKind;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtVersion {
    Ext2,
    Ext3,
    Ext4,
}

/// Detect the ext filesystem version from superblock feature words
pub fn detect_ext_version(compat: u32, incompat: u32, ro_compat: u32) -> ExtVersion {
    let has_journal = compat & EXT4_FEATURE_COMPAT_HAS_JOURNAL != 0;
    let has_extents = incompat & EXT4_FEATURE_INCOMPAT_EXTENTS != 0;
    let has_64bit = incompat & EXT4_FEATURE_INCOMPAT_64BIT != 0;
    let has_flex_bg = incompat & EXT4_FEATURE_INCOMPAT_FLEX_BG != 0;
    let has_metadata_csum = ro_compat & EXT4_FEATURE_RO_COMPAT_METADATA_CSUM != 0;

    if has_extents || has_64bit || has_flex_bg || has_metadata_csum {
        ExtVersion::Ext4
    } else if has_journal {
        ExtVersion::Ext3
    } else {
        ExtVersion::Ext2
    }
}

pub struct ExtDetector;

impl FilesystemDetector for ExtDetector {
    fn detect(_boot_sector: &[u8], ext_superblock: Option<&[u8]>) -> Option<FilesystemKind> {
        // ext2/3/4 filesystems have their superblock at offset 1024
        let sb = ext_superblock?;
        if sb.len() < EXT4_S_FEATURE_RO_COMPAT + 4 {
            return None;
        }
        let magic = u16::from_le_bytes([sb[EXT4_S_MAGIC], sb[EXT4_S_MAGIC + 1]]);
        if magic != EXT4_SUPER_MAGIC {
            return None;
        }
        // An external journal device carries the magic but no filesystem
        let word = |at: usize| u32::from_le_bytes([sb[at], sb[at + 1], sb[at + 2], sb[at + 3]]);
        if word(EXT4_S_FEATURE_INCOMPAT) & EXT4_FEATURE_INCOMPAT_JOURNAL_DEV != 0 {
            return None;
        }
        let version = detect_ext_version(
            word(EXT4_S_FEATURE_COMPAT),
            word(EXT4_S_FEATURE_INCOMPAT),
            word(EXT4_S_FEATURE_RO_COMPAT),
        );
        debug!("Detected {:?} superblock", version);
        Some(FilesystemKind::Ext4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_features() {
        assert_eq!(detect_ext_version(0, 0, 0), ExtVersion::Ext2);
        assert_eq!(detect_ext_version(EXT4_FEATURE_COMPAT_HAS_JOURNAL, 0, 0), ExtVersion::Ext3);
        assert_eq!(
            detect_ext_version(EXT4_FEATURE_COMPAT_HAS_JOURNAL, EXT4_FEATURE_INCOMPAT_EXTENTS, 0),
            ExtVersion::Ext4
        );
        assert_eq!(detect_ext_version(0, 0, EXT4_FEATURE_RO_COMPAT_METADATA_CSUM), ExtVersion::Ext4);
    }

    #[test]
    fn test_journal_device_not_detected() {
        let mut sb = vec![0u8; 1024];
        sb[EXT4_S_MAGIC..EXT4_S_MAGIC + 2].copy_from_slice(&EXT4_SUPER_MAGIC.to_le_bytes());
        assert_eq!(ExtDetector::detect(&[], Some(&sb)), Some(FilesystemKind::Ext4));

        sb[EXT4_S_FEATURE_INCOMPAT..EXT4_S_FEATURE_INCOMPAT + 4]
            .copy_from_slice(&EXT4_FEATURE_INCOMPAT_JOURNAL_DEV.to_le_bytes());
        assert_eq!(ExtDetector::detect(&[], Some(&sb)), None);
    }
}
