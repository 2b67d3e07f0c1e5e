// Core EXT4 on-disk definitions used by the fingerprint

pub mod checksum;
pub mod constants;
pub mod structures;

// Re-export commonly used items
pub use checksum::crc32c_ext4;
pub use constants::*;
pub use structures::Ext4Superblock;
