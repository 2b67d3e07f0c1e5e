// EXT4 Filesystem Constants
// Only what the fingerprint needs from the superblock

// Superblock location and size
pub const EXT4_SUPERBLOCK_OFFSET: u64 = 1024;
pub const EXT4_SUPERBLOCK_SIZE: usize = 1024;

// Magic numbers
pub const EXT4_SUPER_MAGIC: u16 = 0xEF53;

// Superblock field offsets
pub const EXT4_S_MTIME: usize = 0x2C;
pub const EXT4_S_WTIME: usize = 0x30;
pub const EXT4_S_MNT_COUNT: usize = 0x34;
pub const EXT4_S_MAGIC: usize = 0x38;
pub const EXT4_S_STATE: usize = 0x3A;
pub const EXT4_S_FEATURE_COMPAT: usize = 0x5C;
pub const EXT4_S_FEATURE_INCOMPAT: usize = 0x60;
pub const EXT4_S_FEATURE_RO_COMPAT: usize = 0x64;
pub const EXT4_S_UUID: usize = 0x68;
pub const EXT4_S_CHECKSUM_TYPE: usize = 0x175;
pub const EXT4_S_CHECKSUM: usize = 0x3FC;

// Feature flags - Compatible
pub const EXT4_FEATURE_COMPAT_HAS_JOURNAL: u32 = 0x0004;

// Feature flags - Incompatible
pub const EXT4_FEATURE_INCOMPAT_RECOVER: u32 = 0x0004;
pub const EXT4_FEATURE_INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
pub const EXT4_FEATURE_INCOMPAT_EXTENTS: u32 = 0x0040;
pub const EXT4_FEATURE_INCOMPAT_64BIT: u32 = 0x0080;
pub const EXT4_FEATURE_INCOMPAT_FLEX_BG: u32 = 0x0200;

// Feature flags - Read-only compatible
pub const EXT4_FEATURE_RO_COMPAT_METADATA_CSUM: u32 = 0x0400;

// Filesystem states
pub const EXT4_VALID_FS: u16 = 0x0001;    // Cleanly unmounted
pub const EXT4_ERROR_FS: u16 = 0x0002;    // Errors detected
pub const EXT4_ORPHAN_FS: u16 = 0x0004;   // Orphans being recovered

// Checksum types
pub const EXT4_CRC32C_CHKSUM: u8 = 1;
