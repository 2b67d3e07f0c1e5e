// CRC32c checksum implementation for ext4
// CRITICAL: Must use CRC32c (Castagnoli), NOT standard CRC32!

use super::constants::EXT4_S_CHECKSUM;

/// Calculate CRC32c checksum as used by ext4
/// ext4 uses reflected CRC32c with specific initial/final XOR values
pub fn crc32c_ext4(data: &[u8], initial: u32) -> u32 {
    // ext4 inverts the initial value and the result
    !crc32c::crc32c_append(!initial, data)
}

/// Calculate superblock checksum
/// The checksum covers all bytes except the checksum field itself
pub fn calculate_superblock_checksum(sb_bytes: &[u8]) -> u32 {
    crc32c_ext4(&sb_bytes[..EXT4_S_CHECKSUM.min(sb_bytes.len())], !0)
}
