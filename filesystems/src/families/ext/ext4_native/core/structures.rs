// EXT4 superblock, read-only view
// Located at byte offset 1024 from the beginning of the device

use super::checksum::calculate_superblock_checksum;
use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use checkfs_core::BlockDevice;
use static_assertions::const_assert_eq;

const_assert_eq!(EXT4_S_CHECKSUM + 4, EXT4_SUPERBLOCK_SIZE);

/// Raw superblock bytes with accessors for the fields the fingerprint
/// depends on.
#[derive(Clone)]
pub struct Ext4Superblock {
    raw: [u8; EXT4_SUPERBLOCK_SIZE],
}

impl Ext4Superblock {
    pub fn read(device: &mut dyn BlockDevice) -> std::io::Result<Self> {
        let mut raw = [0u8; EXT4_SUPERBLOCK_SIZE];
        device.read_at(EXT4_SUPERBLOCK_OFFSET, &mut raw)?;
        Ok(Self { raw })
    }

    pub fn from_bytes(raw: [u8; EXT4_SUPERBLOCK_SIZE]) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    fn u16_at(&self, offset: usize) -> u16 {
        LittleEndian::read_u16(&self.raw[offset..])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.raw[offset..])
    }

    pub fn s_magic(&self) -> u16 {
        self.u16_at(EXT4_S_MAGIC)
    }

    pub fn s_state(&self) -> u16 {
        self.u16_at(EXT4_S_STATE)
    }

    pub fn s_wtime(&self) -> u32 {
        self.u32_at(EXT4_S_WTIME)
    }

    pub fn s_mnt_count(&self) -> u16 {
        self.u16_at(EXT4_S_MNT_COUNT)
    }

    pub fn s_feature_incompat(&self) -> u32 {
        self.u32_at(EXT4_S_FEATURE_INCOMPAT)
    }

    pub fn s_feature_ro_compat(&self) -> u32 {
        self.u32_at(EXT4_S_FEATURE_RO_COMPAT)
    }

    pub fn s_uuid(&self) -> [u8; 16] {
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&self.raw[EXT4_S_UUID..EXT4_S_UUID + 16]);
        uuid
    }

    /// `s_uuid` in the usual 8-4-4-4-12 form.
    pub fn uuid_string(&self) -> String {
        let u = self.s_uuid();
        let hex = |range: std::ops::Range<usize>| u[range].iter().map(|b| format!("{:02x}", b)).collect::<String>();
        format!("{}-{}-{}-{}-{}", hex(0..4), hex(4..6), hex(6..8), hex(8..10), hex(10..16))
    }

    pub fn s_checksum_type(&self) -> u8 {
        self.raw[EXT4_S_CHECKSUM_TYPE]
    }

    pub fn s_checksum(&self) -> u32 {
        self.u32_at(EXT4_S_CHECKSUM)
    }

    pub fn is_valid_magic(&self) -> bool {
        self.s_magic() == EXT4_SUPER_MAGIC
    }

    pub fn has_feature_incompat(&self, feature: u32) -> bool {
        self.s_feature_incompat() & feature != 0
    }

    pub fn has_feature_ro_compat(&self, feature: u32) -> bool {
        self.s_feature_ro_compat() & feature != 0
    }

    /// Why the filesystem is not in the state a clean unmount leaves it in,
    /// or `None` when it is.
    pub fn unclean_reason(&self) -> Option<String> {
        let state = self.s_state();
        if state & EXT4_VALID_FS == 0 {
            return Some(format!("state 0x{:X} lacks VALID_FS", state));
        }
        if state & EXT4_ERROR_FS != 0 {
            return Some(format!("state 0x{:X} has ERROR_FS", state));
        }
        if state & EXT4_ORPHAN_FS != 0 {
            return Some(format!("state 0x{:X} has orphans being recovered", state));
        }
        if self.has_feature_incompat(EXT4_FEATURE_INCOMPAT_RECOVER) {
            return Some("journal needs recovery".to_string());
        }
        None
    }

    /// Validates `s_checksum` when the filesystem uses metadata checksums.
    /// Filesystems without the feature always pass.
    pub fn verify_checksum(&self) -> Result<(), String> {
        if !self.has_feature_ro_compat(EXT4_FEATURE_RO_COMPAT_METADATA_CSUM) {
            return Ok(());
        }
        if self.s_checksum_type() != EXT4_CRC32C_CHKSUM {
            return Err(format!("unknown checksum type {}", self.s_checksum_type()));
        }
        let calculated = calculate_superblock_checksum(&self.raw);
        if calculated != self.s_checksum() {
            return Err(format!(
                "superblock checksum mismatch: stored=0x{:08X}, calculated=0x{:08X}",
                self.s_checksum(),
                calculated
            ));
        }
        Ok(())
    }
}
