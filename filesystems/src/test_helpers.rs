// Test helpers for filesystem testing

use crate::families::ext::ext4_native::core::{checksum::calculate_superblock_checksum, constants::*};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

pub const TEST_IMAGE_SIZE: usize = 8192;

/// Builds a small image whose only meaningful content is an ext4 superblock.
#[derive(Debug, Clone)]
pub struct Ext4ImageBuilder {
    state: u16,
    mount_count: u16,
    write_time: u32,
    needs_recovery: bool,
    metadata_csum: bool,
    uuid: [u8; 16],
}

impl Ext4ImageBuilder {
    pub fn new() -> Self {
        Self {
            state: EXT4_VALID_FS,
            mount_count: 1,
            write_time: 1_600_000_000,
            needs_recovery: false,
            metadata_csum: false,
            uuid: *b"checkfs-test-fs!",
        }
    }

    pub fn state(mut self, state: u16) -> Self {
        self.state = state;
        self
    }

    pub fn mount_count(mut self, count: u16) -> Self {
        self.mount_count = count;
        self
    }

    pub fn write_time(mut self, time: u32) -> Self {
        self.write_time = time;
        self
    }

    pub fn needs_recovery(mut self, recover: bool) -> Self {
        self.needs_recovery = recover;
        self
    }

    pub fn metadata_csum(mut self, enabled: bool) -> Self {
        self.metadata_csum = enabled;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; TEST_IMAGE_SIZE];
        let sb = &mut image[EXT4_SUPERBLOCK_OFFSET as usize..EXT4_SUPERBLOCK_OFFSET as usize + EXT4_SUPERBLOCK_SIZE];

        LittleEndian::write_u32(&mut sb[0x00..], 2048); // s_inodes_count
        LittleEndian::write_u32(&mut sb[0x04..], 8192); // s_blocks_count_lo
        LittleEndian::write_u32(&mut sb[0x18..], 0); // 1 KiB blocks
        LittleEndian::write_u32(&mut sb[EXT4_S_MTIME..], self.write_time - 60);
        LittleEndian::write_u32(&mut sb[EXT4_S_WTIME..], self.write_time);
        LittleEndian::write_u16(&mut sb[EXT4_S_MNT_COUNT..], self.mount_count);
        LittleEndian::write_u16(&mut sb[EXT4_S_MAGIC..], EXT4_SUPER_MAGIC);
        LittleEndian::write_u16(&mut sb[EXT4_S_STATE..], self.state);
        LittleEndian::write_u32(&mut sb[0x4C..], 1); // s_rev_level
        LittleEndian::write_u32(&mut sb[EXT4_S_FEATURE_COMPAT..], EXT4_FEATURE_COMPAT_HAS_JOURNAL);

        let mut incompat = EXT4_FEATURE_INCOMPAT_EXTENTS | EXT4_FEATURE_INCOMPAT_FLEX_BG;
        if self.needs_recovery {
            incompat |= EXT4_FEATURE_INCOMPAT_RECOVER;
        }
        LittleEndian::write_u32(&mut sb[EXT4_S_FEATURE_INCOMPAT..], incompat);

        if self.metadata_csum {
            LittleEndian::write_u32(&mut sb[EXT4_S_FEATURE_RO_COMPAT..], EXT4_FEATURE_RO_COMPAT_METADATA_CSUM);
            sb[EXT4_S_CHECKSUM_TYPE] = EXT4_CRC32C_CHKSUM;
        }
        sb[EXT4_S_UUID..EXT4_S_UUID + 16].copy_from_slice(&self.uuid);

        if self.metadata_csum {
            let csum = calculate_superblock_checksum(sb);
            LittleEndian::write_u32(&mut sb[EXT4_S_CHECKSUM..], csum);
        }

        image
    }
}

impl Default for Ext4ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Image with an XFS superblock magic and nothing else.
pub fn xfs_image() -> Vec<u8> {
    let mut image = vec![0u8; TEST_IMAGE_SIZE];
    BigEndian::write_u32(&mut image[0..], crate::families::xfs::XFS_SB_MAGIC);
    image
}

/// Image no detector recognises.
pub fn blank_image() -> Vec<u8> {
    vec![0u8; TEST_IMAGE_SIZE]
}

/// Rewrites the superblock of an ext4 image the way an offline mount
/// would: bumps the mount count and write time, recomputing the checksum
/// when the filesystem has one.
pub fn simulate_offline_mount(image: &mut [u8]) {
    let base = EXT4_SUPERBLOCK_OFFSET as usize;
    let sb = &mut image[base..base + EXT4_SUPERBLOCK_SIZE];

    let count = LittleEndian::read_u16(&sb[EXT4_S_MNT_COUNT..]);
    LittleEndian::write_u16(&mut sb[EXT4_S_MNT_COUNT..], count.wrapping_add(1));
    let wtime = LittleEndian::read_u32(&sb[EXT4_S_WTIME..]);
    LittleEndian::write_u32(&mut sb[EXT4_S_WTIME..], wtime + 3600);

    if LittleEndian::read_u32(&sb[EXT4_S_FEATURE_RO_COMPAT..]) & EXT4_FEATURE_RO_COMPAT_METADATA_CSUM != 0 {
        let csum = calculate_superblock_checksum(sb);
        LittleEndian::write_u32(&mut sb[EXT4_S_CHECKSUM..], csum);
    }
}

pub fn init_test_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
