// Ext filesystem family (ext2/ext3/ext4)
pub mod ext4_native;

pub use ext4_native::{Ext4Adapter, ExtDetector};
