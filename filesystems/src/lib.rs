// Filesystem families organization
pub mod families;

pub mod detection;
pub mod registration;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use families::ext::{Ext4Adapter, ExtDetector};
pub use families::ext::ext4_native::SuperblockCrc;
pub use families::none::NoneAdapter;
pub use families::xfs::{XfsAdapter, XfsDetector};

pub use detection::{detect_filesystem_kind, FilesystemDetector};
pub use registration::{builtin_registry, register_builtin_adapters};
