pub mod adapter;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod params;
pub mod registry;
pub mod status;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapter::{Capture, FilesystemAdapter, FilesystemKind, Fingerprint, FingerprintSource, FixedFingerprint, Verdict};
pub use capture::capture_fingerprint;
pub use config::GateConfig;
pub use device::{BlockDevice, DeviceId, DeviceOpener, MountStateProbe};
pub use error::{CheckFsError, ErrorKind};
pub use gate::AvailabilityGate;
pub use params::{CheckParameters, CHECK_PARAMETERS_SIZE_EXT4, CHECK_PARAMETERS_SIZE_XFS, FINGERPRINT_OFFSET};
pub use registry::AdapterRegistry;
pub use status::{CheckFsStatus, CHECKFS_STATUS_MESSAGE_CAPACITY};
pub use verify::verify_fingerprint;
