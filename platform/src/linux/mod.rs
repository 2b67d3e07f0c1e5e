pub mod device;

pub use device::{device_id_for_path, LinuxDeviceOpener};
