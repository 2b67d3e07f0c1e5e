use crate::CheckFsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Block device number, the `major:minor` pair the kernel knows the device by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

impl DeviceId {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

impl FromStr for DeviceId {
    type Err = CheckFsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| CheckFsError::InvalidArgument(format!("Device id '{}' is not major:minor", s)))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| CheckFsError::InvalidArgument(format!("Device id '{}': {}", s, e)))
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

impl TryFrom<String> for DeviceId {
    type Error = CheckFsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.to_string()
    }
}

/// An open, read-only handle on a block device.
///
/// The handle is closed when it is dropped; openers hand out boxed handles so
/// every exit path of a check releases the device exactly once.
pub trait BlockDevice: Send {
    fn id(&self) -> DeviceId;

    /// Reads `buf.len()` bytes from the absolute `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;

    /// Backing node, when there is one.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Device acquisition.
pub trait DeviceOpener: Send + Sync {
    /// Fails with [`CheckFsError::DeviceUnavailable`] when the device cannot be opened.
    fn open(&self, device: DeviceId) -> Result<Box<dyn BlockDevice>, CheckFsError>;
}

/// Reports whether a device is attached to a live filesystem mount.
///
/// Must not require write access to the device. An `Err` is a failure to
/// determine the state, never "unmounted".
pub trait MountStateProbe: Send + Sync {
    fn is_mounted(&self, device: &dyn BlockDevice) -> Result<bool, CheckFsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_parse_and_display() {
        let id: DeviceId = "8:17".parse().unwrap();
        assert_eq!(id, DeviceId::new(8, 17));
        assert_eq!(id.to_string(), "8:17");
    }

    #[test]
    fn test_device_id_rejects_garbage() {
        assert!("sda1".parse::<DeviceId>().is_err());
        assert!("8:".parse::<DeviceId>().is_err());
        assert!("x:1".parse::<DeviceId>().is_err());
    }

    #[test]
    fn test_device_id_serde_as_string() {
        let json = serde_json::to_string(&DeviceId::new(253, 0)).unwrap();
        assert_eq!(json, "\"253:0\"");
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DeviceId::new(253, 0));
    }
}
