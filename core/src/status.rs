// Diagnostic record for a failed gate check

use crate::{CheckFsError, DeviceId, ErrorKind};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use tracing::error;

/// Message buffer capacity, terminator included.
pub const CHECKFS_STATUS_MESSAGE_CAPACITY: usize = 256;

/// Why a check failed, bounded so it can be copied into fixed-size
/// operator-facing records.
///
/// A status is always built whole from one failure; there is no way to fill
/// it in field by field.
#[derive(Clone, PartialEq, Eq)]
pub struct CheckFsStatus {
    device_id: DeviceId,
    error_code: ErrorKind,
    message_text: [u8; CHECKFS_STATUS_MESSAGE_CAPACITY],
    message_length: u32,
}

impl CheckFsStatus {
    /// Copies `message` truncated to the buffer capacity, on a character
    /// boundary, and NUL-terminates it.
    pub fn new(device_id: DeviceId, error_code: ErrorKind, message: &str) -> Self {
        let mut len = message.len().min(CHECKFS_STATUS_MESSAGE_CAPACITY - 1);
        while !message.is_char_boundary(len) {
            len -= 1;
        }

        let mut message_text = [0u8; CHECKFS_STATUS_MESSAGE_CAPACITY];
        message_text[..len].copy_from_slice(&message.as_bytes()[..len]);
        message_text[len] = 0;

        Self {
            device_id,
            error_code,
            message_text,
            message_length: (len + 1) as u32,
        }
    }

    /// Status for `err` prefixed with the fixed operator text for the stage
    /// that failed, e.g. "Failed to open device.".
    pub fn from_error(device_id: DeviceId, summary: &str, err: &CheckFsError) -> Self {
        Self::new(device_id, err.kind(), &format!("{} {}", summary, err))
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn error_code(&self) -> ErrorKind {
        self.error_code
    }

    pub fn message(&self) -> &str {
        let len = self.message_length as usize - 1;
        // Built from a &str cut on a char boundary.
        std::str::from_utf8(&self.message_text[..len]).unwrap_or_default()
    }

    /// Message bytes including the trailing NUL.
    pub fn message_bytes(&self) -> &[u8] {
        &self.message_text[..self.message_length as usize]
    }

    /// Length of the message including its terminator.
    pub fn message_length(&self) -> u32 {
        self.message_length
    }

    pub fn log(&self) {
        error!("Persistent CBT register was not stored for device [{}]", self.device_id);
        error!("error code: {}", self.error_code);
        error!("{}", self.message());
    }
}

impl fmt::Debug for CheckFsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckFsStatus")
            .field("device_id", &self.device_id)
            .field("error_code", &self.error_code)
            .field("message", &self.message())
            .finish()
    }
}

impl fmt::Display for CheckFsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.device_id, self.error_code, self.message())
    }
}

impl Serialize for CheckFsStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CheckFsStatus", 4)?;
        state.serialize_field("device_id", &self.device_id)?;
        state.serialize_field("error_code", &self.error_code)?;
        state.serialize_field("message", self.message())?;
        state.serialize_field("message_length", &self.message_length)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_nul_terminated() {
        let status = CheckFsStatus::new(DeviceId::new(8, 0), ErrorKind::DeviceBusy, "Device is still mounted.");
        assert_eq!(status.message(), "Device is still mounted.");
        assert_eq!(status.message_length() as usize, "Device is still mounted.".len() + 1);
        assert_eq!(status.message_bytes().last(), Some(&0));
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "x".repeat(1000);
        let status = CheckFsStatus::new(DeviceId::new(8, 0), ErrorKind::Io, &long);
        assert_eq!(status.message_length() as usize, CHECKFS_STATUS_MESSAGE_CAPACITY);
        assert_eq!(status.message().len(), CHECKFS_STATUS_MESSAGE_CAPACITY - 1);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 'é' is two bytes; an odd cut would split it
        let long = "é".repeat(200);
        let status = CheckFsStatus::new(DeviceId::new(8, 0), ErrorKind::Io, &long);
        assert!(status.message().len() < CHECKFS_STATUS_MESSAGE_CAPACITY);
        assert!(status.message().chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_from_error_carries_kind() {
        let id = DeviceId::new(259, 3);
        let err = CheckFsError::DeviceBusy(id);
        let status = CheckFsStatus::from_error(id, "Device is still mounted.", &err);
        assert_eq!(status.error_code(), ErrorKind::DeviceBusy);
        assert!(status.message().starts_with("Device is still mounted."));
        assert_eq!(status.device_id(), id);
    }

    #[test]
    fn test_serializes_readable_message() {
        let status = CheckFsStatus::new(DeviceId::new(7, 2), ErrorKind::Unsupported, "no adapter");
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["device_id"], "7:2");
        assert_eq!(value["error_code"], "unsupported");
        assert_eq!(value["message"], "no adapter");
        assert_eq!(value["message_length"], 11);
    }
}
