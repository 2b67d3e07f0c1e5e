use crate::DeviceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckFsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Device {device} is unavailable: {source}")]
    DeviceUnavailable {
        device: DeviceId,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {0} is mounted")]
    DeviceBusy(DeviceId),

    #[error("Failed to get fs mount state of device {device}: {reason}")]
    ProbeFailed { device: DeviceId, reason: String },

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Device {device} has offline changes: stored fingerprint {stored}, current {current}")]
    IntegrityMismatch {
        device: DeviceId,
        stored: String,
        current: String,
    },

    #[error("Filesystem on device {device} was not unmounted cleanly: {reason}")]
    NotCleanlyUnmounted { device: DeviceId, reason: String },

    #[error("Corrupt filesystem metadata: {0}")]
    CorruptMetadata(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Failure classification carried by [`crate::CheckFsStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    DeviceUnavailable,
    DeviceBusy,
    ProbeFailed,
    Unsupported,
    IntegrityMismatch,
    NotCleanlyUnmounted,
    CorruptMetadata,
    OutOfMemory,
    Io,
    Configuration,
}

impl CheckFsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckFsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CheckFsError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            CheckFsError::DeviceBusy(_) => ErrorKind::DeviceBusy,
            CheckFsError::ProbeFailed { .. } => ErrorKind::ProbeFailed,
            CheckFsError::Unsupported(_) => ErrorKind::Unsupported,
            CheckFsError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            CheckFsError::NotCleanlyUnmounted { .. } => ErrorKind::NotCleanlyUnmounted,
            CheckFsError::CorruptMetadata(_) => ErrorKind::CorruptMetadata,
            CheckFsError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            CheckFsError::Io(_) => ErrorKind::Io,
            CheckFsError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::DeviceBusy => "device_busy",
            ErrorKind::ProbeFailed => "probe_failed",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::IntegrityMismatch => "integrity_mismatch",
            ErrorKind::NotCleanlyUnmounted => "not_cleanly_unmounted",
            ErrorKind::CorruptMetadata => "corrupt_metadata",
            ErrorKind::OutOfMemory => "out_of_memory",
            ErrorKind::Io => "io",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
