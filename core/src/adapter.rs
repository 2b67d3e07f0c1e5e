use crate::{BlockDevice, CheckFsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integrity value derived from filesystem metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Encoded length inside a check parameters record.
    pub const LEN: usize = 4;

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemKind {
    Ext4,
    Xfs,
    Unknown,
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilesystemKind::Ext4 => "ext4",
            FilesystemKind::Xfs => "xfs",
            FilesystemKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Result of computing a fingerprint at unmount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Fingerprint(Fingerprint),
    /// The device does not carry this adapter's filesystem, or the adapter
    /// cannot fingerprint it yet.
    Unsupported,
}

/// Result of comparing the on-device state with a stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch { current: Fingerprint },
    Unsupported,
}

/// Per-filesystem fingerprint capability.
///
/// `Unsupported` is an ordinary outcome: the caller moves on to the next
/// adapter. Errors are reserved for failures that must deny the check.
pub trait FilesystemAdapter: Send + Sync {
    fn kind(&self) -> FilesystemKind;

    /// Size of the check parameters record this adapter produces. Records
    /// shorter than this are never handed to the adapter.
    fn record_size(&self) -> u32;

    /// Called only once the device is confirmed unmounted.
    fn compute_fingerprint_at_unmount(&self, device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError>;

    /// Exact comparison; any difference is a mismatch.
    fn verify_fingerprint(&self, device: &mut dyn BlockDevice, stored: Fingerprint) -> Result<Verdict, CheckFsError>;
}

/// Turns settled filesystem metadata into a fingerprint.
///
/// Adapters read and validate the metadata themselves and delegate only the
/// final derivation, so a fixed source exercises the same control flow as
/// the real checksum.
pub trait FingerprintSource: Send + Sync {
    fn fingerprint(&self, metadata: &[u8]) -> Fingerprint;
}

/// Always yields the same value regardless of the metadata.
#[derive(Debug, Clone, Copy)]
pub struct FixedFingerprint(pub Fingerprint);

impl FingerprintSource for FixedFingerprint {
    fn fingerprint(&self, _metadata: &[u8]) -> Fingerprint {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source_ignores_metadata() {
        let source = FixedFingerprint(Fingerprint::new(7));
        assert_eq!(source.fingerprint(&[1, 2, 3]), Fingerprint::new(7));
        assert_eq!(source.fingerprint(&[]), Fingerprint::new(7));
    }

    #[test]
    fn test_fingerprint_display() {
        assert_eq!(Fingerprint::new(0xABC).to_string(), "0x00000ABC");
        assert_eq!(FilesystemKind::Xfs.to_string(), "xfs");
    }
}
