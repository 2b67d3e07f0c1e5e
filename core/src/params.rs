// Check parameters: the opaque record persisted next to the CBT bitmap

use crate::{CheckFsError, Fingerprint};
use byteorder::{ByteOrder, LittleEndian};
use static_assertions::const_assert;
use std::fmt;

/// Offset of the fingerprint inside every adapter record.
pub const FINGERPRINT_OFFSET: usize = 0;

/// Record sizes are rounded to 16 bytes.
pub const CHECK_PARAMETERS_SIZE_EXT4: u32 = 0x10;
pub const CHECK_PARAMETERS_SIZE_XFS: u32 = 0x10;

const_assert!(CHECK_PARAMETERS_SIZE_EXT4 as usize >= FINGERPRINT_OFFSET + Fingerprint::LEN);
const_assert!(CHECK_PARAMETERS_SIZE_XFS as usize >= FINGERPRINT_OFFSET + Fingerprint::LEN);

/// Opaque, adapter-specific record carrying a captured fingerprint across
/// the unmount/remount boundary.
///
/// Only the adapter that produced a record can interpret it. The gate never
/// looks inside beyond handing the stored fingerprint to an adapter whose
/// record size the buffer satisfies.
#[derive(Clone, PartialEq, Eq)]
pub struct CheckParameters {
    bytes: Vec<u8>,
}

impl CheckParameters {
    /// Allocates a zeroed record of `record_size` bytes with `fingerprint`
    /// written at [`FINGERPRINT_OFFSET`].
    pub fn with_fingerprint(record_size: u32, fingerprint: Fingerprint) -> Result<Self, CheckFsError> {
        let size = record_size as usize;
        if size < FINGERPRINT_OFFSET + Fingerprint::LEN {
            return Err(CheckFsError::InvalidArgument(format!(
                "Record size {} cannot hold a fingerprint", record_size
            )));
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).map_err(|e| {
            CheckFsError::OutOfMemory(format!("check parameters of {} bytes: {}", size, e))
        })?;
        bytes.resize(size, 0);
        LittleEndian::write_u32(&mut bytes[FINGERPRINT_OFFSET..], fingerprint.value());

        Ok(Self { bytes })
    }

    /// Wraps a record handed back by the persistence layer.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Stored fingerprint, if the record is large enough to carry one.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.bytes
            .get(FINGERPRINT_OFFSET..FINGERPRINT_OFFSET + Fingerprint::LEN)
            .map(|raw| Fingerprint::new(LittleEndian::read_u32(raw)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self, CheckFsError> {
        hex::decode(text.trim())
            .map(Self::from_bytes)
            .map_err(|e| CheckFsError::InvalidArgument(format!("Check parameters are not hex: {}", e)))
    }
}

impl fmt::Debug for CheckParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckParameters")
            .field("size", &self.size())
            .field("bytes", &self.to_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let params = CheckParameters::with_fingerprint(CHECK_PARAMETERS_SIZE_EXT4, Fingerprint::new(0x1234_5678)).unwrap();
        assert_eq!(params.size(), 16);
        assert_eq!(&params.as_bytes()[..4], &[0x78, 0x56, 0x34, 0x12]);
        assert!(params.as_bytes()[4..].iter().all(|&b| b == 0));
        assert_eq!(params.fingerprint(), Some(Fingerprint::new(0x1234_5678)));
    }

    #[test]
    fn test_short_record_has_no_fingerprint() {
        let params = CheckParameters::from_bytes(vec![1, 2, 3]);
        assert_eq!(params.fingerprint(), None);
        assert!(CheckParameters::from_bytes(Vec::new()).is_empty());
    }

    #[test]
    fn test_record_too_small_for_fingerprint() {
        let err = CheckParameters::with_fingerprint(2, Fingerprint::new(1)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_hex_encoding() {
        let params = CheckParameters::with_fingerprint(CHECK_PARAMETERS_SIZE_EXT4, Fingerprint::new(0xDEAD_BEEF)).unwrap();
        let text = params.to_hex();
        assert!(text.starts_with("efbeadde"));
        assert_eq!(CheckParameters::from_hex(&text).unwrap(), params);
        assert!(CheckParameters::from_hex("zz").is_err());
    }
}
