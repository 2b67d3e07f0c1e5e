use crate::{CheckFsError, DeviceId, Fingerprint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Gate settings, loaded from JSON. Every field has a default so an empty
/// object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Mount table consulted by the mount-state probe.
    pub mountinfo_path: PathBuf,
    pub sysfs_root: PathBuf,
    pub dev_root: PathBuf,
    /// Image files standing in for block devices, keyed by `major:minor`.
    pub images: BTreeMap<DeviceId, PathBuf>,
    /// Replaces the computed fingerprint with a fixed value. Mount and
    /// superblock checks still run.
    pub debug_fingerprint: Option<u32>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mountinfo_path: PathBuf::from("/proc/self/mountinfo"),
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
            images: BTreeMap::new(),
            debug_fingerprint: None,
        }
    }
}

impl GateConfig {
    pub fn from_json(text: &str) -> Result<Self, CheckFsError> {
        serde_json::from_str(text).map_err(|e| CheckFsError::Configuration(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CheckFsError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CheckFsError::Configuration(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn debug_fingerprint(&self) -> Option<Fingerprint> {
        self.debug_fingerprint.map(Fingerprint::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = GateConfig::from_json("{}").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.mountinfo_path, PathBuf::from("/proc/self/mountinfo"));
        assert!(config.debug_fingerprint().is_none());
    }

    #[test]
    fn test_images_keyed_by_device_id() {
        let config = GateConfig::from_json(
            r#"{ "images": { "7:0": "/tmp/disk.img" }, "debug_fingerprint": 305419896 }"#,
        )
        .unwrap();
        assert_eq!(config.images.get(&DeviceId::new(7, 0)), Some(&PathBuf::from("/tmp/disk.img")));
        assert_eq!(config.debug_fingerprint(), Some(Fingerprint::new(0x1234_5678)));
    }

    #[test]
    fn test_bad_device_id_is_configuration_error() {
        let err = GateConfig::from_json(r#"{ "images": { "sda": "/tmp/x" } }"#).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "mountinfo_path": "/tmp/mountinfo" }}"#).unwrap();
        let config = GateConfig::load(file.path()).unwrap();
        assert_eq!(config.mountinfo_path, PathBuf::from("/tmp/mountinfo"));

        let missing = GateConfig::load(Path::new("/nonexistent/checkfs.json")).unwrap_err();
        assert_eq!(missing.kind(), crate::ErrorKind::Configuration);
    }
}
