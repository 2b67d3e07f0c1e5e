use anyhow::{bail, Result};
use checkfs_core::DeviceId;
use std::path::{Path, PathBuf};

/// Device argument: `major:minor`, or a block device node on Linux.
pub fn parse_device(arg: &str) -> Result<DeviceId> {
    if let Ok(id) = arg.parse::<DeviceId>() {
        return Ok(id);
    }
    from_path(Path::new(arg))
}

#[cfg(target_os = "linux")]
fn from_path(path: &Path) -> Result<DeviceId> {
    Ok(checkfs_platform::device_id_for_path(path)?)
}

#[cfg(not(target_os = "linux"))]
fn from_path(path: &Path) -> Result<DeviceId> {
    bail!("'{}' is not a major:minor device number", path.display())
}

/// File holding the check parameters of `device` inside `dir`.
pub fn params_file(dir: &Path, device: DeviceId) -> PathBuf {
    dir.join(format!("{}_{}.params", device.major, device.minor))
}

pub fn parse_devices(args: &[String]) -> Result<Vec<DeviceId>> {
    let mut devices = Vec::with_capacity(args.len());
    for arg in args {
        let id = parse_device(arg)?;
        if devices.contains(&id) {
            bail!("device [{}] given more than once", id);
        }
        devices.push(id);
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_minor() {
        assert_eq!(parse_device("8:1").unwrap(), DeviceId::new(8, 1));
        assert_eq!(parse_device("259:0").unwrap(), DeviceId::new(259, 0));
    }

    #[test]
    fn test_rejects_duplicates_and_non_devices() {
        assert!(parse_devices(&["8:1".to_string(), "8:1".to_string()]).is_err());
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(parse_device(&file.path().display().to_string()).is_err());
    }

    #[test]
    fn test_params_file_name() {
        let path = params_file(Path::new("/var/lib/cbt"), DeviceId::new(8, 17));
        assert_eq!(path, PathBuf::from("/var/lib/cbt/8_17.params"));
    }
}
