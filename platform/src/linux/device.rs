use crate::device::FileBlockDevice;
use checkfs_core::{BlockDevice, CheckFsError, DeviceId, DeviceOpener};
use log::debug;
use nix::sys::stat::{major, minor};
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

/// Opens block devices by number, resolving the node through sysfs.
#[derive(Debug, Clone)]
pub struct LinuxDeviceOpener {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
}

impl LinuxDeviceOpener {
    pub fn new(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
        }
    }

    /// Device node for `id`. Uses `DEVNAME` from the sysfs uevent file and
    /// falls back to `<dev>/block/M:m`.
    pub fn resolve(&self, id: DeviceId) -> PathBuf {
        let uevent = self.sysfs_root.join("dev/block").join(id.to_string()).join("uevent");
        match fs::read_to_string(&uevent) {
            Ok(contents) => {
                if let Some(name) = parse_devname(&contents) {
                    return self.dev_root.join(name);
                }
                debug!("No DEVNAME in {}", uevent.display());
            }
            Err(e) => debug!("Cannot read {}: {}", uevent.display(), e),
        }
        self.dev_root.join("block").join(id.to_string())
    }
}

impl Default for LinuxDeviceOpener {
    fn default() -> Self {
        Self::new("/sys", "/dev")
    }
}

impl DeviceOpener for LinuxDeviceOpener {
    fn open(&self, device: DeviceId) -> Result<Box<dyn BlockDevice>, CheckFsError> {
        let path = self.resolve(device);
        Ok(Box::new(FileBlockDevice::open(device, &path)?))
    }
}

fn parse_devname(uevent: &str) -> Option<&str> {
    uevent
        .lines()
        .find_map(|line| line.strip_prefix("DEVNAME="))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Device number of a block device node.
pub fn device_id_for_path(path: &Path) -> Result<DeviceId, CheckFsError> {
    let metadata = fs::metadata(path)?;
    if !metadata.file_type().is_block_device() {
        return Err(CheckFsError::InvalidArgument(format!(
            "{} is not a block device",
            path.display()
        )));
    }
    let rdev = metadata.rdev();
    let (major, minor) = (major(rdev), minor(rdev));
    match (u32::try_from(major), u32::try_from(minor)) {
        (Ok(major), Ok(minor)) => Ok(DeviceId::new(major, minor)),
        _ => Err(CheckFsError::InvalidArgument(format!(
            "device number of {} out of range",
            path.display()
        ))),
    }
}
