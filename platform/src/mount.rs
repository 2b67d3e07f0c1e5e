use checkfs_core::{BlockDevice, CheckFsError, DeviceId, MountStateProbe};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: DeviceId,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub source: PathBuf,
}

/// Parses `/proc/<pid>/mountinfo`. Malformed lines are skipped.
pub fn parse_mountinfo(contents: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();
    for line in contents.lines() {
        let Some((left, right)) = line.split_once(" - ") else {
            continue;
        };
        let left_parts: Vec<&str> = left.split_whitespace().collect();
        if left_parts.len() < 6 {
            continue;
        }
        let Ok(device) = left_parts[2].parse::<DeviceId>() else {
            continue;
        };

        let right_parts: Vec<&str> = right.split_whitespace().collect();
        if right_parts.len() < 2 {
            continue;
        }

        mounts.push(MountEntry {
            device,
            mount_point: PathBuf::from(decode_mount_escape(left_parts[4])),
            fs_type: right_parts[0].to_string(),
            source: PathBuf::from(decode_mount_escape(right_parts[1])),
        });
    }
    mounts
}

/// Undo the kernel's octal escaping of whitespace and backslashes.
fn decode_mount_escape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let octal = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)));
        if let (b'\\', Some(digits)) = (bytes[i], octal) {
            let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Mount-state probe backed by the kernel mount table.
///
/// A device counts as mounted when any mount is backed by its device
/// number, names its node or image file as the mount source, or sits on a
/// loop device whose backing file is that image. Which filesystem is
/// mounted does not matter.
#[derive(Debug, Clone)]
pub struct MountInfoProbe {
    path: PathBuf,
    sysfs_root: PathBuf,
}

impl MountInfoProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sysfs_root: PathBuf::from("/sys"),
        }
    }

    /// Where loop device backing files are looked up.
    pub fn with_sysfs_root(mut self, sysfs_root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = sysfs_root.into();
        self
    }

    /// Image file behind loop device `device`, if it is one.
    fn loop_backing_file(&self, device: DeviceId) -> Option<PathBuf> {
        let file = self
            .sysfs_root
            .join("dev/block")
            .join(device.to_string())
            .join("loop/backing_file");
        let contents = fs::read_to_string(file).ok()?;
        let backing = contents.trim_end_matches('\n');
        (!backing.is_empty()).then(|| PathBuf::from(backing))
    }

    pub fn mounts_of(&self, device: &dyn BlockDevice) -> Result<Vec<MountEntry>, CheckFsError> {
        let contents = fs::read_to_string(&self.path).map_err(|e| CheckFsError::ProbeFailed {
            device: device.id(),
            reason: format!("{}: {}", self.path.display(), e),
        })?;

        // Backing files are recorded as absolute, resolved paths
        let node = device.path().map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()));
        let backs_node = |m: &MountEntry| match &node {
            Some(node) => {
                m.source == *node
                    || device.path().map_or(false, |p| m.source == p)
                    || (m.source.to_string_lossy().starts_with("/dev/loop")
                        && self.loop_backing_file(m.device).map_or(false, |b| b == *node))
            }
            None => false,
        };
        Ok(parse_mountinfo(&contents)
            .into_iter()
            .filter(|m| m.device == device.id() || backs_node(m))
            .collect())
    }
}

impl Default for MountInfoProbe {
    fn default() -> Self {
        Self::new("/proc/self/mountinfo")
    }
}

impl MountStateProbe for MountInfoProbe {
    fn is_mounted(&self, device: &dyn BlockDevice) -> Result<bool, CheckFsError> {
        let mounts = self.mounts_of(device)?;
        for mount in &mounts {
            info!("Type of mounted fs: {}", mount.fs_type);
            info!(
                "Device [{}] mounted at {} from {}",
                device.id(),
                mount.mount_point.display(),
                mount.source.display()
            );
        }
        if mounts.is_empty() {
            debug!("No mount of device [{}] in {}", device.id(), self.path.display());
        }
        Ok(!mounts.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ImageDeviceOpener;
    use checkfs_core::{DeviceOpener, ErrorKind};
    use std::io::Write;

    const SAMPLE: &str = "\
22 1 8:2 / / rw,relatime shared:1 - ext4 /dev/sda2 rw,errors=remount-ro
23 22 0:21 / /proc rw,nosuid - proc proc rw
40 22 8:17 / /mnt/backup\\040disk rw,relatime shared:20 - ext4 /dev/sdb1 rw
41 22 7:0 / /mnt/img rw - ext4 /srv/images/disk.img rw
garbage line without separator
";

    #[test]
    fn test_parse_mountinfo() {
        let mounts = parse_mountinfo(SAMPLE);
        assert_eq!(mounts.len(), 4);
        assert_eq!(mounts[0].device, DeviceId::new(8, 2));
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[2].mount_point, PathBuf::from("/mnt/backup disk"));
        assert_eq!(mounts[2].source, PathBuf::from("/dev/sdb1"));
    }

    #[test]
    fn test_decode_escape() {
        assert_eq!(decode_mount_escape("/a\\040b"), "/a b");
        assert_eq!(decode_mount_escape("/tab\\011x"), "/tab\tx");
        assert_eq!(decode_mount_escape("/plain"), "/plain");
        assert_eq!(decode_mount_escape("/trailing\\04"), "/trailing\\04");
    }

    fn probe_with(contents: &str) -> (tempfile::NamedTempFile, MountInfoProbe) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let probe = MountInfoProbe::new(file.path());
        (file, probe)
    }

    #[test]
    fn test_mounted_by_device_number() {
        let image = tempfile::NamedTempFile::new().unwrap();
        let mut opener = ImageDeviceOpener::default();
        opener.insert(DeviceId::new(8, 17), image.path());
        opener.insert(DeviceId::new(8, 18), image.path());
        let (_file, probe) = probe_with(SAMPLE);

        let mounted = opener.open(DeviceId::new(8, 17)).unwrap();
        assert!(probe.is_mounted(mounted.as_ref()).unwrap());

        let idle = opener.open(DeviceId::new(8, 18)).unwrap();
        assert!(!probe.is_mounted(idle.as_ref()).unwrap());
    }

    #[test]
    fn test_mounted_by_source_path() {
        let image = tempfile::NamedTempFile::new().unwrap();
        let line = format!("50 22 0:99 / /mnt/loop rw - ext4 {} rw\n", image.path().display());
        let (_file, probe) = probe_with(&line);

        let mut opener = ImageDeviceOpener::default();
        opener.insert(DeviceId::new(1, 1), image.path());
        let device = opener.open(DeviceId::new(1, 1)).unwrap();
        assert!(probe.is_mounted(device.as_ref()).unwrap());
    }

    #[test]
    fn test_mounted_through_loop_device() {
        let image = tempfile::NamedTempFile::new().unwrap();
        let sys = tempfile::tempdir().unwrap();
        let loop_dir = sys.path().join("dev/block/7:4/loop");
        fs::create_dir_all(&loop_dir).unwrap();
        let backing = fs::canonicalize(image.path()).unwrap();
        fs::write(loop_dir.join("backing_file"), format!("{}\n", backing.display())).unwrap();

        let (_file, probe) = probe_with("70 22 7:4 / /mnt/img rw - ext4 /dev/loop4 rw\n");
        let mut opener = ImageDeviceOpener::default();
        opener.insert(DeviceId::new(1, 1), image.path());
        let device = opener.open(DeviceId::new(1, 1)).unwrap();

        // Without the sysfs view the loop source does not name the image
        let unmapped = probe.clone().with_sysfs_root(sys.path().join("missing"));
        assert!(!unmapped.is_mounted(device.as_ref()).unwrap());

        let probe = probe.with_sysfs_root(sys.path());
        assert!(probe.is_mounted(device.as_ref()).unwrap());
    }

    #[test]
    fn test_unreadable_table_is_probe_failure() {
        let image = tempfile::NamedTempFile::new().unwrap();
        let mut opener = ImageDeviceOpener::default();
        opener.insert(DeviceId::new(1, 1), image.path());
        let device = opener.open(DeviceId::new(1, 1)).unwrap();

        let probe = MountInfoProbe::new("/nonexistent/mountinfo");
        let err = probe.is_mounted(device.as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProbeFailed);
    }
}
