use checkfs_core::{BlockDevice, CheckFsError, DeviceId, DeviceOpener};
use log::debug;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only handle on a device node or image file. Closed on drop.
pub struct FileBlockDevice {
    id: DeviceId,
    path: PathBuf,
    file: File,
}

impl FileBlockDevice {
    pub fn open(id: DeviceId, path: &Path) -> Result<Self, CheckFsError> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| CheckFsError::DeviceUnavailable { device: id, source })?;
        debug!("Opened device [{}] at {}", id, path.display());
        Ok(Self {
            id,
            path: path.to_path_buf(),
            file,
        })
    }
}

impl BlockDevice for FileBlockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl Drop for FileBlockDevice {
    fn drop(&mut self) {
        debug!("Closed device [{}]", self.id);
    }
}

/// Opens image files standing in for block devices.
#[derive(Debug, Clone, Default)]
pub struct ImageDeviceOpener {
    images: BTreeMap<DeviceId, PathBuf>,
}

impl ImageDeviceOpener {
    pub fn new(images: BTreeMap<DeviceId, PathBuf>) -> Self {
        Self { images }
    }

    pub fn insert(&mut self, id: DeviceId, path: impl Into<PathBuf>) {
        self.images.insert(id, path.into());
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.images.contains_key(&id)
    }
}

impl DeviceOpener for ImageDeviceOpener {
    fn open(&self, device: DeviceId) -> Result<Box<dyn BlockDevice>, CheckFsError> {
        let path = self.images.get(&device).ok_or_else(|| CheckFsError::DeviceUnavailable {
            device,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no image configured for device"),
        })?;
        Ok(Box::new(FileBlockDevice::open(device, path)?))
    }
}
