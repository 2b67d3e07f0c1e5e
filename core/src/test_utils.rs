/// Test utilities and mock implementations for safe testing
use crate::{
    BlockDevice, Capture, CheckFsError, DeviceId, DeviceOpener, FilesystemAdapter, FilesystemKind,
    Fingerprint, MountStateProbe, Verdict,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct DiskState {
    id: DeviceId,
    data: Mutex<Vec<u8>>,
    mounted: AtomicBool,
    open_error: AtomicBool,
    probe_error: AtomicBool,
    read_error: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory disk - NEVER touches real hardware
///
/// Clones share state, so a test can keep one copy to mutate the "offline"
/// contents and inspect open/close counts while the opener holds another.
#[derive(Clone)]
pub struct MockDisk {
    state: Arc<DiskState>,
}

impl MockDisk {
    pub fn new(id: DeviceId, data: Vec<u8>) -> Self {
        Self {
            state: Arc::new(DiskState {
                id,
                data: Mutex::new(data),
                mounted: AtomicBool::new(false),
                open_error: AtomicBool::new(false),
                probe_error: AtomicBool::new(false),
                read_error: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.state.id
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.state.mounted.store(mounted, Ordering::SeqCst);
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.open_error.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probe(&self, fail: bool) {
        self.state.probe_error.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.read_error.store(fail, Ordering::SeqCst);
    }

    /// Overwrites bytes as if the filesystem was modified offline.
    pub fn write(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.state.data.lock().unwrap();
        if data.len() < offset + bytes.len() {
            data.resize(offset + bytes.len(), 0);
        }
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn is_mounted(&self) -> bool {
        self.state.mounted.load(Ordering::SeqCst)
    }
}

/// Handle returned by [`MockDeviceOpener`]; counts a close when dropped.
pub struct MockHandle {
    disk: MockDisk,
}

impl BlockDevice for MockHandle {
    fn id(&self) -> DeviceId {
        self.disk.id()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        if self.disk.state.read_error.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        let data = self.disk.state.data.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of disk"));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.disk.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opener over a fixed set of mock disks.
#[derive(Clone, Default)]
pub struct MockDeviceOpener {
    disks: HashMap<DeviceId, MockDisk>,
}

impl MockDeviceOpener {
    pub fn new(disks: &[MockDisk]) -> Self {
        Self {
            disks: disks.iter().map(|d| (d.id(), d.clone())).collect(),
        }
    }
}

impl DeviceOpener for MockDeviceOpener {
    fn open(&self, device: DeviceId) -> Result<Box<dyn BlockDevice>, CheckFsError> {
        let disk = self.disks.get(&device).ok_or_else(|| CheckFsError::DeviceUnavailable {
            device,
            source: io::Error::new(io::ErrorKind::NotFound, "no such mock disk"),
        })?;
        if disk.state.open_error.load(Ordering::SeqCst) {
            return Err(CheckFsError::DeviceUnavailable {
                device,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected open failure"),
            });
        }
        disk.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHandle { disk: disk.clone() }))
    }
}

/// Probe answering from the mock disks' mounted flags.
#[derive(Default)]
pub struct MockMountProbe {
    disks: HashMap<DeviceId, MockDisk>,
    probes: AtomicUsize,
}

impl MockMountProbe {
    pub fn new(disks: &[MockDisk]) -> Self {
        Self {
            disks: disks.iter().map(|d| (d.id(), d.clone())).collect(),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl MountStateProbe for MockMountProbe {
    fn is_mounted(&self, device: &dyn BlockDevice) -> Result<bool, CheckFsError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let id = device.id();
        let disk = self.disks.get(&id).ok_or_else(|| CheckFsError::ProbeFailed {
            device: id,
            reason: "unknown mock disk".to_string(),
        })?;
        if disk.state.probe_error.load(Ordering::SeqCst) {
            return Err(CheckFsError::ProbeFailed {
                device: id,
                reason: "injected probe failure".to_string(),
            });
        }
        Ok(disk.is_mounted())
    }
}

/// Adapter over a toy on-disk format: a 4-byte magic at offset 0 followed
/// by a little-endian u32 that stands in for the metadata checksum.
pub struct MockAdapter {
    kind: FilesystemKind,
    record_size: u32,
    magic: [u8; 4],
    captures: AtomicUsize,
    verifications: AtomicUsize,
}

impl MockAdapter {
    pub const MAGIC: [u8; 4] = *b"MOCK";

    pub fn new(kind: FilesystemKind, record_size: u32) -> Self {
        Self::with_magic(kind, record_size, Self::MAGIC)
    }

    pub fn with_magic(kind: FilesystemKind, record_size: u32, magic: [u8; 4]) -> Self {
        Self {
            kind,
            record_size,
            magic,
            captures: AtomicUsize::new(0),
            verifications: AtomicUsize::new(0),
        }
    }

    /// Disk contents this adapter recognises, with `checksum` as its metadata.
    pub fn image(magic: [u8; 4], checksum: u32) -> Vec<u8> {
        let mut data = vec![0u8; 512];
        data[..4].copy_from_slice(&magic);
        data[4..8].copy_from_slice(&checksum.to_le_bytes());
        data
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn verification_count(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    fn read(&self, device: &mut dyn BlockDevice) -> Result<Option<Fingerprint>, CheckFsError> {
        let mut header = [0u8; 8];
        device.read_at(0, &mut header)?;
        if header[..4] != self.magic {
            return Ok(None);
        }
        let value = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        Ok(Some(Fingerprint::new(value)))
    }
}

impl FilesystemAdapter for MockAdapter {
    fn kind(&self) -> FilesystemKind {
        self.kind
    }

    fn record_size(&self) -> u32 {
        self.record_size
    }

    fn compute_fingerprint_at_unmount(&self, device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(match self.read(device)? {
            Some(fingerprint) => Capture::Fingerprint(fingerprint),
            None => Capture::Unsupported,
        })
    }

    fn verify_fingerprint(&self, device: &mut dyn BlockDevice, stored: Fingerprint) -> Result<Verdict, CheckFsError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        Ok(match self.read(device)? {
            Some(current) if current == stored => Verdict::Match,
            Some(current) => Verdict::Mismatch { current },
            None => Verdict::Unsupported,
        })
    }
}

/// Adapter that recognises nothing.
pub struct UnsupportedAdapter(pub FilesystemKind);

impl FilesystemAdapter for UnsupportedAdapter {
    fn kind(&self) -> FilesystemKind {
        self.0
    }

    fn record_size(&self) -> u32 {
        0x10
    }

    fn compute_fingerprint_at_unmount(&self, _device: &mut dyn BlockDevice) -> Result<Capture, CheckFsError> {
        Ok(Capture::Unsupported)
    }

    fn verify_fingerprint(&self, _device: &mut dyn BlockDevice, _stored: Fingerprint) -> Result<Verdict, CheckFsError> {
        Ok(Verdict::Unsupported)
    }
}
