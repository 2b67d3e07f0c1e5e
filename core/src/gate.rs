//! Availability gate for persistent CBT
//!
//! Decides whether a stored change-tracking bitmap may be reused when
//! tracking restarts on a device, and captures the fingerprint that makes
//! that decision possible when tracking is suspended. Both checks require
//! the device to be unmounted so they observe the filesystem at rest.
//!
//! Tracking may only resume on an explicit fingerprint match. Every other
//! outcome, including "no adapter understands this filesystem", is a denial.

use crate::{
    capture_fingerprint, verify_fingerprint, AdapterRegistry, BlockDevice, CheckFsError, CheckFsStatus,
    CheckParameters, DeviceId, DeviceOpener, MountStateProbe, Verdict,
};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct AvailabilityGate {
    opener: Arc<dyn DeviceOpener>,
    probe: Arc<dyn MountStateProbe>,
    registry: AdapterRegistry,
}

impl AvailabilityGate {
    pub fn new(
        opener: Arc<dyn DeviceOpener>,
        probe: Arc<dyn MountStateProbe>,
        registry: AdapterRegistry,
    ) -> Self {
        Self {
            opener,
            probe,
            registry,
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Checks whether tracking on `device_id` may resume from the bitmap
    /// stored together with `check_parameters`.
    ///
    /// `Ok(())` means the filesystem is unchanged since the parameters were
    /// captured. Any error means the stored bitmap must be discarded.
    pub fn check_tracker_available(
        &self,
        device_id: DeviceId,
        check_parameters: Option<&CheckParameters>,
    ) -> Result<(), CheckFsError> {
        info!("Check tracking configuration for device [{}]", device_id);

        let params = match check_parameters {
            Some(params) if !params.is_empty() => params,
            _ => {
                error!("Invalid check fs parameters");
                return Err(CheckFsError::InvalidArgument(
                    "check parameters are missing or empty".to_string(),
                ));
            }
        };

        let mut device = self.opener.open(device_id).map_err(|e| {
            error!("Failed to open device [{}]: {}", device_id, e);
            e
        })?;

        debug!("Check if the device is mounted");
        if self.mount_state(device.as_ref())? {
            error!("Device [{}] is already mounted", device_id);
            return Err(CheckFsError::DeviceBusy(device_id));
        }
        debug!("Device [{}] is not mounted", device_id);

        debug!("Check the device for offline changes");
        let stored = params.fingerprint();
        match verify_fingerprint(&self.registry, device.as_mut(), params)? {
            Verdict::Match => {
                info!("Device [{}] does not have offline changes", device_id);
                Ok(())
            }
            Verdict::Mismatch { current } => {
                error!("Device [{}] has offline changes", device_id);
                Err(CheckFsError::IntegrityMismatch {
                    device: device_id,
                    stored: stored.map(|f| f.to_string()).unwrap_or_default(),
                    current: current.to_string(),
                })
            }
            Verdict::Unsupported => {
                error!(
                    "Device [{}] cannot be checked for offline changes: no applicable fingerprint",
                    device_id
                );
                Err(CheckFsError::Unsupported(format!(
                    "no filesystem adapter can verify {}-byte check parameters on device [{}]",
                    params.size(),
                    device_id
                )))
            }
        }
    }

    /// Captures the check parameters to persist alongside the bitmap when
    /// tracking on `device_id` is suspended.
    ///
    /// The device must already be unmounted. On failure the returned status
    /// says why; the bitmap cannot be stored for this device.
    pub fn check_store_available(&self, device_id: DeviceId) -> Result<CheckParameters, CheckFsStatus> {
        info!("Check tracking configuration for device [{}]", device_id);

        let mut device = self.opener.open(device_id).map_err(|e| {
            error!("Failed to open device [{}]: {}", device_id, e);
            CheckFsStatus::from_error(device_id, "Failed to open device.", &e)
        })?;

        debug!("Checking if the device is unmounted");
        match self.mount_state(device.as_ref()) {
            Ok(false) => debug!("Device [{}] is already unmounted", device_id),
            Ok(true) => {
                error!("Device [{}] is still mounted.", device_id);
                let err = CheckFsError::DeviceBusy(device_id);
                return Err(CheckFsStatus::from_error(device_id, "Device is still mounted.", &err));
            }
            Err(e) => {
                return Err(CheckFsStatus::from_error(device_id, "Failed to get fs mount state.", &e));
            }
        }

        debug!("Unmount operation result check");
        match capture_fingerprint(&self.registry, device.as_mut()) {
            Ok(params) => {
                info!("Device [{}] has been unmounted successfully", device_id);
                Ok(params)
            }
            Err(e) => {
                error!("Failed to unmount device [{}]: {}", device_id, e);
                Err(CheckFsStatus::from_error(device_id, "Failed to unmount device.", &e))
            }
        }
    }

    fn mount_state(&self, device: &dyn BlockDevice) -> Result<bool, CheckFsError> {
        self.probe.is_mounted(device).map_err(|e| {
            error!("Failed to get fs mount state of device [{}]: {}", device.id(), e);
            match e {
                CheckFsError::ProbeFailed { .. } => e,
                other => CheckFsError::ProbeFailed {
                    device: device.id(),
                    reason: other.to_string(),
                },
            }
        })
    }
}
