// Store path: fingerprint the settled filesystem once it is unmounted

use crate::{AdapterRegistry, BlockDevice, Capture, CheckFsError, CheckParameters};
use tracing::{debug, info};

/// Tries each adapter in priority order and packages the first fingerprint
/// into a record of that adapter's size.
///
/// The caller must have confirmed the device is unmounted. If no adapter
/// recognises the filesystem the result is [`CheckFsError::Unsupported`]:
/// the device cannot be tracked persistently, retrying will not help.
pub fn capture_fingerprint(
    registry: &AdapterRegistry,
    device: &mut dyn BlockDevice,
) -> Result<CheckParameters, CheckFsError> {
    let id = device.id();

    for adapter in registry.iter() {
        match adapter.compute_fingerprint_at_unmount(device)? {
            Capture::Fingerprint(fingerprint) => {
                info!(
                    "Captured {} fingerprint {} for device [{}]",
                    adapter.kind(),
                    fingerprint,
                    id
                );
                return CheckParameters::with_fingerprint(adapter.record_size(), fingerprint);
            }
            Capture::Unsupported => {
                debug!("{} adapter does not apply to device [{}]", adapter.kind(), id);
            }
        }
    }

    Err(CheckFsError::Unsupported(format!(
        "no filesystem adapter can fingerprint device [{}]",
        id
    )))
}
