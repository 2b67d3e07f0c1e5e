// Load path: compare the resting filesystem with a stored fingerprint

use crate::{AdapterRegistry, BlockDevice, CheckFsError, CheckParameters, Verdict};
use tracing::{debug, info, warn};

/// Hands `params` to the first adapter whose record size it satisfies and
/// that recognises the device.
///
/// Returns [`Verdict::Unsupported`] when no adapter applies; callers must
/// not treat that as a match.
pub fn verify_fingerprint(
    registry: &AdapterRegistry,
    device: &mut dyn BlockDevice,
    params: &CheckParameters,
) -> Result<Verdict, CheckFsError> {
    let id = device.id();

    let Some(stored) = params.fingerprint() else {
        warn!(
            "Check parameters of {} bytes for device [{}] carry no fingerprint",
            params.size(),
            id
        );
        return Ok(Verdict::Unsupported);
    };

    for adapter in registry.iter() {
        if params.size() < adapter.record_size() {
            debug!(
                "Skipping {} adapter for device [{}]: record of {} bytes is shorter than {}",
                adapter.kind(),
                id,
                params.size(),
                adapter.record_size()
            );
            continue;
        }

        match adapter.verify_fingerprint(device, stored)? {
            Verdict::Unsupported => {
                debug!("{} adapter does not apply to device [{}]", adapter.kind(), id);
            }
            Verdict::Match => {
                info!("Device [{}] {} fingerprint {} matches", id, adapter.kind(), stored);
                return Ok(Verdict::Match);
            }
            Verdict::Mismatch { current } => {
                warn!(
                    "Device [{}] {} fingerprint changed: stored {}, current {}",
                    id,
                    adapter.kind(),
                    stored,
                    current
                );
                return Ok(Verdict::Mismatch { current });
            }
        }
    }

    Ok(Verdict::Unsupported)
}
