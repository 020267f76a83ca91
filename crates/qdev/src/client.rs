//! Snapshot building and connect/disconnect operations.
//!
//! These are the TUI's only touchpoints with the platform: enumerate on
//! demand, attach or detach on request. They run in spawned tasks so the
//! render loop never blocks on an administrative call.

use std::sync::Arc;

use tracing::{debug, info};

use qdev_admin::{AdminClient, AdminError, Assignment, DeviceList};
use qdev_core::{DeviceClass, DeviceKey};

use crate::app::{DeviceEntry, Snapshot};

/// Builds a fresh view: running non-admin VMs plus every device of every
/// class exposed by a running domain.
pub async fn load_snapshot(admin: Arc<dyn AdminClient>) -> Result<Snapshot, AdminError> {
    let domains = admin.domains().await?;

    let running_vms: Vec<String> = domains
        .iter()
        .filter(|d| d.running && d.is_managed())
        .map(|d| d.name.clone())
        .collect();

    let mut devices = Vec::new();
    for domain in domains.iter().filter(|d| d.running) {
        for class in DeviceClass::ALL {
            match admin.devices(&domain.name, class).await? {
                DeviceList::Listed(infos) => {
                    devices.extend(infos.into_iter().map(DeviceEntry::from_info));
                }
                DeviceList::DomainGone => {
                    // Raced a shutdown; the domain simply has no devices now
                    debug!(domain = %domain.name, "domain vanished during refresh");
                }
            }
        }
    }

    debug!(
        devices = devices.len(),
        vms = running_vms.len(),
        "snapshot built"
    );

    Ok(Snapshot {
        devices,
        running_vms,
    })
}

/// Connects a device to `frontend` with a non-persistent assignment.
///
/// Returns the status-line message to show on success.
pub async fn connect_device(
    admin: Arc<dyn AdminClient>,
    key: DeviceKey,
    class: DeviceClass,
    description: String,
    frontend: String,
) -> Result<String, AdminError> {
    let assignment = Assignment::non_persistent(&key, class);
    admin.attach(&frontend, &assignment).await?;
    info!(device = %key, frontend = %frontend, "device connected");
    Ok(format!("Connected {description} to {frontend}"))
}

/// Disconnects a device from `frontend`.
///
/// Returns the status-line message to show on success.
pub async fn disconnect_device(
    admin: Arc<dyn AdminClient>,
    key: DeviceKey,
    class: DeviceClass,
    description: String,
    frontend: String,
) -> Result<String, AdminError> {
    let assignment = Assignment::non_persistent(&key, class);
    admin.detach(&frontend, &assignment).await?;
    info!(device = %key, frontend = %frontend, "device disconnected");
    Ok(format!("Disconnected {description} from {frontend}"))
}
