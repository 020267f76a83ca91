//! Event watcher - feeds the platform's device events into the registry.
//!
//! One loop, one ordering guarantee: events are forwarded to the registry
//! in the order the bus emits them, and each is fully processed before the
//! next is read. The loop ends when the event source closes (clean), the
//! shutdown token fires (clean), or the source fails (error - the caller
//! maps this to a non-zero process exit).

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use qdev_admin::{AdminError, DeviceEventStream};

use crate::config::DaemonConfig;
use crate::registry::RegistryHandle;

/// Failures of the event-watching loop.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The event subscription failed to start or terminated abnormally.
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// The registry actor stopped while events were still arriving.
    #[error("device registry stopped")]
    RegistryStopped,
}

/// Subscribes to the event bus and forwards events until shutdown.
pub async fn watch_events(
    config: &DaemonConfig,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
) -> Result<(), WatchError> {
    let mut stream = DeviceEventStream::spawn(&config.events_command, &config.device_classes)?;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("event watcher stopping");
                return Ok(());
            }
            next = stream.next_event() => {
                match next? {
                    Some(event) => {
                        debug!(domain = %event.domain(), class = %event.class(), "event received");
                        registry
                            .dispatch(event)
                            .await
                            .map_err(|_| WatchError::RegistryStopped)?;
                    }
                    None => {
                        info!("event source closed, watcher exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}
