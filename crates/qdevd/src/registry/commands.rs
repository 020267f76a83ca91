//! Registry actor commands, errors, and notices.
//!
//! This module defines the message types for communicating with the
//! `DeviceRegistry` actor:
//! - `RegistryCommand`: commands sent to the actor
//! - `RegistryError`: errors that can occur talking to the actor
//! - `RegistryNotice`: notifications the actor publishes for subscribers
//!
//! All types are designed for async message passing and follow the
//! panic-free policy.

use thiserror::Error;
use tokio::sync::oneshot;

use qdev_core::{DeviceEvent, DeviceRecord};

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Queries use a oneshot channel for the response. Event dispatch also
/// carries a oneshot so a caller can await "this event has been fully
/// processed" - which is what gives tests (and the watcher's ordering
/// guarantee) their footing.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Deliver one device event for processing.
    Dispatch {
        event: DeviceEvent,
        /// Acked once the event has been fully handled.
        respond_to: oneshot::Sender<()>,
    },

    /// Get a single device record by its canonical key.
    GetDevice {
        key: String,
        respond_to: oneshot::Sender<Option<DeviceRecord>>,
    },

    /// Get all known device records.
    GetAllDevices {
        respond_to: oneshot::Sender<Vec<DeviceRecord>>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur when talking to the registry actor.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The actor has stopped and its channel is closed.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Registry Notices
// ============================================================================

/// Notifications published by the registry on its broadcast channel.
///
/// These exist for observability: log followers, a future status surface,
/// and the integration tests all subscribe to them. Losing a notice (lagged
/// receiver) never affects registry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryNotice {
    /// A previously unknown device was recorded.
    DeviceAdded { key: String },

    /// A device disappeared from its backend domain and was dropped.
    DeviceRemoved { key: String },

    /// A device was successfully moved to the target VM.
    AutoAttached { key: String, target: String },

    /// An auto-attach attempt failed at the given stage.
    AutoAttachFailed { key: String, stage: AutoAttachStage },
}

/// Which half of the detach-then-attach sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAttachStage {
    /// Detaching from a current frontend failed; no attach was attempted.
    Detach,
    /// The final attach to the target failed; the device may be attached
    /// to nothing.
    Attach,
}

impl std::fmt::Display for AutoAttachStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detach => write!(f, "detach"),
            Self::Attach => write!(f, "attach"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        assert_eq!(
            RegistryError::ChannelClosed.to_string(),
            "registry channel closed"
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(AutoAttachStage::Detach.to_string(), "detach");
        assert_eq!(AutoAttachStage::Attach.to_string(), "attach");
    }

    #[tokio::test]
    async fn test_dispatch_oneshot_pattern() {
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tx.send(()).ok();
        });
        assert!(rx.await.is_ok());
    }
}
