//! Client interface for interacting with the DeviceRegistry actor.
//!
//! The `RegistryHandle` is a cheap-to-clone handle for dispatching events to
//! the registry actor, querying its state, and subscribing to notices.

use tokio::sync::{broadcast, mpsc, oneshot};

use qdev_core::{DeviceEvent, DeviceRecord};

use super::commands::{RegistryCommand, RegistryError, RegistryNotice};

/// Handle for interacting with the registry actor.
///
/// All methods are async and communicate with the actor via channels; the
/// handle can be cloned freely and shared across tasks.
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,

    /// Notice broadcaster for subscribing to updates
    notice_sender: broadcast::Sender<RegistryNotice>,
}

impl RegistryHandle {
    pub fn new(
        sender: mpsc::Sender<RegistryCommand>,
        notice_sender: broadcast::Sender<RegistryNotice>,
    ) -> Self {
        Self {
            sender,
            notice_sender,
        }
    }

    /// Delivers one device event and waits until it has been fully
    /// processed. Awaiting the ack is what preserves the bus's ordering
    /// guarantee end to end.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn dispatch(&self, event: DeviceEvent) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Dispatch {
                event,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Gets a single device record by canonical key.
    ///
    /// Returns `None` if the device is unknown or the actor is gone.
    pub async fn device(&self, key: &str) -> Option<DeviceRecord> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::GetDevice {
                key: key.to_string(),
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Gets all known device records.
    ///
    /// Returns an empty vector if the actor is gone.
    pub async fn all_devices(&self) -> Vec<DeviceRecord> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::GetAllDevices { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Subscribes to registry notices.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotice> {
        self.notice_sender.subscribe()
    }

    /// Whether the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
