//! Device registry using the actor pattern.
//!
//! The registry is the daemon's single source of truth for which devices
//! exist and where they are attached. It receives typed device events over
//! a tokio mpsc channel and processes them strictly in order - the same
//! guarantee the platform's event bus gives, made explicit and testable.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │  Event Watcher  │────▶│ DeviceRegistry  │────▶│ Broadcast Channel│
//! └─────────────────┘     └─────────────────┘     └──────────────────┘
//!         │                       │                        │
//!         │   RegistryCommand     │   RegistryNotice       │
//!         │   (mpsc channel)      │   (broadcast)          ▼
//!         ▼                       ▼                  observability,
//!    Dispatch events        HashMap<key,             tests
//!                           DeviceRecord>
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use qdev_admin::AdminClient;

mod actor;
mod commands;
mod handle;

pub use actor::DeviceRegistry;
pub use commands::{AutoAttachStage, RegistryCommand, RegistryError, RegistryNotice};
pub use handle::RegistryHandle;

use crate::config::{ConfigError, DaemonConfig};
use crate::policy::AutoAttachPolicy;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const NOTICE_BUFFER: usize = 100;

/// Spawns the registry actor and returns a handle for interaction.
///
/// The actor bulk-seeds its state from a full enumeration before it starts
/// consuming events, so the attachment cache is warm from the first event.
///
/// # Errors
///
/// Fails only if the configured disk pattern does not compile.
pub fn spawn_registry(
    admin: Arc<dyn AdminClient>,
    config: &DaemonConfig,
) -> Result<RegistryHandle, ConfigError> {
    let policy = AutoAttachPolicy::from_config(config)?;

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (notice_tx, _) = broadcast::channel(NOTICE_BUFFER);

    let actor = DeviceRegistry::new(
        cmd_rx,
        admin,
        policy,
        config.device_classes.clone(),
        notice_tx.clone(),
    );
    tokio::spawn(actor.run());

    Ok(RegistryHandle::new(cmd_tx, notice_tx))
}
