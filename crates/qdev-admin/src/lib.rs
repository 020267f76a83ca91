//! qdev-admin - Administrative client seam for VM device management
//!
//! This crate isolates everything that talks to the platform:
//! - [`AdminClient`] - the async trait both binaries program against
//! - [`QvmAdminClient`] - the production implementation shelling out to the
//!   platform's `qvm-*` command line tools
//! - [`DeviceEventStream`] - the adapter that subscribes to the platform
//!   event bus and yields typed [`qdev_core::DeviceEvent`]s
//!
//! The trait boundary exists so the daemon's registry and the TUI can be
//! driven by fabricated clients in tests; nothing above this crate spawns a
//! process or parses platform output.

mod client;
mod error;
mod events;
mod qvm;

pub use client::{AdminClient, Assignment, DeviceList};
pub use error::AdminError;
pub use events::{parse_event_line, DeviceEventStream};
pub use qvm::QvmAdminClient;
