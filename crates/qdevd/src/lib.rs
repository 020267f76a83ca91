//! qdevd - automatic device assignment daemon
//!
//! This crate provides the daemon's building blocks:
//! - `config` - the daemon configuration (target/source domains, tracked
//!   classes, disk pattern, event subscription command)
//! - `registry` - the device registry actor, single owner of device state
//! - `policy` - the auto-attach decision logic
//! - `watcher` - the event-bus consumption loop feeding the registry
//! - `cli` - the `qdevd start|stop|status` entry point
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │DeviceEventStream│────▶│ DeviceRegistry  │────▶│ Broadcast Channel│
//! │  (event bus)    │     │    (actor)      │     │    (notices)     │
//! └─────────────────┘     └────────┬────────┘     └──────────────────┘
//!         │                        │
//!         │ DeviceEvent            │ attach/detach/enumerate
//!         │ (mpsc channel)         ▼
//!         │               ┌─────────────────┐
//!         └──────────────▶│   AdminClient   │
//!                         │  (qvm-* tools)  │
//!                         └─────────────────┘
//! ```
//!
//! Events are processed strictly sequentially: one handler runs to
//! completion before the next event is taken, so the registry needs no
//! locking and event ordering matches the bus's emission order.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cli;
pub mod config;
pub mod policy;
pub mod registry;
pub mod watcher;
