//! qdev-core - Shared types for VM device management
//!
//! This crate provides the domain types shared between the auto-attach
//! daemon (qdevd) and the manual control TUI (qdev).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod device;
pub mod domain;
pub mod error;
pub mod event;

// Re-exports for convenience
pub use device::{DeviceClass, DeviceInfo, DeviceKey, DeviceRecord};
pub use domain::{DomainClass, DomainInfo};
pub use error::{CoreError, CoreResult};
pub use event::DeviceEvent;
