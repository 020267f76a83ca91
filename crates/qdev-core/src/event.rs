//! Device events delivered by the platform event bus.
//!
//! The bus emits three event categories per device class. They are modelled
//! as one tagged variant with strongly-typed fields rather than the loose
//! keyword payloads the bus itself uses; the adapter in `qdev-admin` does
//! the translation.

use crate::device::{DeviceClass, DeviceInfo, DeviceKey};

/// One notification from the platform about a device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A device was attached to `domain`. Carries the full device payload
    /// so an unknown device can be recorded from the event alone.
    Attached { domain: String, device: DeviceInfo },

    /// A device was detached from `domain`.
    Detached {
        domain: String,
        key: DeviceKey,
        class: DeviceClass,
    },

    /// `domain`'s device list changed; the receiver should re-enumerate.
    ListChanged { domain: String, class: DeviceClass },
}

impl DeviceEvent {
    /// The domain the event concerns.
    pub fn domain(&self) -> &str {
        match self {
            DeviceEvent::Attached { domain, .. }
            | DeviceEvent::Detached { domain, .. }
            | DeviceEvent::ListChanged { domain, .. } => domain,
        }
    }

    /// The device class the event concerns.
    pub fn class(&self) -> DeviceClass {
        match self {
            DeviceEvent::Attached { device, .. } => device.class,
            DeviceEvent::Detached { class, .. } | DeviceEvent::ListChanged { class, .. } => *class,
        }
    }
}
