//! Device identity and registry record types.
//!
//! A device is identified by the domain that physically exposes it (the
//! backend domain) plus a slot identifier assigned by that domain. The
//! canonical string form `backend:ident` is the key used everywhere:
//! registry lookups, manual-detach markers, event payloads, and the
//! administrative CLI all speak this form.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Device Class
// ============================================================================

/// Class of a virtual-machine device.
///
/// The daemon tracks `block` and `usb` by default; the manual control
/// client additionally handles `mic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Block storage devices (disks, partitions).
    Block,
    /// USB devices.
    Usb,
    /// Microphone / audio input.
    Mic,
}

impl DeviceClass {
    /// All known device classes.
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Block, DeviceClass::Usb, DeviceClass::Mic];

    /// The lowercase name used by the administrative CLI and event bus.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Block => "block",
            DeviceClass::Usb => "usb",
            DeviceClass::Mic => "mic",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(DeviceClass::Block),
            "usb" => Ok(DeviceClass::Usb),
            "mic" => Ok(DeviceClass::Mic),
            other => Err(CoreError::UnknownDeviceClass(other.to_string())),
        }
    }
}

// ============================================================================
// Device Key
// ============================================================================

/// Composite device identity: backend domain plus slot identifier.
///
/// Equality, hashing, and ordering follow the canonical `backend:ident`
/// string. Two observations with the same key are the same device no
/// matter what their attachment state looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    backend_domain: String,
    ident: String,
}

impl DeviceKey {
    pub fn new(backend_domain: impl Into<String>, ident: impl Into<String>) -> Self {
        Self {
            backend_domain: backend_domain.into(),
            ident: ident.into(),
        }
    }

    /// The domain currently exposing the device.
    pub fn backend_domain(&self) -> &str {
        &self.backend_domain
    }

    /// The slot identifier within the backend domain (e.g. `2-1`, `sda`).
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Parses the canonical `backend:ident` form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.split_once(':') {
            Some((backend, ident)) if !backend.is_empty() && !ident.is_empty() => {
                Ok(Self::new(backend, ident))
            }
            _ => Err(CoreError::MalformedDeviceKey(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend_domain, self.ident)
    }
}

// ============================================================================
// Device Info
// ============================================================================

/// Freshly enumerated device attributes, as reported by the platform.
///
/// `used_by` is the enumeration's view of which frontend domains currently
/// use the device. It is ground truth at the moment of enumeration and
/// nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub key: DeviceKey,
    pub description: String,
    pub class: DeviceClass,
    pub used_by: Vec<String>,
}

impl DeviceInfo {
    pub fn new(key: DeviceKey, description: impl Into<String>, class: DeviceClass) -> Self {
        Self {
            key,
            description: description.into(),
            class,
            used_by: Vec::new(),
        }
    }

    pub fn with_used_by(mut self, used_by: Vec<String>) -> Self {
        self.used_by = used_by;
        self
    }
}

// ============================================================================
// Device Record
// ============================================================================

/// Registry entry for one known device.
///
/// The attachment set is a best-effort cache: seeded from enumeration when
/// the record is created and updated by attach events afterwards. It is only
/// guaranteed to agree with the platform at list-change reconciliations.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub key: DeviceKey,
    pub description: String,
    pub class: DeviceClass,
    pub attachments: BTreeSet<String>,
}

impl DeviceRecord {
    /// Builds a record from enumerated attributes, seeding the attachment
    /// set from the enumeration's used-by view.
    pub fn from_info(info: &DeviceInfo) -> Self {
        Self {
            key: info.key.clone(),
            description: info.description.clone(),
            class: info.class,
            attachments: info.used_by.iter().cloned().collect(),
        }
    }

    /// Refreshes descriptive attributes without touching the attachment set.
    pub fn refresh(&mut self, info: &DeviceInfo) {
        self.description = info.description.clone();
        self.class = info.class;
    }

    /// The domain exposing this device.
    pub fn backend_domain(&self) -> &str {
        self.key.backend_domain()
    }
}

// ============================================================================
// Tests
// ============================================================================
