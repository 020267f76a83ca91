//! The `AdminClient` trait - the seam between this codebase and the platform.

use async_trait::async_trait;

use qdev_core::{DeviceClass, DeviceInfo, DeviceKey, DomainInfo};

use crate::error::AdminError;

// ============================================================================
// Assignment
// ============================================================================

/// A device-to-domain binding request.
///
/// The persistence flag decides whether the platform remembers the binding
/// across VM restarts. The auto-attach daemon only ever uses non-persistent
/// assignments so stale bindings cannot accumulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub backend_domain: String,
    pub ident: String,
    pub class: DeviceClass,
    pub persistent: bool,
}

impl Assignment {
    /// A non-persistent assignment for the given device.
    pub fn non_persistent(key: &DeviceKey, class: DeviceClass) -> Self {
        Self {
            backend_domain: key.backend_domain().to_string(),
            ident: key.ident().to_string(),
            class,
            persistent: false,
        }
    }

    /// The `backend:ident` argument the administrative CLI expects.
    pub fn device_arg(&self) -> String {
        format!("{}:{}", self.backend_domain, self.ident)
    }
}

// ============================================================================
// Device List
// ============================================================================

/// Result of enumerating one domain's devices.
///
/// A domain destroyed mid-enumeration is a normal outcome, not an error:
/// callers treat `DomainGone` as "this domain has zero devices".
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceList {
    Listed(Vec<DeviceInfo>),
    DomainGone,
}

// ============================================================================
// Admin Client
// ============================================================================

/// Asynchronous interface to the platform's administrative operations.
///
/// The production implementation is [`crate::QvmAdminClient`]; tests drive
/// the daemon and TUI with in-memory fabrications.
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Enumerates all domains with their class tag and running state.
    async fn domains(&self) -> Result<Vec<DomainInfo>, AdminError>;

    /// Ground-truth running check for a single domain.
    ///
    /// An unknown domain is simply not running.
    async fn is_running(&self, domain: &str) -> Result<bool, AdminError>;

    /// Enumerates the devices of one class exposed by `domain`.
    async fn devices(&self, domain: &str, class: DeviceClass) -> Result<DeviceList, AdminError>;

    /// Attaches a device to `frontend` per the assignment.
    async fn attach(&self, frontend: &str, assignment: &Assignment) -> Result<(), AdminError>;

    /// Detaches a device from `frontend` per the assignment.
    async fn detach(&self, frontend: &str, assignment: &Assignment) -> Result<(), AdminError>;
}
