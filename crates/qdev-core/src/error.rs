//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur when constructing domain values from raw input.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// The device class string is not one of the known classes.
    #[error("unknown device class: {0}")]
    UnknownDeviceClass(String),

    /// A device key did not have the `backend:ident` shape.
    #[error("malformed device key: {0} (expected backend:ident)")]
    MalformedDeviceKey(String),
}

/// Result type for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
