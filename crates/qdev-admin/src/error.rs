//! Errors surfaced by the administrative client.

use std::io;

use thiserror::Error;

/// Failures talking to the platform's administrative tooling.
///
/// Variants carry the platform's human-readable message where one exists;
/// callers are expected to log these and continue, not to branch on them
/// (the one decision point - "domain disappeared during enumeration" - is
/// expressed as a [`crate::DeviceList`] variant, not an error).
#[derive(Error, Debug)]
pub enum AdminError {
    /// The administrative command could not be spawned at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The administrative command ran and reported failure.
    #[error("{program} failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    /// Output from the platform could not be understood.
    #[error("unparseable {what}: {line}")]
    Parse { what: &'static str, line: String },

    /// The event subscription terminated abnormally.
    #[error("event source failed: {0}")]
    EventSource(String),
}

impl AdminError {
    pub(crate) fn parse(what: &'static str, line: impl Into<String>) -> Self {
        AdminError::Parse {
            what,
            line: line.into(),
        }
    }
}
