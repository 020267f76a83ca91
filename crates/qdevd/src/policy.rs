//! Auto-attach decision logic.
//!
//! The policy is deliberately pure: it looks at a device record, the
//! configured source/target domains, the disk-device naming pattern, and the
//! manual-detach marker set. No hardware introspection - which keeps the
//! decision auditable and testable without real devices. The side effects
//! (detach from current frontends, attach to the target) live in the
//! registry actor.

use std::collections::HashSet;

use regex::Regex;

use qdev_core::DeviceRecord;

use crate::config::{ConfigError, DaemonConfig};

/// Decides whether a newly observed device should move to the target VM.
#[derive(Debug, Clone)]
pub struct AutoAttachPolicy {
    source_domain: String,
    target_domain: String,
    disk_pattern: Regex,
}

impl AutoAttachPolicy {
    /// Builds the policy from configuration, compiling the disk pattern.
    pub fn from_config(config: &DaemonConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source_domain: config.source_domain.clone(),
            target_domain: config.target_domain.clone(),
            disk_pattern: config.compile_disk_pattern()?,
        })
    }

    /// The configured auto-attach destination.
    pub fn target_domain(&self) -> &str {
        &self.target_domain
    }

    /// Whether the device should be claimed for the target VM.
    ///
    /// The caller only invokes this for devices that are newly observed
    /// during the current reconciliation - known identities are never
    /// re-claimed. On top of that, all of the following must hold:
    /// the backend domain is the designated source, the canonical key
    /// matches the disk pattern, and the operator has not explicitly
    /// detached this identity.
    pub fn wants(&self, record: &DeviceRecord, manually_detached: &HashSet<String>) -> bool {
        record.backend_domain() == self.source_domain
            && self.disk_pattern.is_match(&record.key.to_string())
            && !manually_detached.contains(&record.key.to_string())
    }
}
