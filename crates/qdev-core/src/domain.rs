//! Virtual-machine domain descriptors.

use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Class
// ============================================================================

/// Class tag of a domain, as reported by the platform.
///
/// Only the admin class matters to this codebase: the privileged management
/// domain is excluded from device tracking and from the manual client's VM
/// selector. Everything else is treated uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainClass {
    AdminVm,
    AppVm,
    TemplateVm,
    StandaloneVm,
    DispVm,
    /// Class names this build does not know about.
    Unknown,
}

impl FromStr for DomainClass {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "AdminVM" => DomainClass::AdminVm,
            "AppVM" => DomainClass::AppVm,
            "TemplateVM" => DomainClass::TemplateVm,
            "StandaloneVM" => DomainClass::StandaloneVm,
            "DispVM" => DomainClass::DispVm,
            _ => DomainClass::Unknown,
        })
    }
}

impl fmt::Display for DomainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainClass::AdminVm => "AdminVM",
            DomainClass::AppVm => "AppVM",
            DomainClass::TemplateVm => "TemplateVM",
            DomainClass::StandaloneVm => "StandaloneVM",
            DomainClass::DispVm => "DispVM",
            DomainClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Domain Info
// ============================================================================

/// One enumerated domain: name, class tag, and running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub name: String,
    pub class: DomainClass,
    pub running: bool,
}

impl DomainInfo {
    pub fn new(name: impl Into<String>, class: DomainClass, running: bool) -> Self {
        Self {
            name: name.into(),
            class,
            running,
        }
    }

    /// Whether this domain participates in device management.
    ///
    /// The privileged management domain never does.
    pub fn is_managed(&self) -> bool {
        self.class != DomainClass::AdminVm
    }
}
