//! Production `AdminClient` backed by the platform's `qvm-*` CLI tools.
//!
//! Commands and output formats:
//! - `qvm-ls --raw-data --fields NAME,CLASS,STATE` - one domain per line,
//!   pipe-separated: `name|class|state`
//! - `qvm-check --quiet --running <domain>` - exit 0 iff the domain runs
//! - `qvm-device <class> list <domain>` - one device per line,
//!   tab-separated: `backend:ident<TAB>description[<TAB>frontend ...]`
//! - `qvm-device <class> attach [--persistent] <frontend> <backend:ident>`
//! - `qvm-device <class> detach <frontend> <backend:ident>`
//!
//! Enumeration of a domain that no longer exists reports "no such domain"
//! on stderr; that maps to [`DeviceList::DomainGone`] rather than an error.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use qdev_core::{DeviceClass, DeviceInfo, DeviceKey, DomainClass, DomainInfo};

use crate::client::{AdminClient, Assignment, DeviceList};
use crate::error::AdminError;

/// `AdminClient` implementation that shells out to the platform CLI.
#[derive(Debug, Default, Clone)]
pub struct QvmAdminClient;

impl QvmAdminClient {
    pub fn new() -> Self {
        Self
    }

    /// Runs an administrative command, capturing its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<std::process::Output, AdminError> {
        trace!(program, ?args, "running admin command");
        Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| AdminError::Spawn {
                program: program.to_string(),
                source,
            })
    }
}

#[async_trait]
impl AdminClient for QvmAdminClient {
    async fn domains(&self) -> Result<Vec<DomainInfo>, AdminError> {
        let output = self
            .run("qvm-ls", &["--raw-data", "--fields", "NAME,CLASS,STATE"])
            .await?;

        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                program: "qvm-ls".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_domain_line)
            .collect()
    }

    async fn is_running(&self, domain: &str) -> Result<bool, AdminError> {
        let output = self
            .run("qvm-check", &["--quiet", "--running", domain])
            .await?;
        // Exit 0: running. Any other exit (halted, nonexistent): not running.
        Ok(output.status.success())
    }

    async fn devices(&self, domain: &str, class: DeviceClass) -> Result<DeviceList, AdminError> {
        let output = self
            .run("qvm-device", &[class.as_str(), "list", domain])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr_names_missing_domain(&stderr) {
                debug!(domain, %class, "domain vanished during enumeration");
                return Ok(DeviceList::DomainGone);
            }
            return Err(AdminError::CommandFailed {
                program: "qvm-device".to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let devices = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_device_line(class, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeviceList::Listed(devices))
    }

    async fn attach(&self, frontend: &str, assignment: &Assignment) -> Result<(), AdminError> {
        let device_arg = assignment.device_arg();
        let mut args = vec![assignment.class.as_str(), "attach"];
        if assignment.persistent {
            args.push("--persistent");
        }
        args.push(frontend);
        args.push(&device_arg);

        let output = self.run("qvm-device", &args).await?;
        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                program: "qvm-device".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn detach(&self, frontend: &str, assignment: &Assignment) -> Result<(), AdminError> {
        let device_arg = assignment.device_arg();
        let output = self
            .run(
                "qvm-device",
                &[assignment.class.as_str(), "detach", frontend, &device_arg],
            )
            .await?;
        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                program: "qvm-device".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Output Parsing
// ============================================================================

/// Whether a failed enumeration's stderr indicates the domain is gone.
fn stderr_names_missing_domain(stderr: &str) -> bool {
    stderr.contains("no such domain") || stderr.contains("VMNotFoundError")
}

/// Parses one `qvm-ls --raw-data` line: `name|class|state`.
fn parse_domain_line(line: &str) -> Result<DomainInfo, AdminError> {
    let mut fields = line.split('|');
    let (Some(name), Some(class), Some(state)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(AdminError::parse("domain listing line", line));
    };

    // DomainClass::from_str is infallible; unknown tags become Unknown.
    let class = class
        .trim()
        .parse::<DomainClass>()
        .unwrap_or(DomainClass::Unknown);

    Ok(DomainInfo::new(
        name.trim(),
        class,
        state.trim() == "Running",
    ))
}

/// Parses one `qvm-device list` line:
/// `backend:ident<TAB>description[<TAB>frontend ...]`.
fn parse_device_line(class: DeviceClass, line: &str) -> Result<DeviceInfo, AdminError> {
    let mut fields = line.split('\t');
    let Some(key_field) = fields.next() else {
        return Err(AdminError::parse("device listing line", line));
    };
    let key = DeviceKey::parse(key_field.trim())
        .map_err(|_| AdminError::parse("device listing line", line))?;

    let description = fields.next().map(str::trim).unwrap_or_default();
    let used_by = fields
        .next()
        .map(|frontends| {
            frontends
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(DeviceInfo::new(key, description, class).with_used_by(used_by))
}

// ============================================================================
// Tests
// ============================================================================
