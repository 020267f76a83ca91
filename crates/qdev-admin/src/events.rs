//! Subscription adapter for the platform's device event bus.
//!
//! The bus is consumed through a subscription command (configurable,
//! `qubes-events` by default) that prints one event per line:
//!
//! ```text
//! device-attach:usb work sys-usb:2-2 058f:6387 Mass_Storage
//! device-detach:usb work sys-usb:2-2
//! device-list-change:usb sys-usb
//! ```
//!
//! The first token is `<category>:<class>`, the second the domain the event
//! concerns. Attach events carry the device key and its description; detach
//! events carry the key alone. Events for classes the caller did not
//! subscribe to are skipped, as are lines that do not parse (logged and
//! dropped - a malformed line must never take the daemon down).
//!
//! The stream ends when the subscription process exits: a zero exit status
//! is a clean end of stream, anything else surfaces as an error so the
//! caller can honor the process exit contract.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use qdev_core::{DeviceClass, DeviceEvent, DeviceInfo, DeviceKey};

use crate::error::AdminError;

/// A live subscription to the platform's device events.
pub struct DeviceEventStream {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    classes: Vec<DeviceClass>,
}

impl DeviceEventStream {
    /// Spawns the subscription command and begins reading events for the
    /// given device classes.
    pub fn spawn(command: &[String], classes: &[DeviceClass]) -> Result<Self, AdminError> {
        let Some((program, args)) = command.split_first() else {
            return Err(AdminError::EventSource(
                "empty event subscription command".to_string(),
            ));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| AdminError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AdminError::EventSource("event subscription has no stdout".to_string())
        })?;

        info!(program = %program, classes = ?classes, "subscribed to device events");

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            classes: classes.to_vec(),
        })
    }

    /// Waits for the next event.
    ///
    /// Returns `Ok(None)` when the subscription ends cleanly and an error
    /// when it terminates abnormally. Unparseable or unsubscribed lines are
    /// skipped, so this only yields events the caller asked for.
    pub async fn next_event(&mut self) -> Result<Option<DeviceEvent>, AdminError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| AdminError::EventSource(e.to_string()))?;

            let Some(line) = line else {
                return self.finish().await;
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_event_line(&line) {
                Ok(event) if self.classes.contains(&event.class()) => return Ok(Some(event)),
                Ok(event) => {
                    debug!(class = %event.class(), "skipping event for untracked class");
                }
                Err(e) => {
                    warn!(error = %e, line = %line, "skipping unparseable event line");
                }
            }
        }
    }

    /// Reaps the subscription process and maps its exit status.
    async fn finish(&mut self) -> Result<Option<DeviceEvent>, AdminError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| AdminError::EventSource(e.to_string()))?;

        if status.success() {
            info!("event subscription ended");
            Ok(None)
        } else {
            Err(AdminError::EventSource(format!(
                "subscription process exited with {status}"
            )))
        }
    }
}

// ============================================================================
// Line Parsing
// ============================================================================

/// Parses one event-bus line into a typed [`DeviceEvent`].
pub fn parse_event_line(line: &str) -> Result<DeviceEvent, AdminError> {
    let mut tokens = line.split_whitespace();
    let (Some(name), Some(domain)) = (tokens.next(), tokens.next()) else {
        return Err(AdminError::parse("event line", line));
    };

    let Some((category, class)) = name.split_once(':') else {
        return Err(AdminError::parse("event line", line));
    };
    let class: DeviceClass = class
        .parse()
        .map_err(|_| AdminError::parse("event line", line))?;

    match category {
        "device-attach" => {
            let key = tokens
                .next()
                .ok_or_else(|| AdminError::parse("event line", line))
                .and_then(|k| {
                    DeviceKey::parse(k).map_err(|_| AdminError::parse("event line", line))
                })?;
            let description = tokens.collect::<Vec<_>>().join(" ");
            Ok(DeviceEvent::Attached {
                domain: domain.to_string(),
                device: DeviceInfo::new(key, description, class),
            })
        }
        "device-detach" => {
            let key = tokens
                .next()
                .ok_or_else(|| AdminError::parse("event line", line))
                .and_then(|k| {
                    DeviceKey::parse(k).map_err(|_| AdminError::parse("event line", line))
                })?;
            Ok(DeviceEvent::Detached {
                domain: domain.to_string(),
                key,
                class,
            })
        }
        "device-list-change" => Ok(DeviceEvent::ListChanged {
            domain: domain.to_string(),
            class,
        }),
        _ => Err(AdminError::parse("event line", line)),
    }
}

// ============================================================================
// Tests
// ============================================================================
