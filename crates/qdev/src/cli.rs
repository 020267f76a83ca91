//! qdev terminal entry point: terminal lifecycle, keyboard task, and the
//! main event loop.
//!
//! # Architecture
//!
//! Three cooperating pieces:
//!
//! 1. **Keyboard Task**: polls for keyboard input and sends events to the
//!    main loop
//! 2. **Admin Tasks**: every enumeration and connect/disconnect runs as a
//!    short-lived spawned task whose result comes back as an event, so the
//!    render loop never blocks on the platform
//! 3. **Main Event Loop**: processes events, updates state, renders
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use qdev_admin::{AdminClient, QvmAdminClient};

use crate::app::App;
use crate::client;
use crate::error::{Result as TuiResult, TuiError};
use crate::input::{handle_key_event, Action, Event};
use crate::ui;

// ============================================================================
// CLI Arguments
// ============================================================================

/// qdev - manual VM device control
#[derive(Parser, Debug)]
#[command(name = "qdev")]
#[command(about = "Connect and disconnect devices to running VMs")]
#[command(version)]
struct Args {}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

/// Initializes the terminal for TUI rendering: raw mode plus the alternate
/// screen buffer.
fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting, even on error.
fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Keyboard Input Task
// ============================================================================

/// Spawns a task that polls for keyboard input and forwards events.
///
/// Crossterm's polling is synchronous, so it runs via `spawn_blocking` with
/// a short timeout that lets the task notice cancellation.
fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {
                    // Other events (mouse, paste) or timeout - keep polling
                }
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

// ============================================================================
// Admin Tasks
// ============================================================================

/// Spawns a snapshot rebuild; the result comes back as an event.
fn spawn_refresh(admin: Arc<dyn AdminClient>, event_tx: mpsc::UnboundedSender<Event>) {
    tokio::spawn(async move {
        let event = match client::load_snapshot(admin).await {
            Ok(snapshot) => Event::Snapshot(snapshot),
            Err(e) => Event::SnapshotFailed(e.to_string()),
        };
        let _ = event_tx.send(event);
    });
}

/// Spawns the connect/disconnect operation for the currently selected
/// device. Returns `false` if there is nothing actionable (no device, or a
/// disconnected device with no target VM).
fn spawn_toggle(
    app: &App,
    admin: Arc<dyn AdminClient>,
    event_tx: mpsc::UnboundedSender<Event>,
) -> bool {
    let Some(entry) = app.selected_device() else {
        return false;
    };

    let key = entry.info.key.clone();
    let class = entry.info.class;
    let description = entry.info.description.replace('_', " ");

    if let Some(frontend) = entry.attached_to.clone() {
        tokio::spawn(async move {
            let event = match client::disconnect_device(admin, key, class, description, frontend)
                .await
            {
                Ok(message) => Event::OperationFinished {
                    message,
                    failed: false,
                },
                Err(e) => Event::OperationFinished {
                    message: format!("Disconnect failed: {e}"),
                    failed: true,
                },
            };
            let _ = event_tx.send(event);
        });
        true
    } else if let Some(target) = app.selected_target() {
        let target = target.to_string();
        tokio::spawn(async move {
            let event = match client::connect_device(admin, key, class, description, target).await {
                Ok(message) => Event::OperationFinished {
                    message,
                    failed: false,
                },
                Err(e) => Event::OperationFinished {
                    message: format!("Connect failed: {e}"),
                    failed: true,
                },
            };
            let _ = event_tx.send(event);
        });
        true
    } else {
        false
    }
}

// ============================================================================
// Main Event Loop
// ============================================================================

/// Runs the main TUI event loop until quit or cancellation.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    event_tx: &mpsc::UnboundedSender<Event>,
    admin: Arc<dyn AdminClient>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    // Tick interval for periodic redraws
    let tick_rate = Duration::from_millis(200);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = tokio::time::timeout(tick_rate, event_rx.recv()).await;

        match event {
            Ok(Some(received)) => match received {
                Event::Key(key) => match handle_key_event(key, app) {
                    Action::Quit => {
                        info!("User requested quit");
                        cancel_token.cancel();
                        break;
                    }
                    Action::Refresh => {
                        debug!("User requested refresh");
                        app.busy = true;
                        app.status_message = None;
                        spawn_refresh(admin.clone(), event_tx.clone());
                    }
                    Action::ToggleConnection => {
                        if spawn_toggle(app, admin.clone(), event_tx.clone()) {
                            app.busy = true;
                        } else {
                            app.set_status("Nothing to connect: no running VM selected");
                        }
                    }
                    Action::None => {}
                },
                Event::Resize(_width, _height) => {
                    // ratatui picks the new size up on the next draw
                    debug!("Terminal resized");
                }
                Event::Snapshot(snapshot) => {
                    debug!(devices = snapshot.devices.len(), "Snapshot received");
                    app.apply_snapshot(snapshot);
                }
                Event::SnapshotFailed(message) => {
                    warn!(error = %message, "Snapshot failed");
                    app.mark_failed(message);
                }
                Event::OperationFinished { message, failed } => {
                    if failed {
                        warn!(message = %message, "Operation failed");
                    } else {
                        info!(message = %message, "Operation finished");
                    }
                    app.set_status(message);
                    // Rebuild the view either way; a failed operation may
                    // still have changed platform state
                    spawn_refresh(admin.clone(), event_tx.clone());
                }
            },
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {
                // Timeout - redraw on the next iteration
            }
        }

        if app.should_quit || cancel_token.is_cancelled() {
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Returns the log directory, respecting `$XDG_STATE_HOME`.
fn get_log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("qdev"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/qdev"))
}

/// Opens the log file in append mode, creating the directory if needed.
///
/// TUI apps cannot log to stderr - it writes to the same terminal as the
/// alternate screen. Returns `None` (logging disabled) on any failure,
/// after warning on stderr while it is still visible.
fn create_log_file() -> Option<std::fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("qdev.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parses arguments and runs the TUI.
#[tokio::main]
pub async fn run() -> Result<()> {
    let _args = Args::parse();

    if let Some(file) = create_log_file() {
        let writer = Mutex::new(file);
        let filter = EnvFilter::from_default_env().add_directive(
            "qdev=info".parse().unwrap_or_else(|_| {
                tracing_subscriber::filter::Directive::from(tracing::Level::INFO)
            }),
        );
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init();
    }

    info!("qdev starting");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let mut app = App::new();
    let admin: Arc<dyn AdminClient> = Arc::new(QvmAdminClient::new());

    // Initial enumeration
    app.busy = true;
    spawn_refresh(admin.clone(), event_tx.clone());

    let keyboard_handle = spawn_keyboard_task(event_tx.clone(), cancel_token.clone());

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &mut event_rx,
        &event_tx,
        admin,
        &cancel_token,
    )
    .await;

    cancel_token.cancel();
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("qdev stopped");

    result
}
