//! Keyboard input handling for the qdev TUI.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Snapshot};

// ============================================================================
// Event Types
// ============================================================================

/// Events that drive the main loop: user input plus results of the
/// background admin tasks.
#[derive(Debug)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// A fresh enumeration finished.
    Snapshot(Snapshot),

    /// Enumeration failed.
    SnapshotFailed(String),

    /// A connect/disconnect operation finished.
    OperationFinished { message: String, failed: bool },
}

// ============================================================================
// Action Types
// ============================================================================

/// Actions the main loop should take in response to user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,

    /// Rebuild the device view.
    Refresh,

    /// Connect or disconnect the selected device.
    ToggleConnection,
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// # Key Bindings
///
/// | Key          | Action                                   |
/// |--------------|------------------------------------------|
/// | `q`, `Q`     | Quit the application                     |
/// | `Esc`        | Quit the application                     |
/// | `Ctrl+C`     | Quit the application                     |
/// | `j`, `Down`  | Select the next device                   |
/// | `k`, `Up`    | Select the previous device               |
/// | `l`, `Right` | Next connect target for the selection    |
/// | `h`, `Left`  | Previous connect target                  |
/// | `Enter`      | Connect/disconnect the selected device   |
/// | `r`, `R`     | Refresh the device view                  |
///
/// While an operation is in flight (`app.busy`), Enter and `r` are ignored
/// so operations cannot pile up.
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    // Ctrl+C is an unconditional quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }

    match key.code {
        // Quit keys
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.quit();
            Action::Quit
        }

        // Navigation: next device
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            Action::None
        }

        // Navigation: previous device
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            Action::None
        }

        // Connect target selector
        KeyCode::Char('l') | KeyCode::Right => {
            app.cycle_vm_next();
            Action::None
        }
        KeyCode::Char('h') | KeyCode::Left => {
            app.cycle_vm_previous();
            Action::None
        }

        // Connect or disconnect the selected device
        KeyCode::Enter => {
            if app.busy || app.selected_device().is_none() {
                Action::None
            } else {
                Action::ToggleConnection
            }
        }

        // Refresh the view
        KeyCode::Char('r') | KeyCode::Char('R') => {
            if app.busy {
                Action::None
            } else {
                Action::Refresh
            }
        }

        // Unhandled keys
        _ => Action::None,
    }
}

// ============================================================================
// Tests
// ============================================================================
