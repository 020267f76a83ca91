//! Error types for the qdev TUI.

use std::io;

use thiserror::Error;

use qdev_admin::AdminError;

/// TUI application errors.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal (raw mode, alternate screen).
    /// Common causes: not a TTY, unsupported terminal emulator.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to restore the terminal on exit; running `reset` can help
    /// recover the session.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// An administrative operation failed.
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience Result type alias for TUI operations.
pub type Result<T> = std::result::Result<T, TuiError>;
