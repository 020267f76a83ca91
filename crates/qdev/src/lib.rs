//! qdev - manual VM device control TUI
//!
//! A terminal client for connecting and disconnecting devices to running
//! virtual machines. The view is rebuilt on demand (startup, explicit
//! refresh, after every operation) from the same administrative client the
//! daemon uses; there is no event subscription and no daemon dependency.

pub mod app;
pub mod cli;
pub mod client;
pub mod error;
pub mod input;
pub mod ui;
