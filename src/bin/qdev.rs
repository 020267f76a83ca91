//! qdev binary - manual VM device control TUI.

use anyhow::Result;

fn main() -> Result<()> {
    qdev_tui::cli::run()
}
