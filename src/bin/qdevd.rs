//! qdevd binary - automatic VM device assignment daemon.

use anyhow::Result;

fn main() -> Result<()> {
    qdevd::cli::run()
}
