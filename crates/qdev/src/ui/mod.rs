//! UI rendering module for the qdev TUI.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: Title and View State                    |  <- 3 lines
//! +----------------------+---------------------------+
//! | Device List          |  Detail Panel             |  <- fills remaining
//! | (45%)                |  (55%)                    |
//! | > USB Kingston  ->work | Description  Kingston   |
//! |   BLK sys-usb:sda    |  Connect to   < work >    |
//! +----------------------+---------------------------+
//! |  Footer: Keybindings and Status Message          |  <- 3 lines
//! +--------------------------------------------------+
//! ```

pub mod detail_panel;
pub mod device_list;
pub mod layout;
pub mod status_bar;
pub mod theme;

use ratatui::Frame;

use crate::app::App;
use layout::AppLayout;

pub use detail_panel::render_device_detail;
pub use device_list::render_device_list;
pub use status_bar::{render_footer, render_header};

/// Renders the complete TUI interface.
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_footer(frame, layout.footer, app);

    render_device_list(frame, layout.list_area, app);
    render_device_detail(frame, layout.detail_area, app);
}
