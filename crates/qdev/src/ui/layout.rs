//! Layout helpers for the qdev TUI.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout areas.
///
/// The TUI is divided into three vertical sections:
/// - Header (3 lines): title and view state
/// - Content (fills remaining): split into device list (45%) and detail (55%)
/// - Footer (3 lines): keybinding help and status messages
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    /// Header area for title and state
    pub header: Rect,
    /// Left panel for the device list
    pub list_area: Rect,
    /// Right panel for device details
    pub detail_area: Rect,
    /// Footer area for keybindings and status
    pub footer: Rect,
}

impl AppLayout {
    /// Creates a new AppLayout by splitting the given area.
    pub fn new(area: Rect) -> Self {
        let [header, content, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(8),    // Content
                Constraint::Length(3), // Footer
            ])
            .areas(area);

        let [list_area, detail_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(45), // Device list
                Constraint::Percentage(55), // Detail panel
            ])
            .areas(content);

        Self {
            header,
            list_area,
            detail_area,
            footer,
        }
    }
}
