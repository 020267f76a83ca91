//! Device list widget for the qdev TUI.
//!
//! Displays every enumerated device with its class, description, and
//! connection state.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, DeviceEntry, ViewState};
use crate::ui::theme::{class_color, class_tag, connection_color};

/// Renders the device list in the left panel.
///
/// Each row shows: selection marker, class tag, description, and either the
/// frontend VM the device is connected to or nothing.
pub fn render_device_list(frame: &mut Frame, area: Rect, app: &App) {
    if app.devices.is_empty() {
        render_empty_state(frame, area, &app.state);
        return;
    }

    let items: Vec<ListItem> = app
        .devices
        .iter()
        .enumerate()
        .map(|(idx, entry)| create_device_item(entry, idx == app.selected_index))
        .collect();

    let title = format!(" Devices ({}) ", app.device_count());

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::White)),
    );

    frame.render_widget(list, area);
}

/// Creates a list item for a single device.
fn create_device_item(entry: &DeviceEntry, is_selected: bool) -> ListItem<'static> {
    let accent = connection_color(entry.is_connected());

    let mut spans = vec![
        Span::styled(
            if is_selected { ">" } else { " " },
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", class_tag(entry.info.class)),
            Style::default().fg(class_color(entry.info.class)),
        ),
        Span::styled(
            truncate_string(&display_description(entry), 28),
            Style::default().fg(Color::White),
        ),
    ];

    if let Some(ref frontend) = entry.attached_to {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("-> {frontend}"),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ));
    }

    let style = if is_selected {
        Style::default().bg(Color::Rgb(30, 30, 40))
    } else {
        Style::default()
    };

    ListItem::new(Line::from(spans)).style(style)
}

/// A device's display name: the description, or the key when the platform
/// gave none.
fn display_description(entry: &DeviceEntry) -> String {
    if entry.info.description.is_empty() {
        entry.info.key.to_string()
    } else {
        entry.info.description.replace('_', " ")
    }
}

/// Renders the empty state with a context-sensitive message.
fn render_empty_state(frame: &mut Frame, area: Rect, state: &ViewState) {
    let message = match state {
        ViewState::Loading => "Enumerating devices...",
        ViewState::Ready => "No devices found. Press 'r' to refresh.",
        ViewState::Failed { .. } => "Device enumeration failed. Press 'r' to retry.",
    };

    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Devices ")
                .border_style(Style::default().fg(Color::White)),
        );

    frame.render_widget(paragraph, area);
}

/// Truncates a string to the specified maximum display width.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}~")
    }
}
