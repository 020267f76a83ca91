//! Detail panel for the selected device.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::theme::{class_color, connection_color};

/// Renders the selected device's details and the connect target selector.
pub fn render_device_detail(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Device ")
        .border_style(Style::default().fg(Color::White));

    let Some(entry) = app.selected_device() else {
        let paragraph = Paragraph::new("Select a device")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Description  ", label),
            Span::styled(entry.info.description.replace('_', " "), value),
        ]),
        Line::from(vec![
            Span::styled("Device       ", label),
            Span::styled(entry.info.key.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Class        ", label),
            Span::styled(
                entry.info.class.to_string(),
                Style::default().fg(class_color(entry.info.class)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Backend      ", label),
            Span::styled(entry.info.key.backend_domain().to_string(), value),
        ]),
        Line::default(),
    ];

    if let Some(ref frontend) = entry.attached_to {
        lines.push(Line::from(vec![
            Span::styled("Connected to ", label),
            Span::styled(
                frontend.clone(),
                Style::default()
                    .fg(connection_color(true))
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Enter disconnects the device",
            Style::default().fg(Color::DarkGray),
        )));
    } else if let Some(target) = app.selected_target() {
        lines.push(Line::from(vec![
            Span::styled("Connect to   ", label),
            Span::styled("< ", Style::default().fg(Color::Cyan)),
            Span::styled(
                target.to_string(),
                Style::default()
                    .fg(connection_color(false))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" >", Style::default().fg(Color::Cyan)),
        ]));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "h/l pick a VM, Enter connects",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "No running VM to connect to",
            Style::default().fg(Color::Yellow),
        )));
    }

    if app.busy {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "working...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}
