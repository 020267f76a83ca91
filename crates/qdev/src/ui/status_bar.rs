//! Header and footer widgets for the qdev TUI.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, ViewState};

/// Renders the header bar with title and view state.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (state_text, state_style) = match &app.state {
        ViewState::Ready => ("ready".to_string(), Style::default().fg(Color::Green)),
        ViewState::Loading => ("loading...".to_string(), Style::default().fg(Color::Yellow)),
        ViewState::Failed { message } => (
            format!("failed: {message}"),
            Style::default().fg(Color::Red),
        ),
    };

    let summary = if app.device_count() > 0 {
        let connected = app.devices.iter().filter(|d| d.is_connected()).count();
        format!(
            " | {} device{} | {} connected | {} VM{}",
            app.device_count(),
            if app.device_count() == 1 { "" } else { "s" },
            connected,
            app.running_vms.len(),
            if app.running_vms.len() == 1 { "" } else { "s" },
        )
    } else {
        String::new()
    };

    let header_line = Line::from(vec![
        Span::styled(
            "QDEV",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - VM Device Control | "),
        Span::styled(state_text, state_style),
        Span::styled(summary, Style::default().fg(Color::DarkGray)),
    ]);

    let border_style = match app.state {
        ViewState::Ready => Style::default().fg(Color::Green),
        ViewState::Loading => Style::default().fg(Color::Yellow),
        ViewState::Failed { .. } => Style::default().fg(Color::Red),
    };

    let header = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );

    frame.render_widget(header, area);
}

/// Renders the footer with keybinding hints and the transient status
/// message from the last operation.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let sep_style = Style::default().fg(Color::DarkGray);

    let mut hints = vec![
        Span::styled(" j/k", key_style),
        Span::raw(" move"),
        Span::styled("  |  ", sep_style),
        Span::styled("h/l", key_style),
        Span::raw(" target"),
        Span::styled("  |  ", sep_style),
        Span::styled("Enter", key_style),
        Span::raw(" connect/disconnect"),
        Span::styled("  |  ", sep_style),
        Span::styled("r", key_style),
        Span::raw(" refresh"),
        Span::styled("  |  ", sep_style),
        Span::styled("q", key_style),
        Span::raw(" quit"),
    ];

    if let Some(ref message) = app.status_message {
        hints.push(Span::styled("  |  ", sep_style));
        hints.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let footer = Paragraph::new(Line::from(hints)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    frame.render_widget(footer, area);
}
