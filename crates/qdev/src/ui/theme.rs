//! Shared theme utilities for the qdev TUI.
//!
//! Provides consistent styling across all UI components.

use qdev_core::DeviceClass;
use ratatui::style::Color;

/// Returns the accent color for a device's connection state.
///
/// Green invites a connect; red warns that Enter will disconnect.
pub fn connection_color(connected: bool) -> Color {
    if connected {
        Color::Red
    } else {
        Color::Green
    }
}

/// Returns the color for a device class tag.
pub fn class_color(class: DeviceClass) -> Color {
    match class {
        DeviceClass::Block => Color::Yellow,
        DeviceClass::Usb => Color::Cyan,
        DeviceClass::Mic => Color::Magenta,
    }
}

/// Short uppercase tag for the list column.
pub fn class_tag(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Block => "BLK",
        DeviceClass::Usb => "USB",
        DeviceClass::Mic => "MIC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_colors() {
        assert_eq!(connection_color(true), Color::Red);
        assert_eq!(connection_color(false), Color::Green);
    }

    #[test]
    fn test_class_tags_are_three_chars() {
        for class in DeviceClass::ALL {
            assert_eq!(class_tag(class).len(), 3);
        }
    }
}
