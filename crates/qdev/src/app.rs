//! Application state for the qdev TUI.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use qdev_core::DeviceInfo;

// ============================================================================
// Device Entry
// ============================================================================

/// One device row: enumerated attributes plus the derived connection state
/// and the cursor into the VM selector (only meaningful while disconnected).
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub info: DeviceInfo,
    /// Frontend VM currently using the device, if any. The backend domain
    /// itself never counts as a connection.
    pub attached_to: Option<String>,
    /// Index into `App::running_vms` for the connect target selector.
    pub vm_cursor: usize,
}

impl DeviceEntry {
    pub fn from_info(info: DeviceInfo) -> Self {
        let backend = info.key.backend_domain().to_string();
        let attached_to = info.used_by.iter().find(|d| **d != backend).cloned();
        Self {
            info,
            attached_to,
            vm_cursor: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.attached_to.is_some()
    }
}

/// A freshly built view: all devices plus the candidate frontend VMs.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub devices: Vec<DeviceEntry>,
    pub running_vms: Vec<String>,
}

// ============================================================================
// View State
// ============================================================================

/// Lifecycle of the device view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// First enumeration still in flight.
    Loading,
    /// View built successfully.
    Ready,
    /// The last enumeration failed.
    Failed { message: String },
}

// ============================================================================
// Application
// ============================================================================

/// Core application state for the qdev TUI.
#[derive(Debug, Clone)]
pub struct App {
    /// Current view lifecycle state.
    pub state: ViewState,

    /// All enumerated devices in listing order.
    pub devices: Vec<DeviceEntry>,

    /// Running, non-admin VMs offered as connect targets.
    pub running_vms: Vec<String>,

    /// Index of the currently selected device.
    pub selected_index: usize,

    /// Flag indicating the application should quit.
    pub should_quit: bool,

    /// Transient feedback from the last operation.
    pub status_message: Option<String>,

    /// An enumeration or attach/detach operation is in flight; input that
    /// would start another is ignored until it finishes.
    pub busy: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
            devices: Vec::new(),
            running_vms: Vec::new(),
            selected_index: 0,
            should_quit: false,
            status_message: None,
            busy: false,
        }
    }

    /// Replaces the view with a fresh enumeration.
    ///
    /// VM selector cursors reset; the device selection is clamped so it
    /// stays valid when devices disappeared.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.devices = snapshot.devices;
        self.running_vms = snapshot.running_vms;
        self.state = ViewState::Ready;
        self.busy = false;
        self.clamp_selection();
    }

    /// Records a failed enumeration; the previous device list stays on
    /// screen so the operator keeps context.
    pub fn mark_failed(&mut self, message: String) {
        self.state = ViewState::Failed { message };
        self.busy = false;
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// The currently selected device, if any.
    pub fn selected_device(&self) -> Option<&DeviceEntry> {
        self.devices.get(self.selected_index)
    }

    /// The connect target the selector currently points at for the selected
    /// device. `None` when the device is connected or no VM is running.
    pub fn selected_target(&self) -> Option<&str> {
        let entry = self.selected_device()?;
        if entry.is_connected() {
            return None;
        }
        self.running_vms
            .get(entry.vm_cursor)
            .map(String::as_str)
    }

    fn clamp_selection(&mut self) {
        let count = self.devices.len();
        if count == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    /// Selects the next device (downward), wrapping around.
    pub fn select_next(&mut self) {
        let count = self.devices.len();
        if count == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = self.selected_index.saturating_add(1) % count;
    }

    /// Selects the previous device (upward), wrapping around.
    pub fn select_previous(&mut self) {
        let count = self.devices.len();
        if count == 0 {
            self.selected_index = 0;
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = count.saturating_sub(1);
        } else {
            self.selected_index -= 1;
        }
    }

    /// Advances the VM selector for the selected device. No-op while the
    /// device is connected - the selector is frozen on the frontend then.
    pub fn cycle_vm_next(&mut self) {
        let vm_count = self.running_vms.len();
        if vm_count == 0 {
            return;
        }
        if let Some(entry) = self.devices.get_mut(self.selected_index) {
            if entry.is_connected() {
                return;
            }
            entry.vm_cursor = entry.vm_cursor.saturating_add(1) % vm_count;
        }
    }

    /// Moves the VM selector backwards for the selected device.
    pub fn cycle_vm_previous(&mut self) {
        let vm_count = self.running_vms.len();
        if vm_count == 0 {
            return;
        }
        if let Some(entry) = self.devices.get_mut(self.selected_index) {
            if entry.is_connected() {
                return;
            }
            entry.vm_cursor = if entry.vm_cursor == 0 {
                vm_count.saturating_sub(1)
            } else {
                entry.vm_cursor - 1
            };
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qdev_core::{DeviceClass, DeviceKey};

    fn entry(ident: &str, used_by: Vec<String>) -> DeviceEntry {
        DeviceEntry::from_info(
            DeviceInfo::new(
                DeviceKey::new("sys-usb", ident),
                "USB device",
                DeviceClass::Usb,
            )
            .with_used_by(used_by),
        )
    }

    fn ready_app(devices: Vec<DeviceEntry>, vms: Vec<&str>) -> App {
        let mut app = App::new();
        app.apply_snapshot(Snapshot {
            devices,
            running_vms: vms.into_iter().map(String::from).collect(),
        });
        app
    }

    #[test]
    fn test_backend_does_not_count_as_connection() {
        let entry = entry("2-1", vec!["sys-usb".to_string()]);
        assert!(!entry.is_connected());
    }

    #[test]
    fn test_frontend_counts_as_connection() {
        let entry = entry("2-1", vec!["work".to_string()]);
        assert_eq!(entry.attached_to.as_deref(), Some("work"));
    }

    #[test]
    fn test_apply_snapshot_sets_ready() {
        let app = ready_app(vec![entry("2-1", vec![])], vec!["work"]);
        assert_eq!(app.state, ViewState::Ready);
        assert_eq!(app.device_count(), 1);
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = ready_app(vec![entry("2-1", vec![]), entry("2-2", vec![])], vec![]);
        app.select_next();
        assert_eq!(app.selected_index, 1);
        app.select_next();
        assert_eq!(app.selected_index, 0);
        app.select_previous();
        assert_eq!(app.selected_index, 1);
    }

    #[test]
    fn test_selection_clamped_when_devices_vanish() {
        let mut app = ready_app(
            vec![entry("2-1", vec![]), entry("2-2", vec![]), entry("2-3", vec![])],
            vec![],
        );
        app.selected_index = 2;
        app.apply_snapshot(Snapshot {
            devices: vec![entry("2-1", vec![])],
            running_vms: Vec::new(),
        });
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_vm_cycling_wraps() {
        let mut app = ready_app(vec![entry("2-1", vec![])], vec!["work", "personal"]);
        assert_eq!(app.selected_target(), Some("work"));
        app.cycle_vm_next();
        assert_eq!(app.selected_target(), Some("personal"));
        app.cycle_vm_next();
        assert_eq!(app.selected_target(), Some("work"));
        app.cycle_vm_previous();
        assert_eq!(app.selected_target(), Some("personal"));
    }

    #[test]
    fn test_vm_cycling_frozen_while_connected() {
        let mut app = ready_app(
            vec![entry("2-1", vec!["work".to_string()])],
            vec!["work", "personal"],
        );
        app.cycle_vm_next();
        assert_eq!(
            app.devices.first().map(|e| e.vm_cursor),
            Some(0),
            "cursor must not move for a connected device"
        );
        assert_eq!(app.selected_target(), None);
    }

    #[test]
    fn test_no_target_without_running_vms() {
        let app = ready_app(vec![entry("2-1", vec![])], vec![]);
        assert_eq!(app.selected_target(), None);
    }

    #[test]
    fn test_mark_failed_keeps_devices() {
        let mut app = ready_app(vec![entry("2-1", vec![])], vec!["work"]);
        app.mark_failed("admin call failed".to_string());
        assert!(matches!(app.state, ViewState::Failed { .. }));
        assert_eq!(app.device_count(), 1);
    }
}
