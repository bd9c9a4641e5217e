//! Display values computed from the current view state. Nothing here is cached;
//! callers recompute after every change.

use crate::models::{Device, LogEntry};
use crate::store::ViewState;

/// Aggregate counts shown above the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total_devices: usize,
    pub online_devices: usize,
    pub total_events: usize,
    pub alert_count: usize,
}

pub fn online_devices(devices: &[Device]) -> usize {
    devices.iter().filter(|d| d.is_online()).count()
}

pub fn alert_count(logs: &[LogEntry]) -> usize {
    logs.iter().filter(|l| l.is_alert()).count()
}

pub fn stats(devices: &[Device], logs: &[LogEntry]) -> Stats {
    Stats {
        total_devices: devices.len(),
        online_devices: online_devices(devices),
        total_events: logs.len(),
        alert_count: alert_count(logs),
    }
}

/// Entries for one device, in the order the service returned them.
pub fn device_logs<'a>(logs: &'a [LogEntry], device_id: &str) -> Vec<&'a LogEntry> {
    logs.iter().filter(|l| l.device_id == device_id).collect()
}

impl ViewState {
    pub fn stats(&self) -> Stats {
        stats(&self.devices, &self.logs)
    }

    pub fn device_logs(&self, device_id: &str) -> Vec<&LogEntry> {
        device_logs(&self.logs, device_id)
    }

    /// Entries for the selected device, empty when nothing is selected
    pub fn selected_logs(&self) -> Vec<&LogEntry> {
        match &self.selected_device {
            Some(device) => self.device_logs(&device.device_id),
            None => Vec::new(),
        }
    }

    pub fn is_selected(&self, device_id: &str) -> bool {
        self.selected_device
            .as_ref()
            .is_some_and(|d| d.device_id == device_id)
    }
}
