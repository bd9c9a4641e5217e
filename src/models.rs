use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Status value that counts a device as online. Anything else is offline/unknown.
pub const STATUS_ONLINE: &str = "online";

/// Event value for a hardware attach.
pub const EVENT_CONNECTED: &str = "connected";

/// A tracked endpoint as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip_address: String,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.status == STATUS_ONLINE
    }
}

/// One hardware event reported for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub log_type: String,
    #[serde(default)]
    pub hardware_type: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub timestamp: String,
}

impl LogEntry {
    /// Timestamp converted to the local timezone. Accepts RFC 3339, or an
    /// ISO date-time without offset which is taken as UTC.
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        if let Ok(t) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(t.with_timezone(&Local));
        }

        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|t| t.and_utc().with_timezone(&Local))
    }

    /// Display form of the timestamp; falls back to the raw value.
    pub fn display_time(&self) -> String {
        match self.local_time() {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.timestamp.clone(),
        }
    }

    pub fn is_connect(&self) -> bool {
        self.event == EVENT_CONNECTED
    }

    /// Warning or critical severities count as alerts
    pub fn is_alert(&self) -> bool {
        let sev = self.severity.trim();
        ["warning", "warn", "error", "critical", "high"]
            .iter()
            .any(|level| sev.eq_ignore_ascii_case(level))
    }
}

/// Body of `GET /api/devices/list`
#[derive(Debug, Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Option<Vec<Device>>,
}

/// Body of `GET /api/devices/logs`
#[derive(Debug, Default, Deserialize)]
pub struct LogList {
    #[serde(default)]
    pub logs: Option<Vec<LogEntry>>,
}
