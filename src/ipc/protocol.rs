//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::control::SwitcherStatus;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Select the layout-switch combination by its menu index
    SetLayoutCombo { index: usize },

    /// Replace the set of remapped editing shortcut groups
    SetEditFlags { mask: u32 },

    /// Master on/off switch for both monitors
    SetEnabled { enabled: bool },

    /// Store the launch-at-login preference
    SetAutostart { enabled: bool },
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status, also the answer to every accepted change
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    #[serde(flatten)]
    pub switcher: SwitcherStatus,
}

impl DaemonStatus {
    pub fn new(switcher: SwitcherStatus, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            switcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::ModifierCombo;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetLayoutCombo { index: 2 };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"set_layout_combo","index":2}"#);
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"set_edit_flags","mask":3}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req, Request::SetEditFlags { mask: 3 });
    }

    #[test]
    fn test_status_is_flattened() {
        let status = DaemonStatus::new(
            SwitcherStatus {
                enabled: true,
                layout_combo: ModifierCombo::ShiftOption,
                combo_index: 1,
                edit_flag_mask: 2,
                autostart: false,
                layout_monitor_active: true,
                edit_monitor_active: true,
            },
            7,
        );
        let json = serde_json::to_value(Response::Status(status)).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["layout_combo"], "shift_option");
        assert_eq!(json["uptime_secs"], 7);
    }
}
