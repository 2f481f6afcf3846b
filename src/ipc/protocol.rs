//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::GestureEvent;
use crate::source::{ChangeReason, InputMode, KeyAction};

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from the host to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to gesture notifications
    Subscribe,

    /// A discrete key event from the platform
    Key { code: u32, action: KeyAction },

    /// An output-level change notification from the platform
    VolumeChanged { level: f32, reason: ChangeReason },

    /// The host view attached
    Attach,

    /// The host view was torn down
    Detach,

    /// Read the current output level
    GetVolume,
}

/// Responses from daemon to host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Input event accepted; `consumed` is false when the event was not a
    /// volume-button press and the host should handle it itself
    Accepted { consumed: bool },

    /// Current output level
    Volume { level: f32 },

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

/// Push notification from daemon to host (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A gesture was recognized
    Gesture(GestureEvent),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Input semantics the recognizer runs with
    pub mode: InputMode,

    /// Whether a host view is attached
    pub attached: bool,

    /// Current output level
    pub volume: f32,

    /// Gestures emitted since startup
    pub gestures_emitted: u64,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: InputMode::default(),
            attached: false,
            volume: 0.0,
            gestures_emitted: 0,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Button, Gesture, GestureKind};

    #[test]
    fn test_request_serialization() {
        let req = Request::Key {
            code: 25,
            action: KeyAction::Down,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"key""#));
        assert!(json.contains(r#""action":"down""#));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"volume_changed","level":0.4,"reason":"explicit"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req,
            Request::VolumeChanged {
                reason: ChangeReason::Explicit,
                ..
            }
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains(r#""mode":"discrete""#));
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Notification::Gesture(GestureEvent {
            gesture: Gesture::new(Button::Up, GestureKind::Double),
            emitted_at_ms: 7,
        });
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains(r#""type":"gesture""#));
        assert!(json.contains(r#""gesture":"volumeUpDouble""#));
    }
}
