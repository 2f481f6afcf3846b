//! Gesture events emitted by the recognizer
//!
//! Provides the button and gesture vocabulary shared by the recognizer,
//! the source adapters and the IPC layer.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A physical volume button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Volume up
    Up,
    /// Volume down
    Down,
}

impl Button {
    /// Both buttons, in state-table order
    pub const ALL: [Button; 2] = [Button::Up, Button::Down];

    /// Index into per-button tables
    pub fn index(self) -> usize {
        match self {
            Button::Up => 0,
            Button::Down => 1,
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Button::Up => write!(f, "up"),
            Button::Down => write!(f, "down"),
        }
    }
}

/// The classified shape of a press sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Single,
    Double,
    /// Three or more presses in one window
    Triple,
    /// Button held past the hold threshold
    Hold,
}

impl GestureKind {
    /// Classify an accumulated press count. Counts above three collapse
    /// to `Triple`; zero presses classify as nothing.
    pub fn from_press_count(count: u32) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(GestureKind::Single),
            2 => Some(GestureKind::Double),
            _ => Some(GestureKind::Triple),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            GestureKind::Single => "Single",
            GestureKind::Double => "Double",
            GestureKind::Triple => "Triple",
            GestureKind::Hold => "Hold",
        }
    }
}

/// A gesture on a specific button, e.g. `volumeDownTriple`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Gesture {
    pub button: Button,
    pub kind: GestureKind,
}

impl Gesture {
    pub fn new(button: Button, kind: GestureKind) -> Self {
        Self { button, kind }
    }

    /// Wire name delivered to listeners
    pub fn name(&self) -> &'static str {
        match (self.button, self.kind) {
            (Button::Up, GestureKind::Single) => "volumeUpSingle",
            (Button::Up, GestureKind::Double) => "volumeUpDouble",
            (Button::Up, GestureKind::Triple) => "volumeUpTriple",
            (Button::Up, GestureKind::Hold) => "volumeUpHold",
            (Button::Down, GestureKind::Single) => "volumeDownSingle",
            (Button::Down, GestureKind::Double) => "volumeDownDouble",
            (Button::Down, GestureKind::Triple) => "volumeDownTriple",
            (Button::Down, GestureKind::Hold) => "volumeDownHold",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown gesture name
#[derive(Debug, thiserror::Error)]
#[error("unknown gesture name: {0}")]
pub struct UnknownGesture(String);

impl FromStr for Gesture {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (button, rest) = if let Some(rest) = s.strip_prefix("volumeUp") {
            (Button::Up, rest)
        } else if let Some(rest) = s.strip_prefix("volumeDown") {
            (Button::Down, rest)
        } else {
            return Err(UnknownGesture(s.to_string()));
        };

        let kind = [
            GestureKind::Single,
            GestureKind::Double,
            GestureKind::Triple,
            GestureKind::Hold,
        ]
        .into_iter()
        .find(|kind| kind.suffix() == rest)
        .ok_or_else(|| UnknownGesture(s.to_string()))?;

        Ok(Gesture::new(button, kind))
    }
}

impl From<Gesture> for String {
    fn from(gesture: Gesture) -> Self {
        gesture.name().to_string()
    }
}

impl TryFrom<String> for Gesture {
    type Error = UnknownGesture;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payload delivered to the event sink, one per classified gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    /// The classified gesture
    pub gesture: Gesture,

    /// Wall-clock emission time in milliseconds since the Unix epoch
    pub emitted_at_ms: u64,
}

impl GestureEvent {
    /// Stamp a gesture with the current wall-clock time
    pub fn now(gesture: Gesture) -> Self {
        let emitted_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            gesture,
            emitted_at_ms,
        }
    }
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @{}ms", self.gesture, self.emitted_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_count_classification() {
        assert_eq!(GestureKind::from_press_count(0), None);
        assert_eq!(GestureKind::from_press_count(1), Some(GestureKind::Single));
        assert_eq!(GestureKind::from_press_count(2), Some(GestureKind::Double));
        for count in 3..=5 {
            assert_eq!(GestureKind::from_press_count(count), Some(GestureKind::Triple));
        }
    }

    #[test]
    fn test_gesture_names() {
        assert_eq!(
            Gesture::new(Button::Down, GestureKind::Triple).to_string(),
            "volumeDownTriple"
        );
        assert_eq!(Gesture::new(Button::Up, GestureKind::Hold).name(), "volumeUpHold");
    }

    #[test]
    fn test_gesture_parse() {
        let gesture: Gesture = "volumeUpDouble".parse().unwrap();
        assert_eq!(gesture, Gesture::new(Button::Up, GestureKind::Double));
        assert!("volumeSidewaysSingle".parse::<Gesture>().is_err());
        assert!("volumeUpQuadruple".parse::<Gesture>().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = GestureEvent {
            gesture: Gesture::new(Button::Down, GestureKind::Single),
            emitted_at_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""gesture":"volumeDownSingle""#));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"gesture":"volumeUpHold","emitted_at_ms":42}"#;
        let event: GestureEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.gesture, Gesture::new(Button::Up, GestureKind::Hold));
        assert_eq!(event.emitted_at_ms, 42);
    }
}
