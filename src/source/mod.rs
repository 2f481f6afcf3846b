//! Event source adapters
//!
//! Translate platform input (discrete key codes or analog volume-level
//! notifications) into the canonical `RawEvent` consumed by the recognizer.

mod analog;
mod keys;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::events::Button;

pub use analog::{AnalogAdapter, ChangeReason, TriggerRule, VolumeNotification};
pub use keys::{KeyAction, KeyAdapter, KEYCODE_VOLUME_DOWN, KEYCODE_VOLUME_UP};

/// Which edge of a press a raw event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Down,
    Up,
}

/// Canonical raw input delivered to the recognizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub kind: PressKind,
    pub button: Button,
    pub at: Instant,
    /// Volume level before this input was applied, when the adapter knows it
    pub baseline: Option<f32>,
}

impl RawEvent {
    pub fn down(button: Button, at: Instant) -> Self {
        Self {
            kind: PressKind::Down,
            button,
            at,
            baseline: None,
        }
    }

    pub fn up(button: Button, at: Instant) -> Self {
        Self {
            kind: PressKind::Up,
            button,
            at,
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, level: f32) -> Self {
        self.baseline = Some(level);
        self
    }
}

/// How the host platform reports volume-button activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Discrete key-down / key-up events
    #[default]
    Discrete,
    /// Volume-level change notifications only, no key-up edge
    Analog,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Discrete => write!(f, "discrete"),
            InputMode::Analog => write!(f, "analog"),
        }
    }
}

impl std::str::FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discrete" => Ok(InputMode::Discrete),
            "analog" => Ok(InputMode::Analog),
            other => Err(format!("unknown input mode: {other}")),
        }
    }
}
