//! Discrete key adapter
//!
//! Maps platform volume key codes and key actions onto raw press edges.
//! Keys other than the two volume keys are not consumed.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::events::Button;

use super::RawEvent;

/// Key code reported for the volume-up key
pub const KEYCODE_VOLUME_UP: u32 = 24;
/// Key code reported for the volume-down key
pub const KEYCODE_VOLUME_DOWN: u32 = 25;

/// Key transition reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

/// Stateless translator for discrete key platforms
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyAdapter;

impl KeyAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a key code to a volume button
    pub fn button_for(code: u32) -> Option<Button> {
        match code {
            KEYCODE_VOLUME_UP => Some(Button::Up),
            KEYCODE_VOLUME_DOWN => Some(Button::Down),
            _ => None,
        }
    }

    /// Translate one key event. Returns `None` when the key is not a
    /// volume key, in which case the host should let it through.
    pub fn translate(&self, code: u32, action: KeyAction, at: Instant) -> Option<RawEvent> {
        let button = Self::button_for(code)?;
        Some(match action {
            KeyAction::Down => RawEvent::down(button, at),
            KeyAction::Up => RawEvent::up(button, at),
        })
    }
}
