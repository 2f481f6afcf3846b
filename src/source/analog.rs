//! Analog volume-level adapter
//!
//! Platforms without discrete key events only report the new output level
//! after the OS has applied a change. A press is inferred from the sign of
//! the change relative to the previously observed level.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::events::Button;

use super::RawEvent;

/// Why the platform changed the output level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// The user pressed a hardware volume button
    Explicit,
    /// Route change, programmatic set, or anything else
    Other,
}

/// A volume-level notification from the platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeNotification {
    pub level: f32,
    pub reason: ChangeReason,
}

/// Which rule turned a notification into a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    /// Level rose above the previous level
    Increase,
    /// Level fell below the previous level
    Decrease,
    /// Level did not move but sits at or below zero, so a down press
    /// could not lower it further
    Floor,
}

impl TriggerRule {
    pub fn button(self) -> Button {
        match self {
            TriggerRule::Increase => Button::Up,
            TriggerRule::Decrease | TriggerRule::Floor => Button::Down,
        }
    }
}

/// Stateful translator for analog platforms
#[derive(Debug, Clone)]
pub struct AnalogAdapter {
    previous: f32,
}

impl AnalogAdapter {
    /// Create an adapter primed with the level observed at attach time
    pub fn new(initial_level: f32) -> Self {
        Self {
            previous: initial_level,
        }
    }

    /// The level the next notification is compared against
    pub fn previous(&self) -> f32 {
        self.previous
    }

    /// Reset the comparison level without producing a press
    pub fn rebase(&mut self, level: f32) {
        trace!(level, "analog adapter rebased");
        self.previous = level;
    }

    /// Classify a notification without updating state
    pub fn trigger_rule(&self, level: f32) -> Option<TriggerRule> {
        if level > self.previous {
            Some(TriggerRule::Increase)
        } else if level < self.previous {
            Some(TriggerRule::Decrease)
        } else if level <= 0.0 {
            Some(TriggerRule::Floor)
        } else {
            None
        }
    }

    /// Translate one notification into a press-down, if it is one
    pub fn translate(&mut self, notification: VolumeNotification, at: Instant) -> Option<RawEvent> {
        if notification.reason != ChangeReason::Explicit {
            self.rebase(notification.level);
            return None;
        }

        let baseline = self.previous;
        let rule = self.trigger_rule(notification.level);
        self.previous = notification.level;

        let rule = rule?;
        debug!(?rule, baseline, level = notification.level, "volume delta");
        Some(RawEvent::down(rule.button(), at).with_baseline(baseline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PressKind;

    fn explicit(level: f32) -> VolumeNotification {
        VolumeNotification {
            level,
            reason: ChangeReason::Explicit,
        }
    }

    #[test]
    fn test_increase_is_up_press() {
        let mut adapter = AnalogAdapter::new(0.5);
        let event = adapter.translate(explicit(0.5625), Instant::now()).unwrap();
        assert_eq!(event.button, Button::Up);
        assert_eq!(event.kind, PressKind::Down);
        assert_eq!(event.baseline, Some(0.5));
        assert_eq!(adapter.previous(), 0.5625);
    }

    #[test]
    fn test_decrease_is_down_press() {
        let mut adapter = AnalogAdapter::new(0.5);
        let event = adapter.translate(explicit(0.4375), Instant::now()).unwrap();
        assert_eq!(event.button, Button::Down);
    }

    #[test]
    fn test_floor_is_separate_down_rule() {
        let adapter = AnalogAdapter::new(0.0);
        assert_eq!(adapter.trigger_rule(0.0), Some(TriggerRule::Floor));
        assert_eq!(adapter.trigger_rule(0.0).map(TriggerRule::button), Some(Button::Down));

        let mut adapter = AnalogAdapter::new(0.0);
        let event = adapter.translate(explicit(0.0), Instant::now()).unwrap();
        assert_eq!(event.button, Button::Down);
    }

    #[test]
    fn test_unchanged_level_above_floor_is_ignored() {
        // At maximum an up press cannot move the level, and there is no
        // matching ceiling rule
        let mut adapter = AnalogAdapter::new(1.0);
        assert!(adapter.translate(explicit(1.0), Instant::now()).is_none());
    }

    #[test]
    fn test_non_explicit_change_only_rebases() {
        let mut adapter = AnalogAdapter::new(0.5);
        let restore = VolumeNotification {
            level: 0.3,
            reason: ChangeReason::Other,
        };
        assert!(adapter.translate(restore, Instant::now()).is_none());
        assert_eq!(adapter.previous(), 0.3);

        let event = adapter.translate(explicit(0.35), Instant::now()).unwrap();
        assert_eq!(event.button, Button::Up);
        assert_eq!(event.baseline, Some(0.3));
    }

    #[test]
    fn test_notification_deserialization() {
        let json = r#"{"level":0.25,"reason":"explicit"}"#;
        let notification: VolumeNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.reason, ChangeReason::Explicit);
        assert_eq!(notification.level, 0.25);
    }
}
