//! Per-button press tracking

use std::time::Instant;

use super::timer::{TimerHandle, TimerId, TimerPurpose};

/// An armed timer owned by a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    pub id: TimerId,
}

/// Press state of one physical button
#[derive(Debug, Clone, Default)]
pub struct ButtonState {
    /// Presses accumulated in the current debounce window
    pub press_count: u32,
    /// Time of the most recent press-down edge. Analog mode compares it
    /// against the next delta to detect auto-repeat.
    pub last_press: Option<Instant>,
    /// The hold threshold fired for the current sequence
    pub is_held: bool,
    /// A discrete key is physically down
    pub is_down: bool,
    hold_timer: Option<PendingTimer>,
    classify_timer: Option<PendingTimer>,
}

impl ButtonState {
    /// True when no sequence is open and no timer is pending
    pub fn is_idle(&self) -> bool {
        self.press_count == 0
            && !self.is_held
            && !self.is_down
            && self.hold_timer.is_none()
            && self.classify_timer.is_none()
    }

    pub fn timer(&self, purpose: TimerPurpose) -> Option<&PendingTimer> {
        match purpose {
            TimerPurpose::Hold => self.hold_timer.as_ref(),
            TimerPurpose::Classify => self.classify_timer.as_ref(),
        }
    }

    pub(super) fn timer_slot(&mut self, purpose: TimerPurpose) -> &mut Option<PendingTimer> {
        match purpose {
            TimerPurpose::Hold => &mut self.hold_timer,
            TimerPurpose::Classify => &mut self.classify_timer,
        }
    }

    /// Take the pending timer for `purpose` if it is the one identified by `id`
    pub(super) fn take_if_current(&mut self, id: TimerId) -> Option<PendingTimer> {
        let slot = self.timer_slot(id.purpose);
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            slot.take()
        } else {
            None
        }
    }
}
