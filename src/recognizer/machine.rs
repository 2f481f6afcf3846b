//! Core gesture recognizer
//!
//! Classifies raw volume-button edges into single/double/triple/hold
//! gestures per button and restores the output level so presses never
//! change it.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::events::{Button, Gesture, GestureEvent, GestureKind};
use crate::source::{InputMode, PressKind, RawEvent};

use super::button::{ButtonState, PendingTimer};
use super::sink::GestureSink;
use super::timer::{TimerId, TimerPurpose, TimerScheduler};
use super::volume::VolumeController;

/// Recognizer timing and input semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizerConfig {
    /// Quiet period after which accumulated presses are classified
    pub double_click_threshold: Duration,
    /// Press duration that confirms a hold
    pub hold_threshold: Duration,
    /// Largest gap between analog deltas that still counts as key
    /// auto-repeat. A longer gap starts a new hold measurement.
    pub repeat_gap: Duration,
    /// Discrete key edges or analog level deltas
    pub mode: InputMode,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            double_click_threshold: Duration::from_millis(300),
            hold_threshold: Duration::from_millis(800),
            repeat_gap: Duration::from_millis(120),
            mode: InputMode::Discrete,
        }
    }
}

/// Level captured when a press sequence opens
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeSnapshot {
    pub original_level: Option<f32>,
}

/// Per-button gesture state machine.
///
/// Inputs arrive one at a time from a single owner: raw events through
/// [`handle_raw`](Self::handle_raw) and fired timers through
/// [`handle_timer`](Self::handle_timer). While detached every input is
/// dropped.
pub struct GestureRecognizer<V, S> {
    config: RecognizerConfig,
    volume: V,
    scheduler: S,
    sink: Option<Box<dyn GestureSink>>,
    buttons: [ButtonState; 2],
    snapshot: VolumeSnapshot,
    next_generation: u64,
    emitted: u64,
}

impl<V: VolumeController, S: TimerScheduler> GestureRecognizer<V, S> {
    /// Create a detached recognizer
    pub fn new(config: RecognizerConfig, volume: V, scheduler: S) -> Self {
        Self {
            config,
            volume,
            scheduler,
            sink: None,
            buttons: Default::default(),
            snapshot: VolumeSnapshot::default(),
            next_generation: 0,
            emitted: 0,
        }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// State of one button
    pub fn button(&self, button: Button) -> &ButtonState {
        &self.buttons[button.index()]
    }

    pub fn snapshot(&self) -> VolumeSnapshot {
        self.snapshot
    }

    /// Total gestures emitted since creation
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Start delivering gestures to `sink`. Re-attaching starts over from
    /// reset button state.
    pub fn attach(&mut self, sink: Box<dyn GestureSink>) {
        if self.is_attached() {
            debug!("recognizer re-attached, resetting state");
        }
        self.reset_all();
        self.sink = Some(sink);

        match self.volume.level() {
            Ok(level) => self.snapshot.original_level = Some(level),
            Err(e) => warn!(%e, "volume unavailable at attach"),
        }

        info!(mode = %self.config.mode, "gesture recognizer attached");
    }

    /// Stop delivering gestures and cancel every pending timer
    pub fn detach(&mut self) {
        if self.sink.take().is_none() {
            return;
        }
        self.reset_all();
        info!("gesture recognizer detached");
    }

    /// Process one raw press edge
    pub fn handle_raw(&mut self, event: RawEvent) {
        if !self.is_attached() {
            debug!(button = %event.button, kind = ?event.kind, "recognizer detached, dropping raw event");
            return;
        }

        match event.kind {
            PressKind::Down => self.press_down(event),
            PressKind::Up => self.press_up(event.button),
        }
    }

    /// Process a fired timer. Fires for timers that were cancelled or
    /// superseded are ignored.
    pub fn handle_timer(&mut self, id: TimerId) {
        let Some(pending) = self.buttons[id.button.index()].take_if_current(id) else {
            trace!(?id, "stale timer ignored");
            return;
        };
        self.scheduler.cancel(pending.handle);

        if !self.is_attached() {
            return;
        }

        match id.purpose {
            TimerPurpose::Hold => self.confirm_hold(id.button),
            TimerPurpose::Classify => self.classify(id.button),
        }
    }

    fn press_down(&mut self, event: RawEvent) {
        let button = event.button;
        let mode = self.config.mode;
        let state = &self.buttons[button.index()];

        if state.is_held {
            trace!(%button, "press ignored while held");
            if mode == InputMode::Analog {
                // Continuing deltas keep the held sequence open until the
                // stream goes quiet
                self.arm_timer(button, TimerPurpose::Classify, self.config.double_click_threshold);
            }
            self.restore_volume();
            return;
        }

        if mode == InputMode::Discrete && state.is_down {
            trace!(%button, "key repeat ignored");
            return;
        }

        let opens_sequence = state.press_count == 0;
        let previous_press = state.last_press;
        if opens_sequence {
            self.open_sequence(button, event.baseline);
        }

        let state = &mut self.buttons[button.index()];
        state.press_count += 1;
        state.last_press = Some(event.at);
        state.is_down = mode == InputMode::Discrete;
        debug!(%button, count = state.press_count, "press down");

        self.restore_volume();

        match mode {
            InputMode::Discrete => {
                self.cancel_timer(button, TimerPurpose::Classify);
                self.arm_timer(button, TimerPurpose::Hold, self.config.hold_threshold);
            }
            InputMode::Analog => {
                // Hold is measured over an unbroken run of auto-repeat deltas
                let repeating = previous_press.is_some_and(|previous| {
                    event.at.saturating_duration_since(previous) <= self.config.repeat_gap
                });
                if (opens_sequence || !repeating)
                    && !self.arm_timer(button, TimerPurpose::Hold, self.config.hold_threshold)
                {
                    return;
                }
                self.arm_timer(button, TimerPurpose::Classify, self.config.double_click_threshold);
            }
        }
    }

    fn press_up(&mut self, button: Button) {
        if self.config.mode == InputMode::Analog {
            trace!(%button, "press up ignored in analog mode");
            return;
        }

        let state = &mut self.buttons[button.index()];
        let was_down = std::mem::replace(&mut state.is_down, false);

        if state.is_held {
            state.is_held = false;
            self.cancel_timer(button, TimerPurpose::Hold);
            debug!(%button, "hold released");
            return;
        }

        if !was_down {
            trace!(%button, "press up without matching press down");
            return;
        }

        self.cancel_timer(button, TimerPurpose::Hold);
        self.arm_timer(button, TimerPurpose::Classify, self.config.double_click_threshold);
    }

    fn confirm_hold(&mut self, button: Button) {
        let state = &mut self.buttons[button.index()];
        state.is_held = true;
        state.press_count = 0;

        if self.config.mode == InputMode::Discrete {
            self.cancel_timer(button, TimerPurpose::Classify);
        }

        self.emit(Gesture::new(button, GestureKind::Hold));
    }

    fn classify(&mut self, button: Button) {
        let state = &mut self.buttons[button.index()];

        if state.is_held {
            state.is_held = false;
            state.press_count = 0;
            self.cancel_timer(button, TimerPurpose::Hold);
            debug!(%button, "held sequence ended");
            return;
        }

        let count = std::mem::take(&mut state.press_count);
        let quiet_for = state.last_press.map(|at| at.elapsed());
        debug!(%button, count, ?quiet_for, "classifying sequence");
        self.cancel_timer(button, TimerPurpose::Hold);
        match GestureKind::from_press_count(count) {
            Some(kind) => self.emit(Gesture::new(button, kind)),
            None => trace!(%button, "classification window closed with no presses"),
        }
    }

    /// Capture the level to restore for a new sequence. A sequence already
    /// open on the other button keeps the existing snapshot.
    fn open_sequence(&mut self, button: Button, baseline: Option<f32>) {
        let other_active = Button::ALL
            .iter()
            .filter(|other| **other != button)
            .any(|other| !self.buttons[other.index()].is_idle());
        if other_active && self.snapshot.original_level.is_some() {
            return;
        }

        let level = match baseline {
            Some(level) => Some(level),
            None => match self.volume.level() {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!(%e, "volume unavailable, keeping previous snapshot");
                    self.snapshot.original_level
                }
            },
        };

        debug!(%button, ?level, "sequence opened");
        self.snapshot.original_level = level;
    }

    fn restore_volume(&mut self) {
        let Some(level) = self.snapshot.original_level else {
            return;
        };
        if let Err(e) = self.volume.set_level(level) {
            warn!(%e, level, "volume restore skipped");
        }
    }

    fn emit(&mut self, gesture: Gesture) {
        self.restore_volume();

        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        self.emitted += 1;
        info!(button = %gesture.button, %gesture, "gesture emitted");
        sink.emit(GestureEvent::now(gesture));
    }

    /// Arm a timer, replacing any pending one with the same purpose.
    /// A scheduling failure drops the button's sequence.
    fn arm_timer(&mut self, button: Button, purpose: TimerPurpose, after: Duration) -> bool {
        self.cancel_timer(button, purpose);

        let id = TimerId {
            button,
            purpose,
            generation: self.next_generation,
        };
        self.next_generation += 1;

        match self.scheduler.schedule(after, id) {
            Ok(handle) => {
                *self.buttons[button.index()].timer_slot(purpose) = Some(PendingTimer { handle, id });
                true
            }
            Err(e) => {
                warn!(%e, %button, ?purpose, "timer scheduling failed, dropping sequence");
                self.reset_button(button);
                false
            }
        }
    }

    fn cancel_timer(&mut self, button: Button, purpose: TimerPurpose) {
        let pending = self.buttons[button.index()].timer_slot(purpose).take();
        if let Some(pending) = pending {
            self.scheduler.cancel(pending.handle);
        }
    }

    fn reset_button(&mut self, button: Button) {
        self.cancel_timer(button, TimerPurpose::Hold);
        self.cancel_timer(button, TimerPurpose::Classify);
        self.buttons[button.index()] = ButtonState::default();
    }

    fn reset_all(&mut self) {
        for button in Button::ALL {
            self.reset_button(button);
        }
    }
}
