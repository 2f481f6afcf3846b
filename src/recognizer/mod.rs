//! Gesture recognizer module
//!
//! Turns raw volume-button activity into discrete gestures per button:
//! - Single / Double / Triple: presses coalesced within the debounce window
//! - Hold: button kept down past the hold threshold
//!
//! The recognizer talks to its collaborators through narrow traits
//! (`TimerScheduler`, `VolumeController`, `GestureSink`) and is driven by
//! `GestureService` on a single input queue.

mod button;
mod machine;
mod service;
mod sink;
mod timer;
mod volume;

pub use button::ButtonState;
pub use machine::{GestureRecognizer, RecognizerConfig, VolumeSnapshot};
pub use service::{GestureService, RecognizerInput};
pub use sink::GestureSink;
pub use timer::{TimerError, TimerHandle, TimerId, TimerPurpose, TimerScheduler, TokioScheduler};
pub use volume::{SoftwareVolume, UnavailableVolume, VolumeController, VolumeError};
