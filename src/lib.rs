//! volkey: hardware volume-button gesture recognition
//!
//! Turns raw volume-key edges or analog volume-level changes into
//! single/double/triple/hold gestures per button, restoring the output
//! level so presses never change it.
//!
//! - `source`: platform adapters producing canonical raw events
//! - `recognizer`: the per-button state machine and its async service
//! - `events`: gesture vocabulary delivered to listeners
//! - `ipc`: Unix-socket channel used by the daemon binary

pub mod config;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod recognizer;
pub mod source;
