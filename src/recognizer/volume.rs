//! Output volume access
//!
//! The recognizer reads the level when a press sequence opens and writes it
//! back after every press and emission, so button presses never audibly
//! change the output level.

use std::sync::Arc;

use tokio::sync::watch;

/// Errors that can occur reading or writing the output level
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("volume control is unavailable")]
    Unavailable,

    #[error("volume level {0} is outside 0.0..=1.0")]
    OutOfRange(f32),
}

/// Get/set access to the device output level (normalized to `0.0..=1.0`)
pub trait VolumeController: Send {
    fn level(&self) -> Result<f32, VolumeError>;

    fn set_level(&mut self, level: f32) -> Result<(), VolumeError>;
}

/// In-process output level shared between clones.
///
/// Changes are published on a watch channel so observers can follow
/// restores performed by the recognizer.
#[derive(Debug, Clone)]
pub struct SoftwareVolume {
    level: Arc<watch::Sender<f32>>,
}

impl SoftwareVolume {
    pub fn new(initial: f32) -> Self {
        let (level, _) = watch::channel(initial.clamp(0.0, 1.0));
        Self {
            level: Arc::new(level),
        }
    }

    /// Subscribe to level changes
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.level.subscribe()
    }

    /// Current level without going through the fallible trait
    pub fn current(&self) -> f32 {
        *self.level.borrow()
    }
}

impl VolumeController for SoftwareVolume {
    fn level(&self) -> Result<f32, VolumeError> {
        Ok(self.current())
    }

    fn set_level(&mut self, level: f32) -> Result<(), VolumeError> {
        if !level.is_finite() || !(0.0..=1.0).contains(&level) {
            return Err(VolumeError::OutOfRange(level));
        }
        self.level.send_if_modified(|current| {
            if *current == level {
                false
            } else {
                *current = level;
                true
            }
        });
        Ok(())
    }
}

/// Controller for hosts without volume access; every call fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableVolume;

impl VolumeController for UnavailableVolume {
    fn level(&self) -> Result<f32, VolumeError> {
        Err(VolumeError::Unavailable)
    }

    fn set_level(&mut self, _level: f32) -> Result<(), VolumeError> {
        Err(VolumeError::Unavailable)
    }
}
