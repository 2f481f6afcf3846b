//! Event sink for classified gestures

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::GestureEvent;

/// Receives exactly one event per classified gesture
pub trait GestureSink: Send {
    fn emit(&mut self, event: GestureEvent);
}

impl GestureSink for broadcast::Sender<GestureEvent> {
    fn emit(&mut self, event: GestureEvent) {
        if self.send(event).is_err() {
            debug!("gesture emitted with no subscribed listeners");
        }
    }
}
