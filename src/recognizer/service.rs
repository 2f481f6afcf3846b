//! Async owner of one gesture recognizer
//!
//! Raw events, fired timers and attach/detach requests all travel through
//! one mpsc queue, so the recognizer never sees two inputs at once.

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::events::GestureEvent;
use crate::source::RawEvent;

use super::machine::{GestureRecognizer, RecognizerConfig};
use super::timer::{TimerId, TokioScheduler};
use super::volume::VolumeController;

/// Inputs serialized onto the recognizer queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecognizerInput {
    /// A translated platform event
    Raw(RawEvent),
    /// A timer armed by the recognizer fired
    Timer(TimerId),
    /// The host view attached; start emitting gestures
    Attach,
    /// The host view was torn down
    Detach,
}

/// Runs a recognizer against its input queue and broadcasts gestures
pub struct GestureService<V> {
    recognizer: GestureRecognizer<V, TokioScheduler>,
    event_tx: broadcast::Sender<GestureEvent>,
}

impl<V: VolumeController> GestureService<V> {
    /// Create a service. `queue_tx` must feed the receiver later passed to
    /// [`run`](Self::run); timers deliver through it.
    pub fn new(
        config: RecognizerConfig,
        volume: V,
        event_tx: broadcast::Sender<GestureEvent>,
        queue_tx: &mpsc::Sender<RecognizerInput>,
    ) -> Self {
        let scheduler = TokioScheduler::new(queue_tx);
        Self {
            recognizer: GestureRecognizer::new(config, volume, scheduler),
            event_tx,
        }
    }

    pub fn recognizer(&self) -> &GestureRecognizer<V, TokioScheduler> {
        &self.recognizer
    }

    /// Process inputs until every external sender is dropped
    pub async fn run(&mut self, mut input_rx: mpsc::Receiver<RecognizerInput>) {
        info!(
            double_click_ms = self.recognizer.config().double_click_threshold.as_millis() as u64,
            hold_ms = self.recognizer.config().hold_threshold.as_millis() as u64,
            "gesture service started"
        );

        while let Some(input) = input_rx.recv().await {
            self.handle(input);
        }

        self.recognizer.detach();
        info!(emitted = self.recognizer.emitted(), "gesture service stopped");
    }

    fn handle(&mut self, input: RecognizerInput) {
        match input {
            RecognizerInput::Raw(event) => self.recognizer.handle_raw(event),
            RecognizerInput::Timer(id) => self.recognizer.handle_timer(id),
            RecognizerInput::Attach => {
                self.recognizer.attach(Box::new(self.event_tx.clone()));
            }
            RecognizerInput::Detach => self.recognizer.detach(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::events::{Button, Gesture, GestureKind};
    use crate::recognizer::volume::SoftwareVolume;

    struct Fixture {
        queue: mpsc::Sender<RecognizerInput>,
        events: broadcast::Receiver<GestureEvent>,
        volume: SoftwareVolume,
        task: tokio::task::JoinHandle<GestureService<SoftwareVolume>>,
    }

    fn start() -> Fixture {
        let (queue, input_rx) = mpsc::channel(32);
        let (event_tx, events) = broadcast::channel(16);
        let volume = SoftwareVolume::new(0.5);
        let mut service = GestureService::new(
            RecognizerConfig::default(),
            volume.clone(),
            event_tx,
            &queue,
        );
        let task = tokio::spawn(async move {
            service.run(input_rx).await;
            service
        });
        Fixture {
            queue,
            events,
            volume,
            task,
        }
    }

    impl Fixture {
        async fn send(&self, input: RecognizerInput) {
            self.queue.send(input).await.unwrap();
        }

        async fn down(&self, button: Button) {
            let at = Instant::now().into_std();
            self.send(RecognizerInput::Raw(RawEvent::down(button, at))).await;
        }

        async fn up(&self, button: Button) {
            let at = Instant::now().into_std();
            self.send(RecognizerInput::Raw(RawEvent::up(button, at))).await;
        }

        fn drain(&mut self) -> Vec<Gesture> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event.gesture);
            }
            out
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_triple_press_through_queue() {
        let mut f = start();
        f.send(RecognizerInput::Attach).await;

        for _ in 0..3 {
            f.down(Button::Down).await;
            sleep_ms(40).await;
            f.up(Button::Down).await;
            sleep_ms(80).await;
        }

        sleep_ms(100).await;
        assert!(f.drain().is_empty());

        sleep_ms(200).await;
        assert_eq!(f.drain(), vec![Gesture::new(Button::Down, GestureKind::Triple)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_then_release() {
        let mut f = start();
        f.send(RecognizerInput::Attach).await;

        f.down(Button::Up).await;
        sleep_ms(810).await;
        assert_eq!(f.drain(), vec![Gesture::new(Button::Up, GestureKind::Hold)]);

        f.up(Button::Up).await;
        sleep_ms(1000).await;
        assert!(f.drain().is_empty());
        assert_eq!(f.volume.current(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_suppresses_pending_gestures() {
        let mut f = start();
        f.send(RecognizerInput::Attach).await;

        f.down(Button::Up).await;
        f.up(Button::Up).await;
        f.down(Button::Down).await;
        f.send(RecognizerInput::Detach).await;

        sleep_ms(2000).await;
        assert!(f.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_before_attach_are_dropped() {
        let mut f = start();
        f.down(Button::Up).await;
        f.up(Button::Up).await;
        sleep_ms(1000).await;
        assert!(f.drain().is_empty());

        f.send(RecognizerInput::Attach).await;
        f.down(Button::Up).await;
        f.up(Button::Up).await;
        sleep_ms(1000).await;
        assert_eq!(f.drain(), vec![Gesture::new(Button::Up, GestureKind::Single)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_senders_drop() {
        let f = start();
        f.send(RecognizerInput::Attach).await;
        f.down(Button::Up).await;

        drop(f.queue);
        let service = tokio_test::assert_ok!(f.task.await);
        assert!(!service.recognizer().is_attached());
        assert!(service.recognizer().button(Button::Up).is_idle());
    }
}
