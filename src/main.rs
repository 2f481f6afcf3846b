//! volkey-daemon: background host for the volume-button gesture recognizer
//!
//! Provides:
//! - Platform input intake over a Unix-socket IPC channel
//! - One gesture recognizer driven from a single serialized queue
//! - Gesture push notifications to subscribed clients

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use volkey::config::Config;
use volkey::events::GestureEvent;
use volkey::ipc::{Backend, Server};
use volkey::lifecycle::ShutdownSignal;
use volkey::recognizer::{GestureService, RecognizerInput, SoftwareVolume};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "volkey-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        mode = %config.recognizer.mode,
        double_click_ms = config.recognizer.double_click_threshold.as_millis() as u64,
        hold_ms = config.recognizer.hold_threshold.as_millis() as u64,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // IPC server + timers -> recognizer
    let (input_tx, input_rx) = mpsc::channel::<RecognizerInput>(64);
    // Recognizer -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<GestureEvent>(64);

    let volume = SoftwareVolume::new(config.initial_volume);

    // Create the recognizer service
    let mut service = GestureService::new(
        config.recognizer,
        volume.clone(),
        event_tx.clone(),
        &input_tx,
    );

    // Create IPC server
    let server = Server::new(
        &config.socket_path,
        Backend {
            input_tx,
            event_tx: event_tx.clone(),
            volume,
            mode: config.recognizer.mode,
        },
    )?;

    // Subscribe to gestures for logging and status counters
    let mut gesture_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the recognizer (processes raw input and timers)
        _ = service.run(input_rx) => {
            info!("gesture service exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Track emitted gestures
        _ = async {
            loop {
                match gesture_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "gesture delivered");
                        server_for_events.record_gesture().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "gesture receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("gesture event handler exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to register signal handlers"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("volkey-daemon stopped");

    Ok(())
}
