//! Unix domain socket server for IPC
//!
//! Accepts platform input from the host, forwards it to the recognizer
//! queue, and pushes gesture notifications to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::GestureEvent;
use crate::recognizer::{RecognizerInput, SoftwareVolume, VolumeController};
use crate::source::{AnalogAdapter, InputMode, KeyAdapter, RawEvent, VolumeNotification};

use super::protocol::{DaemonStatus, Notification, Request, Response, MAX_MESSAGE_LEN};

/// Everything the server needs to reach the recognizer
#[derive(Clone)]
pub struct Backend {
    /// Recognizer input queue
    pub input_tx: mpsc::Sender<RecognizerInput>,
    /// Gesture broadcast, subscribed per client
    pub event_tx: broadcast::Sender<GestureEvent>,
    /// Mirror of the device output level
    pub volume: SoftwareVolume,
    /// Which platform input the recognizer expects
    pub mode: InputMode,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    context: Arc<ClientContext>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

/// Input translation shared by all client handlers
struct ClientContext {
    backend: Backend,
    keys: KeyAdapter,
    analog: Mutex<AnalogFeed>,
}

/// Analog adapter kept in step with restores made by the recognizer
struct AnalogFeed {
    adapter: AnalogAdapter,
    levels: watch::Receiver<f32>,
    volume: SoftwareVolume,
}

impl AnalogFeed {
    fn new(volume: SoftwareVolume) -> Self {
        let mut levels = volume.subscribe();
        let level = *levels.borrow_and_update();
        Self {
            adapter: AnalogAdapter::new(level),
            levels,
            volume,
        }
    }

    fn translate(&mut self, notification: VolumeNotification) -> Option<RawEvent> {
        // Pick up restores written since the last notification
        if self.levels.has_changed().unwrap_or(false) {
            let level = *self.levels.borrow_and_update();
            self.adapter.rebase(level);
        }

        let event = self.adapter.translate(notification, Instant::now());

        // The platform already applied this level; mirror it without
        // treating our own write as a restore
        if let Err(e) = self.volume.set_level(notification.level) {
            warn!(%e, "failed to mirror platform volume");
        }
        self.levels.borrow_and_update();

        event
    }
}

/// Message read from a client
enum Inbound {
    Request(Request),
    Malformed(String),
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, backend: Backend) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus {
                mode: backend.mode,
                volume: backend.volume.current(),
                ..DaemonStatus::default()
            },
            start_time: Instant::now(),
        }));

        let context = Arc::new(ClientContext {
            keys: KeyAdapter::new(),
            analog: Mutex::new(AnalogFeed::new(backend.volume.clone())),
            backend,
        });

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            context,
        })
    }

    /// Count a gesture delivered by the recognizer
    pub async fn record_gesture(&self) {
        let mut state = self.state.write().await;
        state.status.gestures_emitted += 1;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref()
            .context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        context: Arc<ClientContext>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (inbound_tx, mut inbound_rx) = mpsc::channel(16);

        let read_task = tokio::spawn(async move {
            if let Err(e) = Self::read_requests(reader, inbound_tx).await {
                warn!(?e, "client read error");
            }
        });

        let mut gestures: Option<broadcast::Receiver<GestureEvent>> = None;

        let result = loop {
            tokio::select! {
                inbound = inbound_rx.recv() => {
                    let response = match inbound {
                        Some(Inbound::Request(request)) => {
                            debug!(?request, "received request");
                            if matches!(request, Request::Subscribe) && gestures.is_none() {
                                gestures = Some(context.backend.event_tx.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &state, &context).await
                        }
                        Some(Inbound::Malformed(message)) => {
                            Response::error("bad_request", message)
                        }
                        None => break Ok(()),
                    };

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = Self::next_gesture(&mut gestures) => {
                    match event {
                        Ok(event) => {
                            let notification = Notification::Gesture(event);
                            if let Err(e) = Self::send_message(&mut writer, &notification).await {
                                break Err(e);
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "gesture subscriber lagged");
                        }
                        Err(RecvError::Closed) => {
                            gestures = None;
                        }
                    }
                }
            }
        };

        read_task.abort();
        result
    }

    /// Wait for the next gesture, or forever when not subscribed
    async fn next_gesture(
        gestures: &mut Option<broadcast::Receiver<GestureEvent>>,
    ) -> Result<GestureEvent, RecvError> {
        match gestures {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Read length-prefixed requests until the client disconnects
    async fn read_requests(mut reader: OwnedReadHalf, inbound_tx: mpsc::Sender<Inbound>) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let inbound = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => Inbound::Request(request),
                Err(e) => Inbound::Malformed(e.to_string()),
            };

            if inbound_tx.send(inbound).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        context: &ClientContext,
    ) -> Response {
        let mode = context.backend.mode;

        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                state.status.volume = context.backend.volume.current();
                Response::Status(state.status.clone())
            }

            Request::Subscribe => Response::Subscribed,

            Request::Key { code, action } => {
                if mode != InputMode::Discrete {
                    return Response::error(
                        "unsupported_input",
                        format!("key events require discrete input, running {mode}"),
                    );
                }
                match context.keys.translate(code, action, Instant::now()) {
                    Some(event) => Self::forward(context, RecognizerInput::Raw(event)).await,
                    None => Response::Accepted { consumed: false },
                }
            }

            Request::VolumeChanged { level, reason } => {
                if mode != InputMode::Analog {
                    return Response::error(
                        "unsupported_input",
                        format!("volume notifications require analog input, running {mode}"),
                    );
                }
                if !level.is_finite() || !(0.0..=1.0).contains(&level) {
                    return Response::error("invalid_level", format!("level {level} is outside 0.0..=1.0"));
                }

                let event = context
                    .analog
                    .lock()
                    .await
                    .translate(VolumeNotification { level, reason });
                match event {
                    Some(event) => Self::forward(context, RecognizerInput::Raw(event)).await,
                    None => Response::Accepted { consumed: false },
                }
            }

            Request::Attach | Request::Detach => {
                let attached = matches!(request, Request::Attach);
                let input = if attached {
                    RecognizerInput::Attach
                } else {
                    RecognizerInput::Detach
                };
                let response = Self::forward(context, input).await;
                if matches!(response, Response::Accepted { .. }) {
                    state.write().await.status.attached = attached;
                    info!(attached, "host attachment changed");
                }
                response
            }

            Request::GetVolume => match context.backend.volume.level() {
                Ok(level) => Response::Volume { level },
                Err(e) => Response::error("volume_unavailable", e.to_string()),
            },
        }
    }

    /// Push an input onto the recognizer queue
    async fn forward(context: &ClientContext, input: RecognizerInput) -> Response {
        match context.backend.input_tx.send(input).await {
            Ok(()) => Response::Accepted { consumed: true },
            Err(_) => Response::error("recognizer_stopped", "gesture recognizer is not running"),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}
