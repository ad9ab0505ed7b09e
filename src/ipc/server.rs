//! Unix domain socket server for IPC
//!
//! Translates UI requests into control commands and answers with the
//! resulting status.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::control::{ControlCommand, ControlHandle};
use crate::hotkey::ModifierCombo;
use crate::remap::EditFlagSet;

use super::protocol::{DaemonStatus, Request, Response};

/// Largest accepted request body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: RequestContext,
    shutdown_tx: broadcast::Sender<()>,
}

/// What request handling needs, shared by every client task
#[derive(Clone)]
struct RequestContext {
    control: ControlHandle,
    start_time: Instant,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, control: ControlHandle) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: RequestContext {
                control,
                start_time: Instant::now(),
            },
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = self.context.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
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

/// Handle a single client connection
async fn handle_client(mut stream: UnixStream, context: RequestContext) -> Result<()> {
    let mut len_buf = [0u8; 4];

    loop {
        // Read message length (4-byte little-endian)
        match stream.read_exact(&mut len_buf).await {
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
        stream.read_exact(&mut msg_buf).await?;

        let response = match serde_json::from_slice::<Request>(&msg_buf) {
            Ok(request) => {
                debug!(?request, "received request");
                process_request(request, &context).await
            }
            Err(e) => {
                warn!(?e, "malformed request");
                Response::error("bad_request", e.to_string())
            }
        };

        send_message(&mut stream, &response).await?;
    }
}

/// Send a length-prefixed JSON message
async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    stream.write_all(&msg_len).await?;
    stream.write_all(&msg_bytes).await?;

    Ok(())
}

/// Process a request and return a response
async fn process_request(request: Request, context: &RequestContext) -> Response {
    let command = match request {
        Request::Ping => return Response::Pong,
        Request::GetStatus => ControlCommand::Status,
        Request::SetLayoutCombo { index } => match ModifierCombo::from_index(index) {
            Some(combo) => ControlCommand::SetLayoutCombo(combo),
            None => {
                return Response::error("invalid_combo", format!("no layout combo at index {index}"))
            }
        },
        Request::SetEditFlags { mask } => ControlCommand::SetEditFlags(EditFlagSet::from_mask(mask)),
        Request::SetEnabled { enabled } => ControlCommand::SetEnabled(enabled),
        Request::SetAutostart { enabled } => ControlCommand::SetAutostart(enabled),
    };

    match context.control.send(command).await {
        Ok(status) => Response::Status(DaemonStatus::new(
            status,
            context.start_time.elapsed().as_secs(),
        )),
        Err(e) => Response::error(e.code(), e.to_string()),
    }
}
