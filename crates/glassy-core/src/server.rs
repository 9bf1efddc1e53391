//! IPC server exposing the opacity commands
//!
//! Each connection is served on its own task and may send any number of
//! requests. Opacity actions always produce a response; failures inside an
//! action are absorbed by the controller.

use crate::Daemon;
use crate::controller::{Applied, Direction};
use crate::log_layer::recent_logs;
use crate::store::PreferenceStore;
use crate::xprop::CommandRunner;
use glassy_protocol::{ProtocolError, Request, Response, read_request, write_response};
use tokio::net::{UnixListener, UnixStream};

/// IPC server that listens for command requests
pub struct IpcServer;

impl IpcServer {
    /// Bind the daemon's socket and serve until the task is dropped
    pub async fn run<R, S>(daemon: Daemon<R, S>) -> Result<(), ProtocolError>
    where
        R: CommandRunner + 'static,
        S: PreferenceStore + 'static,
    {
        let listener = Self::bind(&daemon).await?;
        tracing::info!("IPC server listening on {:?}", daemon.socket_path());

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let daemon = daemon.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, daemon).await {
                            match e {
                                ProtocolError::ConnectionClosed => {
                                    tracing::debug!("Client disconnected");
                                }
                                _ => {
                                    tracing::error!("Connection error: {}", e);
                                }
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }
    }

    async fn bind<R, S>(daemon: &Daemon<R, S>) -> Result<UnixListener, ProtocolError> {
        let socket_path = daemon.socket_path();

        if socket_path.exists() {
            // A live socket belongs to another daemon; a dead one is stale
            if UnixStream::connect(socket_path).await.is_ok() {
                return Err(ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("another glassy daemon is listening on {:?}", socket_path),
                )));
            }
            std::fs::remove_file(socket_path)?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(UnixListener::bind(socket_path)?)
    }

    /// Handle a single connection
    async fn handle_connection<R, S>(
        stream: UnixStream,
        daemon: Daemon<R, S>,
    ) -> Result<(), ProtocolError>
    where
        R: CommandRunner,
        S: PreferenceStore,
    {
        let (mut reader, mut writer) = stream.into_split();

        loop {
            let request = read_request(&mut reader).await?;
            tracing::debug!("Received request: {:?}", request);

            let response = Self::handle_request(&request, &daemon).await;
            tracing::debug!("Sending response: {:?}", response);

            write_response(&mut writer, &response).await?;
        }
    }

    /// Handle a single request
    pub async fn handle_request<R, S>(request: &Request, daemon: &Daemon<R, S>) -> Response
    where
        R: CommandRunner,
        S: PreferenceStore,
    {
        let controller = daemon.controller();
        match request {
            Request::Ping => Response::Pong,
            Request::Increase => applied(controller.change_opacity(Direction::Increase).await),
            Request::Decrease => applied(controller.change_opacity(Direction::Decrease).await),
            Request::Toggle => applied(controller.toggle_opacity().await),
            Request::Status => Response::Status(controller.status().await),
            Request::GetLogs { level, limit } => match daemon.log_buffer() {
                Some(buffer) => Response::Logs {
                    entries: recent_logs(buffer, level.as_deref(), *limit),
                },
                None => Response::Error {
                    message: "Log capture is not enabled in this daemon".to_string(),
                },
            },
        }
    }
}

fn applied(outcome: Option<Applied>) -> Response {
    match outcome {
        Some(Applied { window, opacity }) => Response::Applied {
            window: window.to_string(),
            opacity,
        },
        None => Response::NoActiveWindow,
    }
}
