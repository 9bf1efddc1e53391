//! Opacity control for the focused X11 window
//!
//! This crate holds the engine behind the `glassy` command: reading and
//! writing `_NET_WM_WINDOW_OPACITY` through `xprop`, the increase/decrease/
//! toggle state logic, persistence of the preferred level, and the daemon
//! that serves those commands over a Unix socket.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use glassy_protocol::{LogEntry, Request, Response, StatusInfo, WindowState};

pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod lock;
mod log_layer;
mod resolver;
mod server;
mod startup;
pub mod store;
pub mod xprop;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use controller::{Applied, Direction, OpacityController, window_state};
pub use lock::{FileLock, FileLockGuard};
pub use log_layer::{LogBuffer, LogCaptureLayer, level_to_priority, recent_logs};
pub use resolver::resolve_active_window;
pub use server::IpcServer;
pub use startup::spawn_startup;
pub use store::{FileStore, MemoryStore, PreferenceStore};
pub use xprop::{CommandRunner, ProcessRunner, WindowHandle, XpropClient};

/// Shared state for the glassy daemon
pub struct Daemon<R = ProcessRunner, S = FileStore> {
    controller: Arc<OpacityController<R, S>>,
    socket_path: PathBuf,
    log_buffer: Option<LogBuffer>,
}

impl<R, S> Clone for Daemon<R, S> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            socket_path: self.socket_path.clone(),
            log_buffer: self.log_buffer.clone(),
        }
    }
}

impl<R, S> Daemon<R, S> {
    /// Create a daemon listening on the default socket path
    pub fn new(controller: OpacityController<R, S>) -> Self {
        Self::with_socket_path(controller, glassy_protocol::default_socket_path())
    }

    /// Create a daemon listening on a custom socket path
    pub fn with_socket_path(controller: OpacityController<R, S>, socket_path: PathBuf) -> Self {
        Self {
            controller: Arc::new(controller),
            socket_path,
            log_buffer: None,
        }
    }

    /// Serve captured logs from `buffer`
    pub fn with_log_buffer(mut self, buffer: LogBuffer) -> Self {
        self.log_buffer = Some(buffer);
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn controller(&self) -> &Arc<OpacityController<R, S>> {
        &self.controller
    }

    pub fn log_buffer(&self) -> Option<&LogBuffer> {
        self.log_buffer.as_ref()
    }
}

impl<R, S> Daemon<R, S>
where
    R: CommandRunner + 'static,
    S: PreferenceStore + 'static,
{
    /// Start the IPC server in a background task
    pub fn start_server(&self) -> tokio::task::JoinHandle<()> {
        let daemon = self.clone();
        tokio::spawn(async move {
            if let Err(e) = IpcServer::run(daemon).await {
                tracing::error!("IPC server error: {}", e);
            }
        })
    }

    /// Schedule the one-shot startup opacity
    pub fn start_startup(&self, delay: Duration) -> tokio::task::JoinHandle<()> {
        spawn_startup(self.controller.clone(), delay)
    }
}
