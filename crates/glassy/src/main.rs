//! glassy: dim or restore the focused X11 window
//!
//! `glassy daemon` serves commands over a Unix socket and applies the
//! preferred opacity shortly after start. The other subcommands are meant to
//! be bound to keys.

mod commands;
mod ipc_client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{CommandContext, execute, is_failure, render};
use glassy_core::constants::{LOG_BUFFER_CAPACITY, STARTUP_DELAY};
use glassy_core::{
    Config, Daemon, FileStore, IpcServer, LogBuffer, LogCaptureLayer, OpacityController,
    ProcessRunner, XpropClient,
};
use glassy_protocol::Request;
use std::path::PathBuf;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

#[derive(Debug, Parser)]
#[command(name = "glassy", version, about = "Dim or restore the focused X11 window")]
struct Cli {
    /// Config file (default: ~/.config/glassy/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Daemon socket (default: $XDG_RUNTIME_DIR/glassy.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Make the focused window more opaque by one step
    Increase,
    /// Make the focused window more transparent by one step
    Decrease,
    /// Switch the focused window between opaque and the preferred level
    Toggle,
    /// Show the focused window's opacity and the preferred level
    Status,
    /// Check whether the daemon is running
    Ping,
    /// Show log entries captured by the daemon
    Logs {
        /// Minimum level (error, warn, info, debug, trace)
        #[arg(long)]
        level: Option<String>,
        /// Show only the newest N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Serve commands and apply the preferred opacity at startup
    Daemon {
        /// Do not touch the focused window at startup
        #[arg(long)]
        no_startup: bool,
    },
}

impl Command {
    fn request(&self) -> Option<Request> {
        Some(match self {
            Command::Increase => Request::Increase,
            Command::Decrease => Request::Decrease,
            Command::Toggle => Request::Toggle,
            Command::Status => Request::Status,
            Command::Ping => Request::Ping,
            Command::Logs { level, limit } => Request::GetLogs {
                level: level.clone(),
                limit: *limit,
            },
            Command::Daemon { .. } => return None,
        })
    }
}

fn default_level(debug: bool, daemon: bool) -> &'static str {
    match (debug, daemon) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    }
}

/// Handles to the installed logging stack
struct Logging {
    buffer: Option<LogBuffer>,
    /// Present when the filter came from defaults rather than `RUST_LOG`
    filter: Option<reload::Handle<EnvFilter, Registry>>,
}

impl Logging {
    /// Switch to debug output once the config asks for it
    fn apply_config(&self, config: &Config) {
        let Some(filter) = &self.filter else {
            return;
        };
        if config.debug {
            if let Err(e) = filter.reload(EnvFilter::new(default_level(true, false))) {
                tracing::warn!("Failed to enable debug logging: {}", e);
            }
            tracing::debug!("Debug logging enabled");
        }
    }
}

/// Build the subscriber before the config is known, so config loading is logged
fn build_subscriber(
    daemon: bool,
    env_filter: Option<EnvFilter>,
) -> (impl Subscriber + Send + Sync + 'static, Logging) {
    let from_env = env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| EnvFilter::new(default_level(false, daemon)));
    let (filter, handle) = reload::Layer::new(filter);

    let (capture, buffer) = if daemon {
        let (layer, buffer) = LogCaptureLayer::new(LOG_BUFFER_CAPACITY);
        (Some(layer), Some(buffer))
    } else {
        (None, None)
    };

    // Logs go to stderr so command output on stdout stays clean
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(capture);

    let logging = Logging {
        buffer,
        filter: (!from_env).then_some(handle),
    };
    (subscriber, logging)
}

async fn run_daemon(
    config: Config,
    socket_path: PathBuf,
    no_startup: bool,
    log_buffer: Option<LogBuffer>,
) -> Result<()> {
    let store = FileStore::open_default()?;
    tracing::debug!("Preference store at {:?}", store.path());

    let client = XpropClient::new(ProcessRunner::new());
    let controller = OpacityController::new(config, client, store);
    let mut daemon = Daemon::with_socket_path(controller, socket_path);
    if let Some(buffer) = log_buffer {
        daemon = daemon.with_log_buffer(buffer);
    }

    if !no_startup {
        daemon.start_startup(STARTUP_DELAY);
    }

    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = IpcServer::run(daemon.clone()) => {
            result.context("IPC server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
        _ = terminate.recv() => {
            tracing::info!("Terminated, shutting down");
        }
    }

    if let Err(e) = std::fs::remove_file(daemon.socket_path()) {
        tracing::debug!("Failed to remove socket: {}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let daemon = matches!(cli.command, Command::Daemon { .. });
    let (subscriber, logging) = build_subscriber(daemon, EnvFilter::try_from_default_env().ok());
    subscriber.init();

    let config = Config::load(cli.config.as_deref())?;
    logging.apply_config(&config);

    let socket_path = cli
        .socket
        .clone()
        .unwrap_or_else(glassy_protocol::default_socket_path);

    let Some(request) = cli.command.request() else {
        // Only the daemon has no request to send
        let no_startup = matches!(cli.command, Command::Daemon { no_startup: true });
        tracing::info!("Starting glassy daemon...");
        return run_daemon(config, socket_path, no_startup, logging.buffer).await;
    };

    let ctx = CommandContext {
        socket_path,
        config,
        store_path: FileStore::default_path()?,
        runner: ProcessRunner::new(),
    };
    let response = execute(request, &ctx).await?;
    let output = render(&response, cli.json)?;
    if is_failure(&response) {
        eprintln!("{}", output);
        std::process::exit(1);
    }
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
