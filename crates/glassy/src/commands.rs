//! Command dispatch and output formatting
//!
//! Commands go to the daemon when one is listening. Opacity commands fall
//! back to running in-process against the same config and preference store,
//! so the tool also works from a keybinding without a daemon.

use crate::ipc_client::IpcClient;
use anyhow::Result;
use glassy_core::{
    CommandRunner, Config, Daemon, FileLock, FileStore, IpcServer, OpacityController,
    ProcessRunner, XpropClient,
};
use glassy_protocol::{LogEntry, Request, Response, StatusInfo, WindowState};
use std::path::PathBuf;

/// Where and how to run a command
pub struct CommandContext<R = ProcessRunner> {
    pub socket_path: PathBuf,
    pub config: Config,
    /// Preference store used when running without a daemon
    pub store_path: PathBuf,
    pub runner: R,
}

/// Run a request against the daemon, or locally if there is none
pub async fn execute<R>(request: Request, ctx: &CommandContext<R>) -> Result<Response>
where
    R: CommandRunner + Clone,
{
    let client = IpcClient::with_socket_path(ctx.socket_path.clone());
    if client.is_socket_available() {
        match client.send_request(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => tracing::warn!("Daemon unreachable ({}), running locally", e),
        }
    }
    run_locally(&request, ctx).await
}

async fn run_locally<R>(request: &Request, ctx: &CommandContext<R>) -> Result<Response>
where
    R: CommandRunner + Clone,
{
    if matches!(request, Request::Ping | Request::GetLogs { .. }) {
        return Ok(no_daemon());
    }

    // Other glassy processes may be acting on the same window right now
    let store = FileStore::new(ctx.store_path.clone());
    let lock = FileLock::new(store.lock_path());
    let client = XpropClient::new(ctx.runner.clone());
    let controller =
        OpacityController::new(ctx.config.clone(), client, store).with_file_lock(lock);
    let daemon = Daemon::with_socket_path(controller, ctx.socket_path.clone());
    Ok(IpcServer::handle_request(request, &daemon).await)
}

fn no_daemon() -> Response {
    Response::Error {
        message: "No glassy daemon is running. Start one with `glassy daemon`.".to_string(),
    }
}

fn percent(level: f64) -> i64 {
    (level * 100.0).round() as i64
}

/// Format a response for the terminal
pub fn render(response: &Response, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(response)?);
    }

    Ok(match response {
        Response::Pong => "pong".to_string(),
        Response::Applied { window, opacity } => format!("{}: {}%", window, percent(*opacity)),
        Response::NoActiveWindow => "No active window".to_string(),
        Response::Status(status) => render_status(status),
        Response::Logs { entries } => entries
            .iter()
            .map(render_log)
            .collect::<Vec<_>>()
            .join("\n"),
        Response::Error { message } => message.clone(),
    })
}

fn render_status(status: &StatusInfo) -> String {
    let mut lines = Vec::new();
    match (&status.window, status.opacity) {
        (Some(window), Some(opacity)) => {
            let state = match status.state {
                Some(WindowState::Visible) => "visible",
                Some(WindowState::Dimmed) => "dimmed",
                None => "unknown",
            };
            lines.push(format!("window:    {}", window));
            lines.push(format!("opacity:   {}% ({})", percent(opacity), state));
        }
        _ => lines.push("window:    none".to_string()),
    }
    lines.push(format!("preferred: {}%", percent(status.preferred)));
    lines.join("\n")
}

fn render_log(entry: &LogEntry) -> String {
    format!(
        "{} {:>5} {}: {}",
        entry.timestamp_ms, entry.level, entry.target, entry.message
    )
}

/// Whether the response should make the process exit unsuccessfully
pub fn is_failure(response: &Response) -> bool {
    matches!(response, Response::Error { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glassy_core::PreferenceStore;
    use glassy_core::errors::CommandError;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    const WIN: &str = "0x3a00007";

    /// Single focused window with an opacity property
    #[derive(Clone, Default)]
    struct StubXprop {
        raw: Arc<Mutex<Option<u32>>>,
    }

    impl CommandRunner for StubXprop {
        async fn run(&self, _program: &str, args: &[String]) -> Result<String, CommandError> {
            let mut raw = self.raw.lock();
            Ok(match args.len() {
                2 => format!("_NET_ACTIVE_WINDOW(WINDOW): window id # {WIN}"),
                3 => match *raw {
                    Some(value) => format!("_NET_WM_WINDOW_OPACITY(CARDINAL) = {value}"),
                    None => "_NET_WM_WINDOW_OPACITY:  not found.".to_string(),
                },
                _ => {
                    *raw = args.last().and_then(|v| v.parse().ok());
                    String::new()
                }
            })
        }
    }

    fn context(dir: &Path, runner: StubXprop) -> CommandContext<StubXprop> {
        CommandContext {
            socket_path: dir.join("glassy.sock"),
            config: Config::default(),
            store_path: dir.join("state.json"),
            runner,
        }
    }

    #[test]
    fn test_render_applied() {
        let response = Response::Applied {
            window: "0x3a00007".into(),
            opacity: 0.8,
        };
        assert_eq!(render(&response, false).unwrap(), "0x3a00007: 80%");
    }

    #[test]
    fn test_render_status_with_window() {
        let response = Response::Status(StatusInfo {
            window: Some("0x3a00007".into()),
            opacity: Some(0.85),
            state: Some(WindowState::Dimmed),
            preferred: 0.85,
        });
        let text = render(&response, false).unwrap();
        assert!(text.contains("0x3a00007"));
        assert!(text.contains("85% (dimmed)"));
        assert!(text.contains("preferred: 85%"));
    }

    #[test]
    fn test_render_status_without_window() {
        let response = Response::Status(StatusInfo {
            window: None,
            opacity: None,
            state: None,
            preferred: 0.6,
        });
        let text = render(&response, false).unwrap();
        assert!(text.contains("window:    none"));
        assert!(text.contains("60%"));
    }

    #[test]
    fn test_render_json() {
        let text = render(&Response::NoActiveWindow, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "NoActiveWindow");
    }

    #[test]
    fn test_render_logs() {
        let response = Response::Logs {
            entries: vec![LogEntry {
                level: "WARN".into(),
                target: "glassy_core::xprop".into(),
                message: "assuming opaque".into(),
                timestamp_ms: 42,
            }],
        };
        assert_eq!(
            render(&response, false).unwrap(),
            "42  WARN glassy_core::xprop: assuming opaque"
        );
    }

    #[test]
    fn test_only_errors_fail() {
        assert!(is_failure(&no_daemon()));
        assert!(!is_failure(&Response::NoActiveWindow));
    }

    #[tokio::test]
    async fn test_ping_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), StubXprop::default());
        let response = execute(Request::Ping, &ctx).await.unwrap();
        assert!(is_failure(&response));
    }

    #[tokio::test]
    async fn test_decrease_falls_back_past_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubXprop::default();
        let ctx = context(dir.path(), stub.clone());
        // Left behind by a daemon that did not shut down cleanly
        std::fs::write(&ctx.socket_path, b"").unwrap();

        let response = execute(Request::Decrease, &ctx).await.unwrap();
        match response {
            Response::Applied { window, opacity } => {
                assert_eq!(window, WIN);
                assert!((opacity - 0.95).abs() < 1e-6);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(stub.raw.lock().is_some());

        let saved = FileStore::new(&ctx.store_path)
            .load_preferred()
            .await
            .unwrap();
        assert!((saved.unwrap() - 0.95).abs() < 1e-6);
        assert!(dir.path().join("state.lock").exists());
    }

    #[tokio::test]
    async fn test_sequential_local_commands_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubXprop::default();
        let ctx = context(dir.path(), stub.clone());

        execute(Request::Decrease, &ctx).await.unwrap();
        let response = execute(Request::Decrease, &ctx).await.unwrap();
        assert!(matches!(
            response,
            Response::Applied { opacity, .. } if (opacity - 0.90).abs() < 1e-6
        ));
    }
}
