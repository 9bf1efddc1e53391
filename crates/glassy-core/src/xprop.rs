//! Window property access through the `xprop` tool
//!
//! Every operation is a single `xprop` invocation whose textual output is
//! parsed here. Reads fail open to fully opaque and writes are best effort;
//! the fallible `read_opacity`/`write_opacity` variants expose the error for
//! diagnostics.

use crate::constants::{ACTIVE_WINDOW_ATOM, COMMAND_TIMEOUT, MAX_OPACITY, OPACITY_ATOM};
use crate::errors::{CommandError, PropertyError, ResolveError};
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

const XPROP: &str = "xprop";

static WINDOW_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window id # (0x[0-9a-fA-F]+)").expect("valid window id regex"));

static CARDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s(\d+)").expect("valid cardinal regex"));

/// Identifier of an X11 window as printed by `xprop` (e.g. `0x3a00007`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs an external program and returns its trimmed stdout
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<String, CommandError>> + Send;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::with_timeout(COMMAND_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<String, CommandError> {
        let child = Command::new(program).args(args).kill_on_drop(true).output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| CommandError::Timeout {
                program: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::Exit {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Reads and writes window opacity via `xprop`
#[derive(Debug, Clone, Default)]
pub struct XpropClient<R = ProcessRunner> {
    runner: R,
}

impl<R: CommandRunner> XpropClient<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn xprop(&self, args: &[&str]) -> Result<String, CommandError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.runner.run(XPROP, &args).await
    }

    /// Query the root window for the focused window
    pub async fn query_active_window(&self) -> Result<WindowHandle, ResolveError> {
        let output = self.xprop(&["-root", ACTIVE_WINDOW_ATOM]).await?;
        parse_active_window(&output)
    }

    /// Read a window's opacity; `None` means the property is not set
    pub async fn read_opacity(&self, window: &WindowHandle) -> Result<Option<f64>, PropertyError> {
        let output = self
            .xprop(&["-id", window.as_str(), OPACITY_ATOM])
            .await
            .map_err(|source| PropertyError::Read {
                window: window.to_string(),
                source,
            })?;
        parse_opacity(window, &output)
    }

    /// Read a window's opacity, treating absence and any failure as opaque
    pub async fn get_opacity(&self, window: &WindowHandle) -> f64 {
        match self.read_opacity(window).await {
            Ok(Some(level)) => level,
            Ok(None) => 1.0,
            Err(e) => {
                tracing::warn!("{}; assuming opaque", e);
                1.0
            }
        }
    }

    /// Write a window's opacity as a 32-bit CARDINAL
    pub async fn write_opacity(
        &self,
        window: &WindowHandle,
        level: f64,
    ) -> Result<(), PropertyError> {
        let value = quantize(level).to_string();
        self.xprop(&[
            "-id",
            window.as_str(),
            "-f",
            OPACITY_ATOM,
            "32c",
            "-set",
            OPACITY_ATOM,
            value.as_str(),
        ])
        .await
        .map(|_| ())
        .map_err(|source| PropertyError::Write {
            window: window.to_string(),
            source,
        })
    }

    /// Write a window's opacity, logging and ignoring failures
    pub async fn set_opacity(&self, window: &WindowHandle, level: f64) {
        if let Err(e) = self.write_opacity(window, level).await {
            tracing::error!("{}", e);
        }
    }
}

/// Extract the focused window from `xprop -root _NET_ACTIVE_WINDOW` output
pub fn parse_active_window(output: &str) -> Result<WindowHandle, ResolveError> {
    let id = WINDOW_ID_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ResolveError::NoWindowId {
            output: output.to_string(),
        })?
        .as_str();

    // xprop prints 0x0 when nothing has focus
    if id[2..].bytes().all(|b| b == b'0') {
        return Err(ResolveError::NoActiveWindow);
    }
    Ok(WindowHandle::new(id))
}

/// Parse `xprop -id <w> _NET_WM_WINDOW_OPACITY` output
///
/// Returns `None` when the window has no opacity property.
pub fn parse_opacity(window: &WindowHandle, output: &str) -> Result<Option<f64>, PropertyError> {
    if output.contains("not found") {
        return Ok(None);
    }
    let malformed = || PropertyError::Malformed {
        window: window.to_string(),
        output: output.to_string(),
    };
    let digits = CARDINAL_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .ok_or_else(malformed)?
        .as_str();
    let raw: u64 = digits.parse().map_err(|_| malformed())?;
    Ok(Some((raw as f64 / MAX_OPACITY).min(1.0)))
}

/// Scale an opacity level to the CARDINAL stored on the window
pub fn quantize(level: f64) -> u32 {
    (level.clamp(0.0, 1.0) * MAX_OPACITY).floor() as u32
}
