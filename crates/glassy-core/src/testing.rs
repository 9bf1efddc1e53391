//! In-memory stand-in for `xprop`
//!
//! Answers the three invocations the client issues with the same text the
//! real tool prints, backed by a property table.

use crate::constants::{ACTIVE_WINDOW_ATOM, MAX_OPACITY, OPACITY_ATOM};
use crate::errors::CommandError;
use crate::xprop::{CommandRunner, quantize};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeState {
    active: Option<String>,
    opacity: HashMap<String, u32>,
    fail_query: bool,
    fail_reads: bool,
    fail_writes: bool,
    delay: Option<Duration>,
    calls: Vec<Vec<String>>,
    writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeXprop {
    state: Arc<Mutex<FakeState>>,
}

fn failure(stderr: &str) -> CommandError {
    CommandError::Exit {
        program: "xprop".into(),
        status: "exit status: 1".into(),
        stderr: stderr.into(),
    }
}

impl FakeXprop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(self, window: &str) -> Self {
        self.state.lock().active = Some(window.to_string());
        self
    }

    pub fn set_level(&self, window: &str, level: f64) {
        self.state
            .lock()
            .opacity
            .insert(window.to_string(), quantize(level));
    }

    pub fn raw(&self, window: &str) -> Option<u32> {
        self.state.lock().opacity.get(window).copied()
    }

    pub fn level(&self, window: &str) -> Option<f64> {
        self.raw(window).map(|v| v as f64 / MAX_OPACITY)
    }

    pub fn fail_query(&self, fail: bool) {
        self.state.lock().fail_query = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Sleep this long inside every invocation
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().calls.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn respond(&self, args: &[String]) -> Result<String, CommandError> {
        let mut state = self.state.lock();
        state.calls.push(args.to_vec());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["-root", atom] if *atom == ACTIVE_WINDOW_ATOM => {
                if state.fail_query {
                    return Err(failure("unable to open display"));
                }
                let id = state.active.as_deref().unwrap_or("0x0");
                Ok(format!("_NET_ACTIVE_WINDOW(WINDOW): window id # {id}"))
            }
            ["-id", window, atom] if *atom == OPACITY_ATOM => {
                if state.fail_reads {
                    return Err(failure("BadWindow (invalid Window parameter)"));
                }
                Ok(match state.opacity.get(*window) {
                    Some(value) => format!("_NET_WM_WINDOW_OPACITY(CARDINAL) = {value}"),
                    None => "_NET_WM_WINDOW_OPACITY:  not found.".to_string(),
                })
            }
            ["-id", window, "-f", atom, "32c", "-set", _, value] if *atom == OPACITY_ATOM => {
                if state.fail_writes {
                    return Err(failure("BadWindow (invalid Window parameter)"));
                }
                let value: u32 = value
                    .parse()
                    .map_err(|_| failure("invalid CARDINAL value"))?;
                state.opacity.insert(window.to_string(), value);
                state.writes += 1;
                Ok(String::new())
            }
            other => Err(failure(&format!("unexpected arguments: {other:?}"))),
        }
    }
}

impl CommandRunner for FakeXprop {
    async fn run(&self, program: &str, args: &[String]) -> Result<String, CommandError> {
        assert_eq!(program, "xprop");
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(args)
    }
}
