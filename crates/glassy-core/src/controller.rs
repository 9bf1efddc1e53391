//! Opacity state transitions for the focused window
//!
//! Every transition funnels through [`OpacityController::apply_opacity`],
//! which clamps to `[minimum, 1.0]` before writing. Actions on the same
//! window are serialized so overlapping commands cannot lose updates. Within
//! one process that is an async mutex per window; separate processes share a
//! [`FileLock`] when one is configured.

use crate::config::Config;
use crate::constants::{PERSIST_THRESHOLD, VISIBLE_THRESHOLD};
use crate::lock::{FileLock, FileLockGuard};
use crate::resolver::resolve_active_window;
use crate::store::{FileStore, PreferenceStore};
use crate::xprop::{CommandRunner, ProcessRunner, WindowHandle, XpropClient};
use glassy_protocol::{StatusInfo, WindowState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// Direction of a step change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}

/// Result of an action that wrote an opacity
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub window: WindowHandle,
    pub opacity: f64,
}

/// Derive a window's toggle state from its live opacity
pub fn window_state(opacity: f64) -> WindowState {
    if opacity >= VISIBLE_THRESHOLD {
        WindowState::Visible
    } else {
        WindowState::Dimmed
    }
}

fn percent(level: f64) -> i64 {
    (level * 100.0).round() as i64
}

/// One async mutex per window handle
#[derive(Default)]
struct WindowLocks {
    locks: Mutex<HashMap<WindowHandle, Arc<tokio::sync::Mutex<()>>>>,
}

impl WindowLocks {
    fn get(&self, window: &WindowHandle) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        // Drop entries nobody is waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(window.clone()).or_default().clone()
    }
}

/// Locks held for the duration of one action
struct ActionGuard {
    _window: OwnedMutexGuard<()>,
    _file: Option<FileLockGuard>,
}

/// Drives increase/decrease/toggle against the focused window
pub struct OpacityController<R = ProcessRunner, S = FileStore> {
    config: Config,
    client: XpropClient<R>,
    store: S,
    locks: WindowLocks,
    file_lock: Option<FileLock>,
}

impl<R: CommandRunner, S: PreferenceStore> OpacityController<R, S> {
    pub fn new(config: Config, client: XpropClient<R>, store: S) -> Self {
        Self {
            config,
            client,
            store,
            locks: WindowLocks::default(),
            file_lock: None,
        }
    }

    /// Also serialize actions with other processes through `lock`
    pub fn with_file_lock(mut self, lock: FileLock) -> Self {
        self.file_lock = Some(lock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &XpropClient<R> {
        &self.client
    }

    /// Stored preference, falling back to the configured target
    pub async fn preferred_opacity(&self) -> f64 {
        match self.store.load_preferred().await {
            Ok(Some(level)) => level,
            Ok(None) => self.config.target_level(),
            Err(e) => {
                warn!("{}; using target opacity", e);
                self.config.target_level()
            }
        }
    }

    async fn lock_window(&self, window: &WindowHandle) -> ActionGuard {
        let window_guard = self.locks.get(window).lock_owned().await;
        let file_guard = match &self.file_lock {
            Some(lock) => match lock.acquire().await {
                Ok(guard) => Some(guard),
                Err(e) => {
                    warn!("{}; continuing without the cross-process lock", e);
                    None
                }
            },
            None => None,
        };
        ActionGuard {
            _window: window_guard,
            _file: file_guard,
        }
    }

    /// Clamp a requested level to `[minimum, 1.0]`
    pub fn clamp(&self, requested: f64) -> f64 {
        let min = self.config.min_level();
        if requested.is_nan() {
            return min;
        }
        requested.min(1.0).max(min)
    }

    /// Clamp and write; returns the clamped level even if the write failed
    pub async fn apply_opacity(&self, window: &WindowHandle, requested: f64) -> f64 {
        let clamped = self.clamp(requested);
        debug!("Setting {} opacity → {}%", window, percent(clamped));
        self.client.set_opacity(window, clamped).await;
        clamped
    }

    /// Step the focused window's opacity up or down
    ///
    /// Returns `None` when no window has focus.
    pub async fn change_opacity(&self, direction: Direction) -> Option<Applied> {
        let step = self.config.step_level();
        let window = resolve_active_window(&self.client).await?;
        let _guard = self.lock_window(&window).await;

        let current = self.client.get_opacity(&window).await;
        let next = self
            .apply_opacity(&window, current + step * direction.sign())
            .await;

        if next < PERSIST_THRESHOLD {
            match self.store.save_preferred(next).await {
                Ok(()) => debug!("Preferred opacity saved: {}%", percent(next)),
                Err(e) => warn!("Failed to save preferred opacity: {}", e),
            }
        }

        Some(Applied {
            window,
            opacity: next,
        })
    }

    /// Toggle the focused window between its preferred level and opaque
    ///
    /// The state is read from the window each time, so changes made by other
    /// tools are picked up. Never touches the stored preference.
    pub async fn toggle_opacity(&self) -> Option<Applied> {
        let window = resolve_active_window(&self.client).await?;
        let _guard = self.lock_window(&window).await;

        let current = self.client.get_opacity(&window).await;
        let opacity = match window_state(current) {
            WindowState::Visible => {
                let preferred = self.preferred_opacity().await;
                debug!("Toggle ON → {}%", percent(preferred));
                self.apply_opacity(&window, preferred).await
            }
            WindowState::Dimmed => {
                debug!("Toggle OFF → 100%");
                self.apply_opacity(&window, 1.0).await
            }
        };

        Some(Applied { window, opacity })
    }

    /// Apply the preferred opacity to the focused window once
    pub async fn apply_preferred(&self) -> Option<Applied> {
        let window = resolve_active_window(&self.client).await?;
        let _guard = self.lock_window(&window).await;

        let preferred = self.preferred_opacity().await;
        let opacity = self.apply_opacity(&window, preferred).await;
        Some(Applied { window, opacity })
    }

    /// Describe the focused window without changing anything
    pub async fn status(&self) -> StatusInfo {
        let preferred = self.clamp(self.preferred_opacity().await);
        let Some(window) = resolve_active_window(&self.client).await else {
            return StatusInfo {
                window: None,
                opacity: None,
                state: None,
                preferred,
            };
        };

        let opacity = self.client.get_opacity(&window).await;
        StatusInfo {
            window: Some(window.to_string()),
            opacity: Some(opacity),
            state: Some(window_state(opacity)),
            preferred,
        }
    }
}
