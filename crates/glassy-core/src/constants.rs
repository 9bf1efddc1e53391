//! Constants used throughout the opacity engine
//!
//! This module centralizes magic numbers for better maintainability.

use std::time::Duration;

/// Full scale of the `_NET_WM_WINDOW_OPACITY` CARDINAL
pub const MAX_OPACITY: f64 = u32::MAX as f64;

/// Levels below this are remembered as the preferred opacity
pub const PERSIST_THRESHOLD: f64 = 0.99;

/// Levels at or above this count as visible when toggling
pub const VISIBLE_THRESHOLD: f64 = 0.98;

/// Delay before the startup opacity is applied
pub const STARTUP_DELAY: Duration = Duration::from_millis(1500);

/// Upper bound on a single `xprop` invocation
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of log entries kept for `glassy logs`
pub const LOG_BUFFER_CAPACITY: usize = 1000;

/// Property holding a window's opacity
pub const OPACITY_ATOM: &str = "_NET_WM_WINDOW_OPACITY";

/// Root window property holding the focused window
pub const ACTIVE_WINDOW_ATOM: &str = "_NET_ACTIVE_WINDOW";
