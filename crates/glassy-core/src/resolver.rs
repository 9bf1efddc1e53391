//! Focused window resolution

use crate::errors::ResolveError;
use crate::xprop::{CommandRunner, WindowHandle, XpropClient};

/// Resolve the focused window, or `None` if there is none
///
/// Failure here is an expected outcome (nothing focused, no display, no
/// `xprop`), so it is logged rather than returned.
pub async fn resolve_active_window<R: CommandRunner>(
    client: &XpropClient<R>,
) -> Option<WindowHandle> {
    match client.query_active_window().await {
        Ok(window) => {
            tracing::debug!("Active window: {}", window);
            Some(window)
        }
        Err(ResolveError::NoActiveWindow) => {
            tracing::debug!("No window has focus");
            None
        }
        Err(e) => {
            tracing::warn!("Failed to resolve active window: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeXprop;

    #[tokio::test]
    async fn test_resolves_focused_window() {
        let client = XpropClient::new(FakeXprop::new().with_active("0x4800003"));
        let window = resolve_active_window(&client).await;
        assert_eq!(window, Some(WindowHandle::new("0x4800003")));
    }

    #[tokio::test]
    async fn test_nothing_focused() {
        let client = XpropClient::new(FakeXprop::new());
        assert_eq!(resolve_active_window(&client).await, None);
    }

    #[tokio::test]
    async fn test_query_failure_is_none() {
        let fake = FakeXprop::new().with_active("0x4800003");
        fake.fail_query(true);
        let client = XpropClient::new(fake);
        assert_eq!(resolve_active_window(&client).await, None);
    }
}
