//! Deferred startup action

use crate::controller::OpacityController;
use crate::store::PreferenceStore;
use crate::xprop::CommandRunner;
use std::sync::Arc;
use std::time::Duration;

/// Apply the preferred opacity to the focused window once, after `delay`
///
/// The delay lets the session settle so the focused window is the one the
/// user is looking at. The task runs to completion once spawned.
pub fn spawn_startup<R, S>(
    controller: Arc<OpacityController<R, S>>,
    delay: Duration,
) -> tokio::task::JoinHandle<()>
where
    R: CommandRunner + 'static,
    S: PreferenceStore + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::debug!("Applying startup opacity");
        match controller.apply_preferred().await {
            Some(applied) => tracing::info!(
                "Startup opacity {:.2} applied to {}",
                applied.opacity,
                applied.window
            ),
            None => tracing::debug!("No active window at startup"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use crate::testing::FakeXprop;
    use crate::xprop::XpropClient;

    #[tokio::test(start_paused = true)]
    async fn test_applies_once_after_delay() {
        let fake = FakeXprop::new().with_active("0x2400002");
        let controller = Arc::new(OpacityController::new(
            Config::default(),
            XpropClient::new(fake.clone()),
            MemoryStore::with_preferred(0.7),
        ));

        let handle = spawn_startup(controller, Duration::from_millis(1500));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fake.write_count(), 0);

        handle.await.unwrap();
        assert_eq!(fake.write_count(), 1);
        assert!((fake.level("0x2400002").unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_at_startup() {
        let fake = FakeXprop::new();
        let store = MemoryStore::new();
        let controller = Arc::new(OpacityController::new(
            Config::default(),
            XpropClient::new(fake.clone()),
            store.clone(),
        ));

        spawn_startup(controller, Duration::from_millis(1500))
            .await
            .unwrap();
        assert_eq!(fake.write_count(), 0);
        assert_eq!(store.saves(), 0);
    }
}
