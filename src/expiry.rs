use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;

use crate::notify::{Notification, Notifier};
use crate::provider::IdentityProvider;
use crate::session::SessionStore;

/// Default cadence of the session-ceiling check.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic enforcement of the application session ceiling.
///
/// Runs for the lifetime of the owning context. The task is aborted when the
/// monitor is dropped, so remounts never leak duplicate checks.
pub struct ExpiryMonitor {
    task: JoinHandle<()>,
}

impl ExpiryMonitor {
    /// Spawn the repeating check. The first check runs immediately (the
    /// initial-load check), then every `interval`. Requires a Tokio runtime.
    #[must_use]
    pub fn spawn<P, N>(
        store: Arc<SessionStore>,
        provider: Arc<P>,
        notifier: Arc<N>,
        interval: Duration,
    ) -> Self
    where
        P: IdentityProvider,
        N: Notifier,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                check(
                    &store,
                    provider.as_ref(),
                    notifier.as_ref(),
                    OffsetDateTime::now_utc(),
                )
                .await;
            }
        });
        Self { task }
    }
}

impl Drop for ExpiryMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One expiry check against the store.
///
/// An empty store or a live session is a no-op. An expired session is
/// removed atomically before the remote sign-out, so a racing detection sees
/// the empty store and becomes a no-op; the "session expired" notification
/// is therefore emitted exactly once per expiry.
pub(crate) async fn check<P, N>(
    store: &SessionStore,
    provider: &P,
    notifier: &N,
    now: OffsetDateTime,
) where
    P: IdentityProvider,
    N: Notifier,
{
    let Some(session) = store.take_expired(now) else {
        return;
    };
    tracing::info!(identity = %session.identity.id, "session exceeded ceiling, signing out");
    if let Err(error) = provider.sign_out(&session.access_token).await {
        tracing::warn!(error = %error, "remote sign-out failed during expiry");
    }
    notifier.notify(Notification::info(
        "Session expired",
        "Your session has expired. Please sign in again.",
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemoryNotifier, Severity};
    use crate::testutil::{ScriptedProvider, fresh_session};
    use std::sync::atomic::Ordering;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-03-01 09:00 UTC);

    #[tokio::test]
    async fn tick_on_empty_store_is_a_noop() {
        let store = SessionStore::new();
        let provider = ScriptedProvider::default();
        let notifier = MemoryNotifier::new();

        check(&store, &provider, &notifier, NOW).await;

        assert_eq!(provider.sign_out_calls.load(Ordering::SeqCst), 0);
        assert!(notifier.entries().is_empty());
    }

    #[tokio::test]
    async fn live_session_is_left_alone() {
        let store = SessionStore::new();
        store.replace(Some(fresh_session(NOW - time::Duration::hours(1))));
        let provider = ScriptedProvider::default();
        let notifier = MemoryNotifier::new();

        check(&store, &provider, &notifier, NOW).await;

        assert!(store.current().is_some());
        assert!(notifier.entries().is_empty());
    }

    #[tokio::test]
    async fn expired_session_is_cleared_and_notified_exactly_once() {
        let store = SessionStore::new();
        store.replace(Some(fresh_session(NOW - time::Duration::hours(25))));
        let provider = ScriptedProvider::default();
        let notifier = MemoryNotifier::new();

        check(&store, &provider, &notifier, NOW).await;
        // Second tick against the now-empty store: idempotent no-op.
        check(&store, &provider, &notifier, NOW).await;

        assert!(store.current().is_none());
        assert_eq!(provider.sign_out_calls.load(Ordering::SeqCst), 1);

        let entries = notifier.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[0].title, "Session expired");
    }

    #[tokio::test]
    async fn remote_failure_never_blocks_the_local_sign_out() {
        let store = SessionStore::new();
        store.replace(Some(fresh_session(NOW - time::Duration::days(2))));
        let provider = ScriptedProvider::default();
        provider.fail_sign_out();
        let notifier = MemoryNotifier::new();

        check(&store, &provider, &notifier, NOW).await;

        assert!(store.current().is_none());
        assert_eq!(notifier.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_task_enforces_the_ceiling() {
        let store = SessionStore::new();
        store.replace(Some(fresh_session(
            OffsetDateTime::now_utc() - time::Duration::hours(25),
        )));
        let provider = Arc::new(ScriptedProvider::default());
        let notifier = Arc::new(MemoryNotifier::new());

        let monitor = ExpiryMonitor::spawn(
            Arc::clone(&store),
            Arc::clone(&provider),
            Arc::clone(&notifier),
            CHECK_INTERVAL,
        );
        // The first tick fires immediately; yield so the task runs.
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(store.current().is_none());
        assert_eq!(notifier.entries().len(), 1);
        drop(monitor);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_monitor_stops_checking() {
        let store = SessionStore::new();
        let provider = Arc::new(ScriptedProvider::default());
        let notifier = Arc::new(MemoryNotifier::new());

        let monitor = ExpiryMonitor::spawn(
            Arc::clone(&store),
            Arc::clone(&provider),
            Arc::clone(&notifier),
            CHECK_INTERVAL,
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(monitor);

        store.replace(Some(fresh_session(
            OffsetDateTime::now_utc() - time::Duration::hours(48),
        )));
        tokio::time::sleep(Duration::from_secs(180)).await;

        assert!(store.current().is_some());
        assert!(notifier.entries().is_empty());
    }
}
