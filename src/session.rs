use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::types::Identity;

/// Application-level ceiling on session age.
///
/// Enforced independently of whatever lifetime the identity provider attaches
/// to the credential; the provider's own refresh may keep the credential
/// valid far longer.
pub const SESSION_CEILING: Duration = Duration::hours(24);

/// A time-bounded authenticated credential tied to an [`Identity`].
///
/// Replaced wholesale on every auth event, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Credential lifetime reported by the provider, in seconds.
    /// Informational: [`SESSION_CEILING`] applies regardless.
    #[serde(default)]
    pub provider_expires_in: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl Session {
    /// True once the session has been alive for [`SESSION_CEILING`] or longer.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now - self.issued_at >= SESSION_CEILING
    }
}

type SessionCallback = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

/// Holds the current session. Single source of truth for auth state.
///
/// At most one session is current at a time; `None` means signed out. The
/// store has exactly one writer path (the auth controller and the expiry
/// monitor); everyone else observes through [`SessionStore::subscribe`].
#[derive(Default)]
pub struct SessionStore {
    current: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<(u64, SessionCallback)>>,
    next_subscriber: AtomicU64,
    resolved: AtomicBool,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the current session (`None` = signed out).
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.lock().expect("session lock").clone()
    }

    /// Identity of the current session, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.current
            .lock()
            .expect("session lock")
            .as_ref()
            .map(|session| session.identity.clone())
    }

    /// False until the first `replace` resolves the initial auth state.
    /// Route guards must not redirect while this is false.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Replace the current session and notify subscribers.
    pub fn replace(&self, session: Option<Session>) {
        *self.current.lock().expect("session lock") = session.clone();
        self.resolved.store(true, Ordering::Release);
        self.notify_subscribers(session.as_ref());
    }

    /// Atomically remove the current session if it is expired at `now`.
    ///
    /// Returns the removed session, or `None` when the store was already
    /// empty or the session is still live. Concurrent expiry detections thus
    /// converge: exactly one caller takes the session, the rest no-op.
    pub(crate) fn take_expired(&self, now: OffsetDateTime) -> Option<Session> {
        let taken = {
            let mut guard = self.current.lock().expect("session lock");
            if guard.as_ref().is_some_and(|session| session.is_expired_at(now)) {
                guard.take()
            } else {
                None
            }
        };
        if taken.is_some() {
            self.notify_subscribers(None);
        }
        taken
    }

    /// Register a session-change callback. The callback receives the new
    /// session snapshot on every replace. Dropping the returned handle (or
    /// calling [`SubscriptionHandle::unsubscribe`]) deregisters it.
    #[must_use]
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("subscriber lock")
            .push((id, Arc::new(callback)));
        SubscriptionHandle {
            id,
            store: Arc::downgrade(self),
        }
    }

    fn notify_subscribers(&self, session: Option<&Session>) {
        // Snapshot outside the lock so a callback may subscribe/unsubscribe.
        let callbacks: Vec<SessionCallback> = self
            .subscribers
            .lock()
            .expect("subscriber lock")
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(session);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .expect("subscriber lock")
            .retain(|(subscriber, _)| *subscriber != id);
    }
}

/// Deregisters its session-change callback when dropped, so unmounted views
/// never receive stale updates.
pub struct SubscriptionHandle {
    id: u64,
    store: Weak<SessionStore>,
}

impl SubscriptionHandle {
    /// Explicitly deregister (equivalent to dropping the handle).
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}
