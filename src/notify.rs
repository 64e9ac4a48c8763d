use std::sync::Mutex;

/// Weight of a user-facing notification.
///
/// `Info` covers expected lifecycle events (signed out, session expired);
/// `Error` is reserved for operations that actually failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A single user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

impl Notification {
    #[must_use]
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            title: title.into(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Sink for user-facing notifications, injected into every controller.
///
/// Hosts route these to whatever surface they render (toasts, status bar);
/// tests assert on them directly.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Default notifier: forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => {
                tracing::error!(title = %notification.title, "{}", notification.body);
            }
            Severity::Info | Severity::Success => {
                tracing::info!(title = %notification.title, "{}", notification.body);
            }
        }
    }
}

/// Collects notifications in memory. Useful for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything notified so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().expect("notifier lock").clone()
    }

    /// Remove and return everything notified so far.
    #[must_use]
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().expect("notifier lock"))
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.entries.lock().expect("notifier lock").push(notification);
    }
}
