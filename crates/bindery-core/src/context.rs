//! Request context types.
//!
//! The [`RequestContext`] is the first argument of every service method. It
//! carries the request id, the method name, timing, an optional deadline and
//! a [`Cancellation`] handle that the server triggers on shutdown.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use bindery_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    ///
    /// This is useful when reusing the `x-request-id` header of an inbound
    /// request.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a request id from its hyphenated or simple text form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// A shared, idempotent cancellation flag.
///
/// Clones observe the same flag. Once triggered it stays triggered.
///
/// # Example
///
/// ```rust
/// use bindery_core::Cancellation;
///
/// let cancellation = Cancellation::new();
/// let observer = cancellation.clone();
///
/// cancellation.trigger();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    triggered: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    /// Creates a new, untriggered cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the cancellation, waking every task waiting on it.
    ///
    /// Calling this multiple times is safe.
    pub fn trigger(&self) {
        if self
            .inner
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` if the cancellation has been triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Completes once the cancellation is triggered.
    ///
    /// Completes immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent trigger is not lost.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Per-request context passed to service methods.
///
/// Handlers are free to ignore the deadline and cancellation; nothing in the
/// decode/encode path enforces them.
///
/// # Example
///
/// ```
/// use bindery_core::RequestContext;
/// use std::time::Duration;
///
/// let ctx = RequestContext::new()
///     .with_method("GetUser")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(ctx.method(), Some("GetUser"));
/// assert!(ctx.deadline().is_some());
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Option<Arc<str>>,
    started_at: Instant,
    deadline: Option<Instant>,
    cancellation: Cancellation,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new request context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            method: None,
            started_at: Instant::now(),
            deadline: None,
            cancellation: Cancellation::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the name of the method being invoked, if known.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns a new context with the specified method name.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<Arc<str>>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Returns the instant the request started processing.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the deadline, if one is set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns a new context with the specified deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns a new context whose deadline is `timeout` after its start.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = self.started_at + timeout;
        self.with_deadline(deadline)
    }

    /// Returns the time left before the deadline.
    ///
    /// `None` means no deadline; a passed deadline yields `Duration::ZERO`.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns the cancellation handle.
    #[must_use]
    pub const fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Returns a new context observing the given cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns `true` once cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled() || self.remaining() == Some(Duration::ZERO)
    }

    /// Completes once cancelled or past the deadline.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.cancellation.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancellation.cancelled().await,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_is_v7() {
        let id = RequestId::new();
        assert_eq!(id.as_uuid().get_version_num(), 7);
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn test_request_id_parse() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("not-a-uuid"), None);
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_request_context_defaults() {
        let ctx = RequestContext::new();
        assert!(ctx.method().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_cancellation_is_shared_and_idempotent() {
        let cancellation = Cancellation::new();
        let ctx = RequestContext::new().with_cancellation(cancellation.clone());

        cancellation.trigger();
        cancellation.trigger();
        assert!(ctx.is_cancelled());
        assert!(ctx.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_completes_after_trigger() {
        let cancellation = Cancellation::new();
        let waiter = {
            let cancellation = cancellation.clone();
            tokio::spawn(async move { cancellation.cancelled().await })
        };

        tokio::task::yield_now().await;
        cancellation.trigger();
        waiter.await.expect("waiter should finish");
    }

    #[tokio::test]
    async fn test_cancelled_when_already_triggered() {
        let cancellation = Cancellation::new();
        cancellation.trigger();
        tokio_test::assert_ready!(tokio_test::task::spawn(cancellation.cancelled()).poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());

        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ctx.elapsed() >= Duration::from_millis(50));
    }
}
