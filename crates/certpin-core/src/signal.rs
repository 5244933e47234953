//! One-shot result broadcast.
//!
//! [`SingleResultSignal`] stores the first result handed to
//! [`resolve`](SingleResultSignal::resolve) and returns it to every past
//! and future [`wait`](SingleResultSignal::wait). Later resolutions are
//! ignored. A signal built with
//! [`with_cancellation`](SingleResultSignal::with_cancellation) also
//! cancels its scope at the moment the result is stored, so other work
//! sharing that scope can stop early.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// First-write-wins result cell shared by producers and waiters.
///
/// Cloning is cheap and yields another handle to the same cell.
#[derive(Debug)]
pub struct SingleResultSignal<E> {
    inner: Arc<Inner<E>>,
}

#[derive(Debug)]
struct Inner<E> {
    slot: Mutex<Option<Result<(), E>>>,
    notify: Notify,
    scope: Option<CancellationToken>,
    waiters: AtomicUsize,
}

impl<E> Clone for SingleResultSignal<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone> Default for SingleResultSignal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> SingleResultSignal<E> {
    /// Create an unresolved signal with no linked scope
    #[must_use]
    pub fn new() -> Self {
        Self::with_scope(None)
    }

    /// Create a signal linked to a child of `parent`.
    ///
    /// The returned token is cancelled when the signal resolves, or when
    /// `parent` is cancelled. Cancelling it does not affect `parent`.
    #[must_use]
    pub fn with_cancellation(parent: &CancellationToken) -> (Self, CancellationToken) {
        let scope = parent.child_token();
        (Self::with_scope(Some(scope.clone())), scope)
    }

    fn with_scope(scope: Option<CancellationToken>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(None),
                notify: Notify::new(),
                scope,
                waiters: AtomicUsize::new(0),
            }),
        }
    }

    /// Store `result` unless a result is already stored.
    ///
    /// Returns true if this call's result is the one kept.
    pub fn resolve(&self, result: Result<(), E>) -> bool {
        {
            let mut slot = self
                .inner
                .slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
        }

        self.inner.notify.notify_waiters();
        if let Some(scope) = &self.inner.scope {
            scope.cancel();
        }
        true
    }

    /// The stored result, if any, without waiting
    #[must_use]
    pub fn peek(&self) -> Option<Result<(), E>> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true once a result is stored
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of tasks currently suspended in [`wait`](Self::wait)
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.inner.waiters.load(Ordering::Acquire)
    }

    /// Wait for the stored result. Returns immediately if already resolved.
    pub async fn wait(&self) -> Result<(), E> {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);

        let _waiting = WaiterGuard::register(&self.inner.waiters);
        loop {
            // Register interest before checking so a concurrent resolve
            // between the check and the await is not missed.
            notified.as_mut().enable();
            if let Some(result) = self.peek() {
                return result;
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

struct WaiterGuard<'a>(&'a AtomicUsize);

impl<'a> WaiterGuard<'a> {
    fn register(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
