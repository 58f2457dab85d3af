//! Response interception by registered predicate
//!
//! A browser session publishes every response it observes to its
//! `ResponseTap`. Callers register a predicate with [`ResponseTap::wait_for`]
//! *before* triggering navigation and get back a future that resolves to the
//! first matching response. The registration is detached as soon as it
//! matches.

use super::template::ObservedResponse;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Predicate = Box<dyn Fn(&ObservedResponse) -> bool + Send + Sync>;

struct Waiter {
    predicate: Predicate,
    sender: oneshot::Sender<ObservedResponse>,
}

/// Correlates published responses with pending waiters
#[derive(Clone, Default)]
pub struct ResponseTap {
    waiters: Arc<Mutex<Vec<Waiter>>>,
}

impl ResponseTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate and returns a future for its first match
    pub fn wait_for<F>(&self, predicate: F) -> PendingResponse
    where
        F: Fn(&ObservedResponse) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.lock().push(Waiter {
            predicate: Box::new(predicate),
            sender,
        });
        PendingResponse { receiver }
    }

    /// Delivers a response to every waiter whose predicate matches it
    ///
    /// Returns the number of waiters resolved. Waiters whose future has been
    /// dropped are discarded.
    pub fn publish(&self, response: &ObservedResponse) -> usize {
        let mut waiters = self.lock();
        let mut resolved = 0;

        let pending = std::mem::take(&mut *waiters);
        for waiter in pending {
            if waiter.sender.is_closed() {
                continue;
            }
            if (waiter.predicate)(response) {
                if waiter.sender.send(response.clone()).is_ok() {
                    resolved += 1;
                }
            } else {
                waiters.push(waiter);
            }
        }

        resolved
    }

    /// Ends the current navigation lifetime
    ///
    /// Every registered waiter is detached and its future resolves to `None`.
    pub fn end_navigation(&self) {
        let detached = std::mem::take(&mut *self.lock());
        if !detached.is_empty() {
            tracing::debug!("Navigation ended with {} unmatched waiter(s)", detached.len());
        }
    }

    /// Number of waiters still registered
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Waiter>> {
        self.waiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Future returned by [`ResponseTap::wait_for`]
///
/// Resolves to `Some(response)` on the first match, or `None` when the
/// navigation ended without one.
pub struct PendingResponse {
    receiver: oneshot::Receiver<ObservedResponse>,
}

impl Future for PendingResponse {
    type Output = Option<ObservedResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(Result::ok)
    }
}
