//! Self-driving retryable action queue
//!
//! Items run one at a time on a spawned driver task. A failed item is put
//! back at the tail of the queue as a fresh copy with its attempt count
//! incremented, until its attempt limit is reached. When the queue is empty
//! the driver resolves the completion signal exactly once.

use crate::QueueError;
use futures_util::future::BoxFuture;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A shareable zero-argument async action
pub type Action<T> = Arc<dyn Fn() -> BoxFuture<'static, crate::Result<T>> + Send + Sync>;

/// One unit of work in the queue
///
/// Items are immutable; a retry is a new item produced by [`ActionQueueItem::retried`].
pub struct ActionQueueItem<T> {
    pub id: String,
    /// Attempts already made before this one
    pub attempts_made: u32,
    pub attempts_limit: u32,
    action: Action<T>,
}

impl<T> ActionQueueItem<T> {
    pub fn new<F, Fut>(id: impl Into<String>, attempts_limit: u32, action: F) -> Self
    where
        T: 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        Self {
            id: id.into(),
            attempts_made: 0,
            attempts_limit,
            action: Arc::new(move || -> BoxFuture<'static, crate::Result<T>> { Box::pin(action()) }),
        }
    }

    /// Returns a copy of this item with one more attempt recorded
    pub fn retried(&self) -> Self {
        Self {
            id: self.id.clone(),
            attempts_made: self.attempts_made + 1,
            attempts_limit: self.attempts_limit,
            action: Arc::clone(&self.action),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.attempts_limit
    }
}

impl<T> fmt::Debug for ActionQueueItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionQueueItem")
            .field("id", &self.id)
            .field("attempts_made", &self.attempts_made)
            .field("attempts_limit", &self.attempts_limit)
            .finish_non_exhaustive()
    }
}

/// A successfully completed action
#[derive(Debug, Clone, PartialEq)]
pub struct Completed<T> {
    pub id: String,
    /// Failed attempts before the successful one
    pub attempts_made: u32,
    pub output: T,
}

/// An action that was given up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedAction {
    pub id: String,
    /// Attempts actually made for this action
    pub attempts: u32,
    pub last_error: String,
}

/// Everything the queue produced, in completion order
#[derive(Debug)]
pub struct QueueOutcome<T> {
    pub completed: Vec<Completed<T>>,
    pub dropped: Vec<DroppedAction>,
    /// Total attempts across all items
    pub attempts: u32,
}

impl<T> QueueOutcome<T> {
    pub fn outputs(self) -> Vec<T> {
        self.completed.into_iter().map(|c| c.output).collect()
    }

    pub fn dropped_ids(&self) -> Vec<&str> {
        self.dropped.iter().map(|d| d.id.as_str()).collect()
    }
}

/// FIFO queue of retryable actions
pub struct ActionQueue<T> {
    items: VecDeque<ActionQueueItem<T>>,
}

impl<T> Default for ActionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ActionQueue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, item: ActionQueueItem<T>) {
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Send + 'static> ActionQueue<T> {
    /// Starts the driver task and returns a handle to await completion
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> QueueHandle<T> {
        let (resolver, receiver) = oneshot::channel();
        tracing::debug!("Starting action queue with {} item(s)", self.items.len());

        let driver = Driver {
            queue: self.items,
            completed: Vec::new(),
            dropped: Vec::new(),
            attempts: 0,
            resolver: Some(resolver),
        };

        let task = tokio::spawn(async move {
            if let Err(e) = driver.run().await {
                tracing::error!("Action queue driver failed: {}", e);
            }
        });

        QueueHandle { receiver, task }
    }
}

/// Handle to a running queue
pub struct QueueHandle<T> {
    receiver: oneshot::Receiver<QueueOutcome<T>>,
    task: JoinHandle<()>,
}

impl<T> QueueHandle<T> {
    /// Waits until the queue has drained
    ///
    /// # Errors
    ///
    /// * `QueueError::DriverPanicked` - the driver stopped without resolving
    pub async fn wait(self) -> Result<QueueOutcome<T>, QueueError> {
        let outcome = self.receiver.await.map_err(|_| QueueError::DriverPanicked)?;
        if let Err(e) = self.task.await {
            tracing::debug!("Action queue driver did not shut down cleanly: {}", e);
        }
        Ok(outcome)
    }
}

struct Driver<T> {
    queue: VecDeque<ActionQueueItem<T>>,
    completed: Vec<Completed<T>>,
    dropped: Vec<DroppedAction>,
    attempts: u32,
    resolver: Option<oneshot::Sender<QueueOutcome<T>>>,
}

impl<T> Driver<T> {
    async fn run(mut self) -> Result<(), QueueError> {
        while let Some(item) = self.queue.pop_front() {
            self.kick_off(item).await;
        }
        self.resolve()
    }

    async fn kick_off(&mut self, item: ActionQueueItem<T>) {
        if item.is_exhausted() {
            tracing::warn!(
                "Skipping action {}: attempt limit of {} already reached",
                item.id,
                item.attempts_limit
            );
            self.dropped.push(DroppedAction {
                id: item.id,
                attempts: item.attempts_made,
                last_error: "attempt limit reached".to_string(),
            });
            return;
        }

        self.attempts += 1;
        tracing::debug!(
            "Running action {} (attempt {} of {})",
            item.id,
            item.attempts_made + 1,
            item.attempts_limit
        );

        match (item.action)().await {
            Ok(output) => self.completed.push(Completed {
                id: item.id,
                attempts_made: item.attempts_made,
                output,
            }),
            Err(e) if item.attempts_made + 1 < item.attempts_limit => {
                tracing::info!(
                    "Action {} failed (attempt {} of {}), requeueing: {}",
                    item.id,
                    item.attempts_made + 1,
                    item.attempts_limit,
                    e
                );
                self.queue.push_back(item.retried());
            }
            Err(e) => {
                tracing::warn!(
                    "Action {} failed after {} attempt(s), dropping: {}",
                    item.id,
                    item.attempts_made + 1,
                    e
                );
                self.dropped.push(DroppedAction {
                    id: item.id,
                    attempts: item.attempts_made + 1,
                    last_error: e.to_string(),
                });
            }
        }
    }

    fn resolve(&mut self) -> Result<(), QueueError> {
        let resolver = self.resolver.take().ok_or(QueueError::MissingResolver)?;

        let outcome = QueueOutcome {
            completed: std::mem::take(&mut self.completed),
            dropped: std::mem::take(&mut self.dropped),
            attempts: self.attempts,
        };
        tracing::debug!(
            "Action queue drained: {} completed, {} dropped, {} attempt(s)",
            outcome.completed.len(),
            outcome.dropped.len(),
            outcome.attempts
        );

        if resolver.send(outcome).is_err() {
            tracing::debug!("Action queue handle was dropped before completion");
        }
        Ok(())
    }
}
