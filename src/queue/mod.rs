//! Bounded-retry work queue for per-order follow-up fetches

mod action_queue;

pub use action_queue::{
    Action, ActionQueue, ActionQueueItem, Completed, DroppedAction, QueueHandle, QueueOutcome,
};
