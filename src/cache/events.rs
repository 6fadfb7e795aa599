//! Cache observability side channel.
//!
//! Subscribers receive a [`CacheEvent`] for every cache decision. Publishing
//! never blocks and never fails the query that triggered it: with no
//! subscribers, or with a lagging subscriber, events are dropped.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::task::Task;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Hit {
        key: String,
        task: Task,
        result: Value,
    },
    Miss {
        key: String,
        task: Task,
    },
    Put {
        key: String,
        task: Task,
        result: Value,
    },
    /// Store or TTL update failed; the query itself still succeeded.
    WriteFailed {
        key: String,
        task: Task,
        error: String,
    },
}

impl CacheEvent {
    pub fn key(&self) -> &str {
        match self {
            CacheEvent::Hit { key, .. }
            | CacheEvent::Miss { key, .. }
            | CacheEvent::Put { key, .. }
            | CacheEvent::WriteFailed { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Put { .. } => "put",
            CacheEvent::WriteFailed { .. } => "write_failed",
        }
    }
}

#[derive(Clone)]
pub struct CacheEvents {
    sender: broadcast::Sender<CacheEvent>,
}

impl CacheEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: CacheEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl Default for CacheEvents {
    fn default() -> Self {
        Self::new()
    }
}
