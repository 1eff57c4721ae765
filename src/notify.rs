//! Transient user notices
//!
//! Every surfaced error and every notable success is published here, the way a
//! web front end would raise a toast. Subscribers that fall behind lose the
//! oldest notices; nothing blocks on a slow consumer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::CounterError;

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    /// Publish an error notice for a failed action
    pub fn failure(&self, action: &str, err: &CounterError) {
        self.error(format!("{} failed: {}", action, err));
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        // no subscribers is fine
        let _ = self.sender.send(Notice {
            level,
            message,
            at: Utc::now(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
