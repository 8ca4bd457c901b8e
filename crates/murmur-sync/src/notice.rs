//! Transient user-visible notices.
//!
//! Failed optimistic mutations are never fatal; they end up here so a UI can
//! show a short message (a toast) and move on.

use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the notice channel; slow subscribers lose the oldest notices.
const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short message meant for the person using the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Broadcast bus for [`Notice`]s. Cloning shares the bus.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: broadcast::Sender<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Having no subscribers is fine.
    pub fn publish(&self, notice: Notice) {
        trace!(?notice, "Publishing notice");
        let _ = self.tx.send(notice);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notice::error(message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notice::success(message));
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_notices() {
        let notices = Notices::new();
        let mut rx = notices.subscribe();
        notices.error("Could not like post");
        assert_eq!(rx.try_recv().unwrap(), Notice::error("Could not like post"));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        Notices::new().success("ok");
    }
}
