//! Outbound notifications
//!
//! Delivery is best-effort: a failed send is logged and never surfaces to
//! the caller, and dispatch always happens after the triggering write has
//! committed.

pub mod twilio;

use async_trait::async_trait;
use std::sync::Arc;

pub use twilio::TwilioNotifier;

/// One message for one contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub contact: String,
    pub message: String,
}

impl Notice {
    pub fn new(contact: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message; `true` when delivered (or deliberately skipped)
    async fn send(&self, contact: &str, message: &str) -> bool;
}

/// Send every notice, logging failures
pub async fn dispatch(notifier: &dyn Notifier, notices: Vec<Notice>) {
    for notice in notices {
        if !notifier.send(&notice.contact, &notice.message).await {
            tracing::warn!(contact = %notice.contact, "Notification not delivered");
        }
    }
}

/// Dispatch on a detached task so the request does not wait on the provider
pub fn spawn_dispatch(notifier: Arc<dyn Notifier>, notices: Vec<Notice>) {
    if notices.is_empty() {
        return;
    }
    tokio::spawn(async move {
        dispatch(notifier.as_ref(), notices).await;
    });
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every send; fails for contacts listed in `failing`
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notice>>,
        pub failing: Vec<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, contact: &str, message: &str) -> bool {
            self.sent.lock().await.push(Notice::new(contact, message));
            !self.failing.iter().any(|c| c == contact)
        }
    }
}
