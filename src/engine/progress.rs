use std::future::Future;

use log::debug;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::engine::models::OperationProgress;

const CHANNEL_CAPACITY: usize = 64;

/// Highest percentage shown while the operation's own call has not resolved yet.
pub const IN_FLIGHT_CEILING: f32 = 99.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressTopic {
    Translation,
    Updater,
}

impl ProgressTopic {
    pub const fn event_name(self) -> &'static str {
        match self {
            ProgressTopic::Translation => "translation-progress",
            ProgressTopic::Updater => "updater-progress",
        }
    }
}

/// Out-of-band `(message, percent)` channels shared by the backend and the controllers.
#[derive(Clone)]
pub struct ProgressBridge {
    translation: broadcast::Sender<OperationProgress>,
    updater: broadcast::Sender<OperationProgress>,
}

impl ProgressBridge {
    pub fn new() -> Self {
        let (translation, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (updater, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            translation,
            updater,
        }
    }

    fn sender(&self, topic: ProgressTopic) -> &broadcast::Sender<OperationProgress> {
        match topic {
            ProgressTopic::Translation => &self.translation,
            ProgressTopic::Updater => &self.updater,
        }
    }

    pub fn emitter(&self, topic: ProgressTopic) -> ProgressEmitter {
        ProgressEmitter {
            topic,
            tx: self.sender(topic).clone(),
        }
    }

    /// Open a subscription; it is released when the returned value is dropped.
    pub fn subscribe(&self, topic: ProgressTopic) -> ProgressSubscription {
        debug!("progress: subscribed to {}", topic.event_name());
        ProgressSubscription {
            topic,
            rx: self.sender(topic).subscribe(),
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, topic: ProgressTopic) -> usize {
        self.sender(topic).receiver_count()
    }
}

impl Default for ProgressBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending half handed to the backend.
#[derive(Clone)]
pub struct ProgressEmitter {
    topic: ProgressTopic,
    tx: broadcast::Sender<OperationProgress>,
}

impl ProgressEmitter {
    /// Fire-and-forget; nobody listening is not an error.
    pub fn emit(&self, message: impl Into<String>, percent: f32) {
        let event = OperationProgress::new(message, percent);
        debug!(
            "{}: {:.1}% {}",
            self.topic.event_name(),
            event.percent,
            event.message
        );
        let _ = self.tx.send(event);
    }
}

pub struct ProgressSubscription {
    topic: ProgressTopic,
    rx: broadcast::Receiver<OperationProgress>,
}

impl ProgressSubscription {
    /// Next event, or `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<OperationProgress> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(
                        "progress: skipped {} stale events on {}",
                        skipped,
                        self.topic.event_name()
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        debug!("progress: unsubscribed from {}", self.topic.event_name());
    }
}

/// Await `operation` while forwarding progress events to `on_progress`.
///
/// The operation's own output is the only completion signal: events still queued
/// when it resolves are discarded together with the subscription.
pub async fn drive<T>(
    mut subscription: ProgressSubscription,
    operation: impl Future<Output = T>,
    mut on_progress: impl FnMut(OperationProgress),
) -> T {
    tokio::pin!(operation);
    loop {
        tokio::select! {
            biased;
            outcome = &mut operation => return outcome,
            Some(event) = subscription.next() => on_progress(event),
        }
    }
}

/// Folds raw events into a display value whose percentage never goes backwards.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    current: OperationProgress,
}

impl ProgressTracker {
    pub fn start(message: impl Into<String>) -> Self {
        Self {
            current: OperationProgress::new(message, 0.0),
        }
    }

    pub fn observe(&mut self, event: OperationProgress) -> &OperationProgress {
        if event.percent.is_finite() {
            let capped = event.percent.clamp(0.0, IN_FLIGHT_CEILING);
            self.current.percent = self.current.percent.max(capped);
        }
        if !event.message.is_empty() {
            self.current.message = event.message;
        }
        &self.current
    }

    pub fn current(&self) -> &OperationProgress {
        &self.current
    }
}
