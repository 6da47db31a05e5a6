//! Threshold-based notification events and the sinks that receive them.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};
use uuid::Uuid;
use vigil_core::{AggregatedResult, NotificationPolicy};

/// Emitted when a result crosses the configured thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Unique event id
    pub id: Uuid,
    /// When the event was raised
    pub timestamp: DateTime<Utc>,
    /// File the result belongs to
    pub file_path: String,
    /// Error and critical issues in the result
    pub error_count: usize,
    /// Warning issues in the result
    pub warning_count: usize,
    /// Overall score of the result
    pub score: u8,
    /// Channels the external transport should deliver to
    pub channels: Vec<String>,
}

impl NotificationEvent {
    /// Builds the event for `result` if `policy` says it should be raised.
    pub fn evaluate(policy: &NotificationPolicy, result: &AggregatedResult) -> Option<Self> {
        if !policy.enabled {
            return None;
        }
        let thresholds = policy.thresholds;
        let crossed = result.total_errors >= thresholds.error
            || result.total_warnings >= thresholds.warning;
        crossed.then(|| Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            file_path: result.metadata.file_path.clone(),
            error_count: result.total_errors,
            warning_count: result.total_warnings,
            score: result.overall_score,
            channels: policy.channels.clone(),
        })
    }
}

/// Receives notification events. Delivery is up to the implementation.
pub trait NotificationSink: Send + Sync {
    /// Handles one event.
    fn notify(&self, event: &NotificationEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, event: &NotificationEvent) {
        info!(
            id = %event.id,
            file = %event.file_path,
            errors = event.error_count,
            warnings = event.warning_count,
            score = event.score,
            channels = ?event.channels,
            "Compliance thresholds crossed"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl CollectingNotifier {
    /// Create a new, empty collecting notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected events.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for CollectingNotifier {
    fn notify(&self, event: &NotificationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards events to an external transport over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<NotificationEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier sending on `sender`.
    pub fn new(sender: UnboundedSender<NotificationEvent>) -> Self {
        Self { sender }
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, event: &NotificationEvent) {
        if self.sender.send(event.clone()).is_err() {
            warn!(id = %event.id, "Notification receiver dropped, event discarded");
        }
    }
}
