//! Core contract types shared by the dispatch manager and the provider
//! adapters.
//!
//! This module defines the `ChannelSender` trait every adapter implements,
//! the per-attempt `SendResult` record and the `SendResults` collection
//! with its aggregation views.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provider adapter capable of delivering one message to one channel.
///
/// Implementations are stateless per call: the dispatch manager constructs
/// a fresh sender for every attempt and discards it afterwards.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Delivers the message to the channel-specific recipient list.
    ///
    /// A transport-level failure (connection refused, provider error code,
    /// malformed response) is returned as an `Err`; the manager converts it
    /// into a failed [`SendResult`] for this channel.
    async fn send(&self, to: &[String], title: &str, content: &str) -> Result<SendResult>;

    /// Stable channel tag, e.g. `"email"` or `"sms"`.
    fn channel_type(&self) -> &'static str;
}

impl std::fmt::Debug for dyn ChannelSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSender")
            .field("channel_type", &self.channel_type())
            .finish()
    }
}

/// The outcome of a single per-channel delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendResult {
    /// Channel tag this result belongs to.
    pub channel_type: String,
    /// Whether the delivery attempt succeeded.
    pub success: bool,
    /// Process-local identifier, unique per attempt, assigned even on
    /// failure.
    pub message_id: String,
    /// Provider-returned message identifier, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_msg_id: Option<String>,
    /// Failure reason; `None` exactly when `success` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp at the start of the attempt.
    pub send_time: DateTime<Utc>,
    /// Elapsed wall time of the attempt in milliseconds.
    pub cost_ms: u64,
}

impl SendResult {
    /// Creates the result shell for a new attempt: not yet successful, a
    /// fresh `message_id`, `send_time` at the call.
    pub fn pending(channel_type: &str) -> Self {
        Self {
            channel_type: channel_type.to_string(),
            success: false,
            message_id: Uuid::new_v4().to_string(),
            channel_msg_id: None,
            error: None,
            send_time: Utc::now(),
            cost_ms: 0,
        }
    }

    /// Finalizes the shell as a success: sets the provider message id and
    /// the elapsed time since `send_time`.
    pub fn completed(mut self) -> Self {
        self.success = true;
        self.error = None;
        self.channel_msg_id = Some(Uuid::new_v4().to_string());
        self.cost_ms = self.elapsed_ms();
        self
    }

    /// Finalizes the shell as a failure with the given error text.
    pub fn failed(mut self, error: impl std::fmt::Display) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self.cost_ms = self.elapsed_ms();
        self
    }

    /// Milliseconds elapsed since `send_time`, clamped to zero.
    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.send_time).num_milliseconds().max(0) as u64
    }
}

/// One result per attempted channel, in completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendResults(pub Vec<SendResult>);

impl SendResults {
    /// Success count, failure count and the comma-joined
    /// `"<channel>: <error>"` list for every failed entry (empty when
    /// nothing failed).
    pub fn statistical_result(&self) -> (usize, usize, String) {
        let mut success = 0;
        let mut failed = 0;
        let mut errors = Vec::new();
        for r in &self.0 {
            if r.success {
                success += 1;
            } else {
                failed += 1;
                if let Some(err) = &r.error {
                    errors.push(format!("{}: {}", r.channel_type, err));
                }
            }
        }
        (success, failed, errors.join(", "))
    }

    /// One-line human-readable summary, e.g.
    /// `"2 success, 1 failed: sms: channel sms is not configured"`.
    pub fn result_msg(&self) -> String {
        let (success, failed, combined) = self.statistical_result();
        if combined.is_empty() {
            format!("{} success, {} failed", success, failed)
        } else {
            format!("{} success, {} failed: {}", success, failed, combined)
        }
    }
}

impl std::ops::Deref for SendResults {
    type Target = Vec<SendResult>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<SendResult> for SendResults {
    fn from_iter<I: IntoIterator<Item = SendResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SendResults {
    type Item = SendResult;
    type IntoIter = std::vec::IntoIter<SendResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
