//! The dispatch manager: fans one logical send out to every requested
//! channel in parallel, bounds concurrency, isolates per-channel failures
//! and collects one result per channel.

use crate::channels;
use crate::config::NotifyConfig;
use crate::core::{SendResult, SendResults};
use crate::factory::ChannelRegistry;
use crate::recipients::NotifyToIds;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

/// Request-level failures of [`Manager::send`]. Per-channel failures never
/// surface here; they are reported inside the returned [`SendResults`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no channels specified")]
    NoChannels,
}

/// The message to deliver. Mail-class channels receive `mail_body`, all
/// other channels receive `im_body`.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub title: String,
    pub mail_body: String,
    pub im_body: String,
}

/// Per-call send options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Channel tags to send through; empty means the manager's configured
    /// default list.
    pub channels: Vec<String>,
}

/// Dispatches notifications to the configured channels.
///
/// Cloning is cheap; the configuration and registry are shared.
#[derive(Clone)]
pub struct Manager {
    config: Arc<NotifyConfig>,
    registry: Arc<ChannelRegistry>,
    max_concurrency: usize,
}

impl Manager {
    /// Creates a manager over `config` with the built-in channel
    /// registry. `max_concurrency` bounds the number of simultaneously
    /// in-flight channel sends; `0` means one worker per channel
    /// (unbounded in effect).
    pub fn new(config: NotifyConfig, max_concurrency: usize) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ChannelRegistry::default()),
            max_concurrency,
        }
    }

    /// Replaces the channel registry, e.g. to add a custom provider.
    pub fn with_registry(mut self, registry: ChannelRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Sends one message through every effective channel concurrently and
    /// returns one result per channel, in completion order.
    ///
    /// The effective channel list is `opts.channels` when non-empty, else
    /// the configured default list. An empty effective list is the only
    /// whole-call error; everything that goes wrong inside a single
    /// channel (missing configuration, transport failure, even a panic in
    /// the adapter) is reported as that channel's failed result.
    pub async fn send(
        &self,
        to: &NotifyToIds,
        msg: &Message,
        opts: &SendOptions,
    ) -> Result<SendResults, DispatchError> {
        let channel_list: Vec<String> = if opts.channels.is_empty() {
            self.config.channels.clone()
        } else {
            opts.channels.clone()
        };
        if channel_list.is_empty() {
            return Err(DispatchError::NoChannels);
        }

        let permits = if self.max_concurrency == 0 {
            channel_list.len()
        } else {
            self.max_concurrency
        };
        let semaphore = Arc::new(Semaphore::new(permits));
        let (result_tx, mut result_rx) = mpsc::channel::<SendResult>(channel_list.len());
        let mut workers = JoinSet::new();

        debug!(
            channels = ?channel_list,
            permits,
            "dispatching notification"
        );

        for channel in channel_list {
            let manager = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let result_tx = result_tx.clone();
            let recipients = to.channel_addresses(&channel);
            let title = msg.title.clone();
            let body = if channel == channels::email::CHANNEL_TYPE {
                msg.mail_body.clone()
            } else {
                msg.im_body.clone()
            };

            workers.spawn(async move {
                // One permit per in-flight channel attempt; dropped on
                // every exit path, including the panic-recovery one.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("dispatch semaphore closed");

                let attempt = AssertUnwindSafe(
                    manager.send_to_channel(&channel, recipients, &title, &body),
                )
                .catch_unwind()
                .await;
                let result = match attempt {
                    Ok(result) => result,
                    Err(panic) => {
                        let reason = panic_message(panic);
                        error!(channel = %channel, panic = %reason, "channel sender panicked");
                        SendResult::pending(&channel)
                            .failed(format!("channel panicked: {}", reason))
                    }
                };
                let _ = result_tx.send(result).await;
            });
        }
        drop(result_tx);

        // Join barrier: every worker finishes before the queue is drained.
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                error!(%error, "dispatch worker task failed");
            }
        }

        let mut results = Vec::new();
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        Ok(SendResults(results))
    }

    /// Runs a single channel attempt and always produces a result, never
    /// an error: recipient filtering, sender construction via the
    /// registry, the send itself, and end-to-end timing.
    #[instrument(skip(self, to, title, content))]
    pub async fn send_to_channel(
        &self,
        channel: &str,
        to: Vec<String>,
        title: &str,
        content: &str,
    ) -> SendResult {
        let to: Vec<String> = to.into_iter().filter(|t| !t.trim().is_empty()).collect();
        if to.is_empty() {
            warn!(channel, "no recipients for channel, skipping send");
            return SendResult::pending(channel)
                .failed(format!("channel {} has no recipients", channel));
        }

        let shell = SendResult::pending(channel);
        let sender = match self.registry.build(channel, &self.config) {
            Ok(sender) => sender,
            Err(error) => {
                warn!(channel, %error, "cannot build channel sender");
                return shell.failed(error);
            }
        };

        match sender.send(&to, title, content).await {
            Ok(mut result) => {
                // End-to-end cost as measured here, including connection
                // setup, overrides whatever the adapter recorded.
                result.cost_ms = shell.elapsed_ms();
                debug!(channel, cost_ms = result.cost_ms, "channel send succeeded");
                result
            }
            Err(error) => {
                warn!(channel, error = %format!("{:#}", error), "channel send failed");
                shell.failed(format!("{:#}", error))
            }
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
