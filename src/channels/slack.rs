//! Slack incoming-webhook adapter.
//!
//! Slack acknowledges a webhook post with the literal body `ok`; anything
//! else is treated as a failure and the body is surfaced in the error.

use crate::channels::post_json;
use crate::config::SlackConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const CHANNEL_TYPE: &str = "slack";

#[derive(Serialize)]
struct WebhookMessage {
    text: String,
}

/// Posts messages to a Slack incoming webhook.
pub struct SlackSender {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackSender {
    pub fn new(config: SlackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build slack http client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChannelSender for SlackSender {
    async fn send(&self, _to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let message = WebhookMessage {
            text: format!("{}\n{}", title, content),
        };
        let body = post_json(&self.client, &self.config.webhook_url, &message, None).await?;
        if body != "ok" {
            bail!("slack webhook rejected the message: {}", body);
        }
        Ok(result.completed())
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
