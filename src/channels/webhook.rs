//! Generic JSON webhook adapter.
//!
//! Posts `{to, title, content}` to a configured URL with optional extra
//! headers. The endpoint may answer with `{"success": bool, "message":
//! string}`; a 2xx body that does not parse as that contract is taken as
//! success, matching endpoints that reply with plain acknowledgements.

use crate::channels::post_json;
use crate::config::WebhookConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CHANNEL_TYPE: &str = "webhook";

#[derive(Serialize)]
struct WebhookMessage<'a> {
    to: &'a [String],
    title: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

/// Posts notification payloads to an arbitrary HTTP endpoint.
pub struct WebhookSender {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build webhook http client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(&self, to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let message = WebhookMessage { to, title, content };
        let body = post_json(
            &self.client,
            &self.config.url,
            &message,
            Some(&self.config.headers),
        )
        .await
        .context("failed to send webhook notification")?;

        match serde_json::from_str::<WebhookResponse>(&body) {
            // Endpoints that do not speak the contract still count as
            // delivered when they answer 2xx.
            Err(_) => Ok(result.completed()),
            Ok(response) if !response.success => {
                bail!("webhook endpoint returned failure: {}", response.message)
            }
            Ok(_) => Ok(result.completed()),
        }
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
