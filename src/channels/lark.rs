//! Lark (Feishu) custom-bot webhook adapter.
//!
//! Signature verification follows the custom-bot scheme: HMAC-SHA256 with
//! the key `"{timestamp}\n{secret}"` over an empty input, base64 encoded,
//! carried in the request body together with the second-resolution
//! timestamp.

use crate::channels::post_json;
use crate::config::LarkConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const CHANNEL_TYPE: &str = "lark";

type HmacSha256 = Hmac<Sha256>;

/// Computes the custom-bot body signature for the given timestamp.
fn sign(secret: &str, timestamp: i64) -> String {
    let key = format!("{}\n{}", timestamp, secret);
    let mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    BASE64.encode(mac.finalize().into_bytes())
}

#[derive(Serialize)]
struct BotMessage {
    timestamp: String,
    sign: String,
    msg_type: String,
    content: BotContent,
}

#[derive(Serialize)]
struct BotContent {
    text: String,
}

#[derive(Deserialize)]
struct BotResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Sends text messages to a Lark custom bot webhook.
pub struct LarkSender {
    config: LarkConfig,
    client: reqwest::Client,
}

impl LarkSender {
    pub fn new(config: LarkConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChannelSender for LarkSender {
    async fn send(&self, _to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let timestamp = Utc::now().timestamp();
        let signature = if self.config.secret.is_empty() {
            String::new()
        } else {
            sign(&self.config.secret, timestamp)
        };

        let message = BotMessage {
            timestamp: timestamp.to_string(),
            sign: signature,
            msg_type: self.config.msg_type.clone(),
            content: BotContent {
                text: format!("{}\n{}", title, content),
            },
        };

        let body = post_json(&self.client, &self.config.webhook_url, &message, None).await?;
        let response: BotResponse =
            serde_json::from_str(&body).context("unparseable lark response")?;
        if response.code != 0 {
            bail!("msg: {} code: {}", response.msg, response.code);
        }
        Ok(result.completed())
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
