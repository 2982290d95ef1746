//! DingTalk robot webhook adapter.
//!
//! Supports the robot's "sign" security mode: a millisecond timestamp and
//! an HMAC-SHA256 signature are appended to the webhook URL as query
//! parameters. See the DingTalk custom-robot documentation.

use crate::channels::post_json;
use crate::config::DingTalkConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const CHANNEL_TYPE: &str = "dingding";

type HmacSha256 = Hmac<Sha256>;

/// Computes the robot URL signature for the given millisecond timestamp:
/// HMAC-SHA256 over `"{timestamp}\n{secret}"` keyed by the secret, base64
/// encoded, then URL-encoded.
fn sign(secret: &str, timestamp_ms: i64) -> String {
    let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(string_to_sign.as_bytes());
    let encoded = BASE64.encode(mac.finalize().into_bytes());
    urlencoding::encode(&encoded).into_owned()
}

#[derive(Serialize)]
struct RobotMessage<'a> {
    msgtype: &'a str,
    text: TextContent,
    at: At<'a>,
}

#[derive(Serialize)]
struct TextContent {
    content: String,
}

#[derive(Serialize)]
struct At<'a> {
    #[serde(rename = "atMobiles")]
    at_mobiles: &'a [String],
    #[serde(rename = "isAtAll")]
    is_at_all: bool,
}

#[derive(Deserialize)]
struct RobotResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Sends text messages to a DingTalk group robot, @-mentioning the given
/// mobile numbers.
pub struct DingTalkSender {
    config: DingTalkConfig,
    client: reqwest::Client,
}

impl DingTalkSender {
    pub fn new(config: DingTalkConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request_url(&self) -> String {
        let url = &self.config.webhook_url;
        if self.config.secret.is_empty() {
            return url.clone();
        }
        let timestamp = Utc::now().timestamp_millis();
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}timestamp={}&sign={}",
            url,
            separator,
            timestamp,
            sign(&self.config.secret, timestamp)
        )
    }
}

#[async_trait]
impl ChannelSender for DingTalkSender {
    async fn send(&self, to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let message = RobotMessage {
            msgtype: &self.config.msg_type,
            text: TextContent {
                content: format!("{}\n{}\n", title, content),
            },
            at: At {
                at_mobiles: to,
                is_at_all: false,
            },
        };

        let body = post_json(&self.client, &self.request_url(), &message, None).await?;
        let response: RobotResponse =
            serde_json::from_str(&body).context("unparseable dingtalk response")?;
        if response.errcode != 0 {
            bail!("errmsg: {} errcode: {}", response.errmsg, response.errcode);
        }
        Ok(result.completed())
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
