//! WeCom (enterprise WeChat) application-message adapter.
//!
//! Fetches an access token from the `gettoken` endpoint, caches it on the
//! instance until shortly before expiry, and posts app messages to the
//! addressed user ids. Message type (`text`, `markdown`, `textcard`) is a
//! per-instance setting from [`WecomConfig`].

use crate::channels::post_json;
use crate::config::WecomConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

pub const CHANNEL_TYPE: &str = "wecom";

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AppMessage<'a> {
    touser: String,
    toparty: String,
    totag: String,
    msgtype: &'a str,
    agentid: i64,
    text: MessageContent,
    markdown: MessageContent,
}

#[derive(Serialize, Clone)]
struct MessageContent {
    content: String,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    invaliduser: String,
    #[serde(default)]
    invalidparty: String,
    #[serde(default)]
    invalidtag: String,
}

/// Sends application messages through the WeCom API.
pub struct WecomSender {
    config: WecomConfig,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl WecomSender {
    pub fn new(config: WecomConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Returns a valid access token, fetching a fresh one when the cache
    /// is empty or expired.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!(
            "{}/gettoken?corpid={}&corpsecret={}",
            self.config.api_base, self.config.corp_id, self.config.secret
        );
        let response: TokenResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .context("unparseable wecom token response")?;
        if response.access_token.is_empty() || response.expires_in == 0 {
            bail!(
                "failed to fetch wecom access token: errcode {} errmsg {}",
                response.errcode,
                response.errmsg
            );
        }

        debug!(expires_in = response.expires_in, "fetched wecom access token");
        // Refresh well before the advertised expiry.
        let lifetime = response.expires_in.saturating_sub(1000).max(60);
        let token = CachedToken {
            value: response.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        };
        *cached = Some(token.clone());
        Ok(token.value)
    }
}

#[async_trait]
impl ChannelSender for WecomSender {
    async fn send(&self, to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let token = self.access_token().await?;

        let text = MessageContent {
            content: format!("{}\n{}", title, content),
        };
        let message = AppMessage {
            touser: to.join("|"),
            toparty: String::new(),
            totag: String::new(),
            msgtype: &self.config.msg_type,
            agentid: self.config.agent_id,
            markdown: text.clone(),
            text,
        };

        let url = format!(
            "{}/message/send?access_token={}",
            self.config.api_base, token
        );
        let body = post_json(&self.client, &url, &message, None).await?;
        let response: SendResponse =
            serde_json::from_str(&body).context("unparseable wecom send response")?;
        if response.errcode != 0 {
            bail!("failed to send wecom message: {}", response.errmsg);
        }
        if !response.invaliduser.is_empty()
            || !response.invalidparty.is_empty()
            || !response.invalidtag.is_empty()
        {
            bail!(
                "message delivered with unreachable targets: {} {} {}",
                response.invaliduser,
                response.invalidparty,
                response.invalidtag
            );
        }
        Ok(result.completed())
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
