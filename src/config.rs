//! Configuration for the notification dispatcher.
//!
//! This module defines `NotifyConfig` and its per-provider sub-structs.
//! It uses the `figment` crate to load configuration from a TOML file and
//! merge it with `NOTIFYHUB_`-prefixed environment variables.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level notification configuration: the default channel list plus one
/// optional settings block per provider. A channel can only be built when
/// its block is present.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NotifyConfig {
    /// Default channel tags used when a send request does not override
    /// them, e.g. `["email", "lark"]`.
    #[serde(default)]
    pub channels: Vec<String>,
    /// SMTP settings for the email channel.
    pub email: Option<EmailConfig>,
    /// Aliyun gateway settings for the SMS channel.
    pub sms: Option<SmsConfig>,
    /// DingTalk robot webhook settings.
    pub dingding: Option<DingTalkConfig>,
    /// Lark custom-bot webhook settings.
    pub lark: Option<LarkConfig>,
    /// WeCom application message settings.
    pub wecom: Option<WecomConfig>,
    /// Generic webhook settings.
    pub webhook: Option<WebhookConfig>,
    /// Slack incoming-webhook settings.
    pub slack: Option<SlackConfig>,
}

impl NotifyConfig {
    /// Loads the configuration from the given TOML file, allowing
    /// overrides from environment variables, e.g.
    /// `NOTIFYHUB_CHANNELS='["email"]'`.
    pub fn load(config_path: &str) -> Result<Self> {
        let config: NotifyConfig = Figment::new()
            .merge(Serialized::defaults(NotifyConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("NOTIFYHUB_"))
            .extract()?;
        Ok(config)
    }
}

/// SMTP settings for the email channel.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    /// SMTP server host, e.g. `smtp.example.com`.
    pub smtp_server: String,
    /// SMTP port, typically 465 (TLS) or 587 (STARTTLS).
    pub smtp_port: u16,
    /// Sender address placed in the `From` header.
    pub from: String,
    /// Account used to authenticate against the server.
    pub username: String,
    /// Password or app-specific authorization code.
    pub password: String,
    /// Use implicit TLS instead of STARTTLS.
    #[serde(default)]
    pub tls: bool,
}

/// Aliyun Dysmsapi settings for the SMS channel.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmsConfig {
    /// API endpoint host, e.g. `dysmsapi.aliyuncs.com`.
    pub host: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// Registered SMS signature name.
    pub sign_name: String,
    /// Template code, e.g. `SMS_153055065`.
    pub template_code: String,
}

/// DingTalk robot webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DingTalkConfig {
    pub webhook_url: String,
    /// Signing secret for the robot's "sign" security mode; empty disables
    /// signing.
    #[serde(default)]
    pub secret: String,
    /// Robot message type; only `text` is currently produced.
    #[serde(default = "default_msg_type")]
    pub msg_type: String,
}

/// Lark custom-bot webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LarkConfig {
    pub webhook_url: String,
    /// Signing secret for the bot's signature verification; empty disables
    /// signing.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_msg_type")]
    pub msg_type: String,
}

/// WeCom (enterprise WeChat) application message settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WecomConfig {
    pub corp_id: String,
    pub agent_id: i64,
    pub secret: String,
    /// Message type sent to the WeCom API: `text`, `markdown` or
    /// `textcard`.
    #[serde(default = "default_msg_type")]
    pub msg_type: String,
    /// Base URL of the WeCom API; overridable for testing.
    #[serde(default = "default_wecom_api_base")]
    pub api_base: String,
}

/// Generic webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra headers added to every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Slack incoming-webhook settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SlackConfig {
    pub webhook_url: String,
}

fn default_msg_type() -> String {
    "text".to_string()
}

fn default_wecom_api_base() -> String {
    "https://qyapi.weixin.qq.com/cgi-bin".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    10
}
