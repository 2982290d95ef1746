//! Aliyun SMS (Dysmsapi) adapter.
//!
//! Calls the `SendSms` action over HTTPS using the ACS3-HMAC-SHA256
//! request signature. The message content is passed through as the
//! template parameter JSON, e.g. `{"code":"1234"}`.

use crate::config::SmsConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const CHANNEL_TYPE: &str = "sms";

const SIGN_ALGORITHM: &str = "ACS3-HMAC-SHA256";
const API_ACTION: &str = "SendSms";
const API_VERSION: &str = "2017-05-25";
const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

type HmacSha256 = Hmac<Sha256>;

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256_hex(key: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Canonical request per the ACS V3 signing protocol: method, URI, query,
/// sorted headers, signed header names and the payload hash.
fn canonical_request(headers: &[(&str, &str)], payload_hash: &str) -> String {
    let mut canonical = String::from("POST\n/\n\n");
    for (name, value) in headers {
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
    }
    canonical.push('\n');
    canonical.push_str(SIGNED_HEADERS);
    canonical.push('\n');
    canonical.push_str(payload_hash);
    canonical
}

#[derive(Serialize)]
struct SendSmsRequest {
    #[serde(rename = "PhoneNumbers")]
    phone_numbers: String,
    #[serde(rename = "SignName")]
    sign_name: String,
    #[serde(rename = "TemplateCode")]
    template_code: String,
    #[serde(rename = "TemplateParam")]
    template_param: String,
}

#[derive(Deserialize)]
struct SendSmsResponse {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "BizId")]
    biz_id: Option<String>,
}

/// Sends template SMS through the Aliyun gateway.
pub struct SmsSender {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsSender {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint URL and the value of the `host` header. The configured
    /// host is scheme-less in production (`dysmsapi.aliyuncs.com`); a full
    /// URL is accepted for testing.
    fn endpoint(&self) -> (String, String) {
        let host = &self.config.host;
        if let Some(stripped) = host.strip_prefix("https://") {
            (host.clone(), stripped.to_string())
        } else if let Some(stripped) = host.strip_prefix("http://") {
            (host.clone(), stripped.to_string())
        } else {
            (format!("https://{}", host), host.clone())
        }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    async fn send(&self, to: &[String], _title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let (endpoint, host) = self.endpoint();

        let request = SendSmsRequest {
            phone_numbers: to.join(","),
            sign_name: self.config.sign_name.clone(),
            template_code: self.config.template_code.clone(),
            template_param: content.to_string(),
        };
        let payload = serde_json::to_vec(&request)?;
        let payload_hash = sha256_hex(&payload);

        let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = Uuid::new_v4().to_string();
        let headers = [
            ("host", host.as_str()),
            ("x-acs-action", API_ACTION),
            ("x-acs-content-sha256", payload_hash.as_str()),
            ("x-acs-date", date.as_str()),
            ("x-acs-signature-nonce", nonce.as_str()),
            ("x-acs-version", API_VERSION),
        ];

        let string_to_sign = format!(
            "{}\n{}",
            SIGN_ALGORITHM,
            sha256_hex(canonical_request(&headers, &payload_hash).as_bytes())
        );
        let signature = hmac_sha256_hex(&self.config.access_key_secret, &string_to_sign);
        let authorization = format!(
            "{} Credential={},SignedHeaders={},Signature={}",
            SIGN_ALGORITHM, self.config.access_key_id, SIGNED_HEADERS, signature
        );

        let mut builder = self
            .client
            .post(&endpoint)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json; charset=utf-8");
        for (name, value) in &headers[1..] {
            builder = builder.header(*name, *value);
        }

        let response = builder.body(payload).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: SendSmsResponse =
            serde_json::from_str(&body).with_context(|| {
                format!("unparseable sms gateway response: status {}", status)
            })?;
        if parsed.code != "OK" {
            bail!("errmsg: {} errcode: {}", parsed.message, parsed.code);
        }

        let mut result = result.completed();
        if parsed.biz_id.is_some() {
            result.channel_msg_id = parsed.biz_id;
        }
        Ok(result)
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
