//! Provider adapters.
//!
//! Each submodule implements [`crate::core::ChannelSender`] for one
//! provider. Adapters are leaf-level protocol glue: they build one
//! request, send it and interpret the provider's response. All dispatch
//! coordination lives in [`crate::manager`].

pub mod dingtalk;
pub mod email;
pub mod lark;
pub mod slack;
pub mod sms;
pub mod webhook;
pub mod wecom;

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Posts `payload` as JSON and returns the response body.
///
/// Non-success HTTP statuses are errors; provider-level error codes inside
/// a 2xx body are left to the caller to interpret.
pub(crate) async fn post_json<T: Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &T,
    headers: Option<&HashMap<String, String>>,
) -> Result<String> {
    let mut request = client.post(url).json(payload);
    if let Some(headers) = headers {
        for (name, value) in headers {
            request = request.header(name, value);
        }
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("request failed: status {}, body: {}", status, body);
    }
    Ok(body)
}
