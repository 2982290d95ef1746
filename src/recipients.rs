//! Recipient records and per-channel address extraction.

use serde::{Deserialize, Serialize};

/// One abstract recipient, carrying an optional address per channel.
///
/// Empty fields simply mean "this person is not reachable on that
/// channel".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyToId {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub wecom: String,
    #[serde(default)]
    pub ding: String,
    #[serde(default)]
    pub lark: String,
    #[serde(default)]
    pub webhook: String,
}

/// An ordered list of recipients.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyToIds(pub Vec<NotifyToId>);

impl NotifyToIds {
    /// Extracts the address list relevant to one channel tag, skipping
    /// recipients with no address for it. Unknown tags yield an empty
    /// list.
    pub fn channel_addresses(&self, channel: &str) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|id| {
                let addr = match channel {
                    "email" => &id.email,
                    "sms" => &id.phone,
                    "wecom" => &id.wecom,
                    "dingding" => &id.ding,
                    "lark" => &id.lark,
                    "webhook" => &id.webhook,
                    _ => return None,
                };
                if addr.is_empty() {
                    None
                } else {
                    Some(addr.clone())
                }
            })
            .collect()
    }
}

impl From<Vec<NotifyToId>> for NotifyToIds {
    fn from(ids: Vec<NotifyToId>) -> Self {
        Self(ids)
    }
}
