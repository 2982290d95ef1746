//! Channel registry: maps channel tags to sender constructors.
//!
//! The registry is populated once at startup with the built-in providers
//! and looked up by tag for every attempt. An unknown tag or a missing
//! provider configuration is a typed error; the dispatch manager turns it
//! into a failed per-channel result.

use crate::channels::{dingtalk, email, lark, slack, sms, webhook, wecom};
use crate::config::NotifyConfig;
use crate::core::ChannelSender;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Conditions under which a sender cannot be constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The tag is not registered at all.
    #[error("unsupported notify channel: {0}")]
    Unsupported(String),
    /// The tag is known but its configuration block is absent.
    #[error("channel {0} is not configured")]
    NotConfigured(String),
    /// Construction failed, e.g. the HTTP client could not be built.
    #[error("failed to initialize channel {0}: {1}")]
    Init(String, String),
}

/// Constructs one sender from the manager's configuration.
pub type SenderBuilder =
    Arc<dyn Fn(&NotifyConfig) -> Result<Box<dyn ChannelSender>, ChannelError> + Send + Sync>;

/// Tag-to-constructor mapping, populated at startup.
#[derive(Clone)]
pub struct ChannelRegistry {
    builders: HashMap<&'static str, SenderBuilder>,
}

impl ChannelRegistry {
    /// A registry with no builders; mainly useful in tests.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registers (or replaces) the builder for a tag.
    pub fn register<F>(&mut self, tag: &'static str, builder: F)
    where
        F: Fn(&NotifyConfig) -> Result<Box<dyn ChannelSender>, ChannelError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(tag, Arc::new(builder));
    }

    /// Constructs a sender for `tag` from `config`.
    pub fn build(
        &self,
        tag: &str,
        config: &NotifyConfig,
    ) -> Result<Box<dyn ChannelSender>, ChannelError> {
        let builder = self
            .builders
            .get(tag)
            .ok_or_else(|| ChannelError::Unsupported(tag.to_string()))?;
        builder(config)
    }

    /// The registered tags, in no particular order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }
}

impl Default for ChannelRegistry {
    /// Registry with all built-in providers.
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register(email::CHANNEL_TYPE, |config| {
            let settings = config
                .email
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(email::CHANNEL_TYPE.to_string()))?;
            Ok(Box::new(email::EmailSender::new(settings)))
        });

        registry.register(sms::CHANNEL_TYPE, |config| {
            let settings = config
                .sms
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(sms::CHANNEL_TYPE.to_string()))?;
            Ok(Box::new(sms::SmsSender::new(settings)))
        });

        registry.register(dingtalk::CHANNEL_TYPE, |config| {
            let settings = config
                .dingding
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(dingtalk::CHANNEL_TYPE.to_string()))?;
            Ok(Box::new(dingtalk::DingTalkSender::new(settings)))
        });

        registry.register(lark::CHANNEL_TYPE, |config| {
            let settings = config
                .lark
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(lark::CHANNEL_TYPE.to_string()))?;
            Ok(Box::new(lark::LarkSender::new(settings)))
        });

        registry.register(wecom::CHANNEL_TYPE, |config| {
            let settings = config
                .wecom
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(wecom::CHANNEL_TYPE.to_string()))?;
            Ok(Box::new(wecom::WecomSender::new(settings)))
        });

        registry.register(webhook::CHANNEL_TYPE, |config| {
            let settings = config
                .webhook
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(webhook::CHANNEL_TYPE.to_string()))?;
            webhook::WebhookSender::new(settings)
                .map(|sender| Box::new(sender) as Box<dyn ChannelSender>)
                .map_err(|e| ChannelError::Init(webhook::CHANNEL_TYPE.to_string(), e.to_string()))
        });

        registry.register(slack::CHANNEL_TYPE, |config| {
            let settings = config
                .slack
                .clone()
                .ok_or_else(|| ChannelError::NotConfigured(slack::CHANNEL_TYPE.to_string()))?;
            slack::SlackSender::new(settings)
                .map(|sender| Box::new(sender) as Box<dyn ChannelSender>)
                .map_err(|e| ChannelError::Init(slack::CHANNEL_TYPE.to_string(), e.to_string()))
        });

        registry
    }
}
