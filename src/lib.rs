//! NotifyHub - a multi-channel notification dispatcher.
//!
//! Given a message and a recipient list, the [`manager::Manager`] fans the
//! send out to every configured channel (email, SMS, DingTalk, Lark,
//! WeCom, Slack, generic webhooks) in parallel, bounds concurrency with a
//! semaphore, isolates per-channel failures and returns one
//! [`core::SendResult`] per channel.

pub mod channels;
pub mod config;
pub mod core;
pub mod factory;
pub mod manager;
pub mod recipients;

// Re-export the public surface for convenience
pub use crate::core::{ChannelSender, SendResult, SendResults};
pub use config::NotifyConfig;
pub use factory::{ChannelError, ChannelRegistry};
pub use manager::{DispatchError, Manager, Message, SendOptions};
pub use recipients::{NotifyToId, NotifyToIds};
