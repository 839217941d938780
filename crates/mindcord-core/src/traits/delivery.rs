//! Delivery sink trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MindcordResult;

/// A channel inside a venue, as reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

impl ChannelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outbound primitives of the chat platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Send a message to a channel.
    async fn send(&self, channel_id: &str, text: &str) -> MindcordResult<()>;

    /// Show a transient "thinking" indicator. Failures may be ignored.
    async fn send_typing_indicator(&self, channel_id: &str) -> MindcordResult<()>;

    /// Open (or look up) the private channel with a user.
    async fn open_private_channel(&self, user_id: &str) -> MindcordResult<String>;

    /// Channels of a venue. Platforms that cannot enumerate them return none.
    async fn venue_channels(&self, _venue_id: &str) -> MindcordResult<Vec<ChannelInfo>> {
        Ok(Vec::new())
    }

    /// Platform syntax for tagging a user in a message.
    fn mention(&self, user_id: &str) -> String {
        format!("<@{}>", user_id)
    }
}
