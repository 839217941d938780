//! Inbound chat events as delivered by the event source.

use serde::{Deserialize, Serialize};

/// A chat message observed by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub author_id: String,
    pub author_display_name: String,
    /// Venue the message was posted in; absent for private channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    pub channel_id: String,
    pub text: String,
    #[serde(default)]
    pub mentions_agent: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_member_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
}

impl InboundEvent {
    /// Create a message posted in a venue channel.
    pub fn in_venue(
        author_id: impl Into<String>,
        author_display_name: impl Into<String>,
        venue_id: impl Into<String>,
        channel_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            author_display_name: author_display_name.into(),
            venue_id: Some(venue_id.into()),
            channel_id: channel_id.into(),
            text: text.into(),
            mentions_agent: false,
            is_private: false,
            venue_name: None,
            venue_member_count: None,
            channel_name: None,
        }
    }

    /// Create a message received over a private one-to-one channel.
    pub fn private(
        author_id: impl Into<String>,
        author_display_name: impl Into<String>,
        channel_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            author_display_name: author_display_name.into(),
            venue_id: None,
            channel_id: channel_id.into(),
            text: text.into(),
            mentions_agent: false,
            is_private: true,
            venue_name: None,
            venue_member_count: None,
            channel_name: None,
        }
    }

    /// Builder method to mark the agent as mentioned.
    pub fn mentioning_agent(mut self) -> Self {
        self.mentions_agent = true;
        self
    }

    /// Builder method to attach venue metadata.
    pub fn with_venue_info(mut self, name: impl Into<String>, member_count: u64) -> Self {
        self.venue_name = Some(name.into());
        self.venue_member_count = Some(member_count);
        self
    }

    /// Builder method to attach the channel name.
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    /// Whether the agent must answer this event regardless of state.
    pub fn demands_reply(&self) -> bool {
        self.mentions_agent || self.is_private
    }
}
