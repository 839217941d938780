//! Outbound delivery over a signed webhook.
//!
//! Every outbound message is one JSON POST to the configured URL. Delivery is
//! at-most-once: a failed POST is reported to the caller and never retried.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use mindcord_core::{ChannelInfo, DeliverySink, MindcordError, MindcordResult};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Header carrying `sha256=<hex>` of the request body.
pub const SIGNATURE_HEADER: &str = "X-Mindcord-Signature";
/// Header carrying the payload type.
pub const EVENT_HEADER: &str = "X-Mindcord-Event";

/// Webhook endpoint configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Secret for HMAC signing; unsigned when absent.
    pub secret: Option<SecretString>,
    pub timeout_secs: u64,
    /// Forward typing indicators as their own payloads.
    pub typing_events: bool,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: None,
            timeout_secs: 10,
            typing_events: false,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::new(secret.into()));
        self
    }
}

/// Body of one webhook POST.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookPayload<'a> {
    Message {
        delivery_id: String,
        channel_id: &'a str,
        text: &'a str,
    },
    Typing {
        channel_id: &'a str,
    },
}

impl WebhookPayload<'_> {
    fn event_type(&self) -> &'static str {
        match self {
            WebhookPayload::Message { .. } => "message",
            WebhookPayload::Typing { .. } => "typing",
        }
    }

    fn channel_id(&self) -> &str {
        match self {
            WebhookPayload::Message { channel_id, .. } | WebhookPayload::Typing { channel_id } => {
                channel_id
            }
        }
    }
}

/// Channels seen in inbound events, per venue.
///
/// The bridge cannot enumerate a venue's channels itself, so it learns them
/// from the `channel_name` field of inbound events.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    venues: RwLock<HashMap<String, Vec<ChannelInfo>>>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or rename a channel of a venue.
    pub async fn observe(&self, venue_id: &str, channel_id: &str, name: &str) {
        let mut venues = self.venues.write().await;
        let channels = venues.entry(venue_id.to_string()).or_default();
        match channels.iter_mut().find(|c| c.id == channel_id) {
            Some(existing) => existing.name = name.to_string(),
            None => channels.push(ChannelInfo::new(channel_id, name)),
        }
    }

    pub async fn channels(&self, venue_id: &str) -> Vec<ChannelInfo> {
        self.venues
            .read()
            .await
            .get(venue_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Delivery sink posting to a webhook.
pub struct WebhookSink {
    client: Client,
    config: WebhookConfig,
    directory: std::sync::Arc<ChannelDirectory>,
}

impl WebhookSink {
    pub fn new(
        config: WebhookConfig,
        directory: std::sync::Arc<ChannelDirectory>,
    ) -> MindcordResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MindcordError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            config,
            directory,
        })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> MindcordResult<()> {
        let channel_id = payload.channel_id();
        let body = serde_json::to_string(payload)?;

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .header(EVENT_HEADER, payload.event_type());
        if let Some(secret) = &self.config.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(&body, secret.expose_secret())?);
        }

        let response = request.body(body).send().await.map_err(|e| {
            MindcordError::delivery(channel_id, format!("webhook request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MindcordError::delivery(
                channel_id,
                format!("webhook answered {}: {}", status, detail),
            ));
        }
        debug!(channel_id = %channel_id, kind = payload.event_type(), "Webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    async fn send(&self, channel_id: &str, text: &str) -> MindcordResult<()> {
        let payload = WebhookPayload::Message {
            delivery_id: uuid::Uuid::new_v4().to_string(),
            channel_id,
            text,
        };
        self.post(&payload).await.map_err(|e| {
            warn!(channel_id = %channel_id, error = %e, "Webhook delivery failed");
            e
        })
    }

    async fn send_typing_indicator(&self, channel_id: &str) -> MindcordResult<()> {
        if !self.config.typing_events {
            return Ok(());
        }
        self.post(&WebhookPayload::Typing { channel_id }).await
    }

    async fn open_private_channel(&self, user_id: &str) -> MindcordResult<String> {
        Ok(format!("dm:{}", user_id))
    }

    async fn venue_channels(&self, venue_id: &str) -> MindcordResult<Vec<ChannelInfo>> {
        Ok(self.directory.channels(venue_id).await)
    }
}

/// Sign a payload with HMAC-SHA256 as `sha256=<hex>`.
pub fn sign_payload(payload: &str, secret: &str) -> MindcordResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| MindcordError::internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify a signature produced by [`sign_payload`].
///
/// For webhook receivers; compares in constant time.
pub fn verify_signature(payload: &str, secret: &str, signature: &str) -> bool {
    let Some(hex_sig) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
