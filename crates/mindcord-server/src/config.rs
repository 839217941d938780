//! Server settings read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use mindcord_core::{EngineConfig, MindcordError, MindcordResult};
use secrecy::SecretString;

use crate::webhook::WebhookConfig;

/// Settings of the HTTP bridge.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on every route except `/health`.
    pub api_key: Option<SecretString>,
    /// Engine config file; the environment is used when absent.
    pub engine_config_path: Option<PathBuf>,
    /// Depth of the inbound event queue feeding the dispatcher.
    pub event_queue_depth: usize,
    pub webhook: WebhookConfig,
}

impl ServerConfig {
    /// Read settings from environment variables.
    ///
    /// - `MINDCORD_HOST` (default `0.0.0.0`), `MINDCORD_PORT` (default `8080`)
    /// - `MINDCORD_API_KEY`
    /// - `MINDCORD_CONFIG`
    /// - `MINDCORD_EVENT_QUEUE_DEPTH` (default 256)
    /// - `MINDCORD_WEBHOOK_URL` (required), `MINDCORD_WEBHOOK_SECRET`,
    ///   `MINDCORD_WEBHOOK_TIMEOUT_SECS`, `MINDCORD_WEBHOOK_TYPING`
    pub fn from_env() -> MindcordResult<Self> {
        let port = match std::env::var("MINDCORD_PORT") {
            Ok(raw) => raw.parse().map_err(|_| {
                MindcordError::Configuration(format!("MINDCORD_PORT is not a port: {}", raw))
            })?,
            Err(_) => 8080,
        };

        let url = std::env::var("MINDCORD_WEBHOOK_URL").map_err(|_| {
            MindcordError::Configuration("MINDCORD_WEBHOOK_URL must be set".to_string())
        })?;
        let mut webhook = WebhookConfig::new(url);
        if let Ok(secret) = std::env::var("MINDCORD_WEBHOOK_SECRET") {
            webhook = webhook.with_secret(secret);
        }
        if let Some(secs) = std::env::var("MINDCORD_WEBHOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            webhook.timeout_secs = secs;
        }
        webhook.typing_events = std::env::var("MINDCORD_WEBHOOK_TYPING").is_ok();

        Ok(Self {
            host: std::env::var("MINDCORD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            api_key: std::env::var("MINDCORD_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::new),
            engine_config_path: std::env::var("MINDCORD_CONFIG").ok().map(PathBuf::from),
            event_queue_depth: std::env::var("MINDCORD_EVENT_QUEUE_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(256),
            webhook,
        })
    }

    pub fn addr(&self) -> MindcordResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| MindcordError::Configuration(format!("Invalid listen address: {}", e)))
    }

    /// Engine configuration from the config file, or from the environment.
    pub fn engine_config(&self) -> MindcordResult<EngineConfig> {
        match &self.engine_config_path {
            Some(path) => EngineConfig::from_file(path),
            None => Ok(EngineConfig::from_env()),
        }
    }
}
