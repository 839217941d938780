//! Server state management.

use std::sync::Arc;

use mindcord_core::{BackgroundRuntime, Engine, InboundEvent, MindcordResult};
use secrecy::SecretString;
use tokio::sync::{mpsc, Mutex};

use crate::webhook::ChannelDirectory;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Feeds the engine's dispatcher; events are handled inline when absent.
    events: Option<mpsc::Sender<InboundEvent>>,
    channels: Arc<ChannelDirectory>,
    api_key: Option<Arc<SecretString>>,
    runtime: Arc<Mutex<Option<BackgroundRuntime>>>,
}

impl AppState {
    /// Create a state that handles events inline.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            events: None,
            channels: Arc::new(ChannelDirectory::new()),
            api_key: None,
            runtime: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue events to a dispatcher instead of handling them inline.
    pub fn with_event_queue(mut self, events: mpsc::Sender<InboundEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Share the channel directory the delivery sink reads.
    pub fn with_channel_directory(mut self, channels: Arc<ChannelDirectory>) -> Self {
        self.channels = channels;
        self
    }

    /// Require `Authorization: Bearer <key>` on the API routes.
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(Arc::new(key));
        self
    }

    pub fn with_runtime(self, runtime: BackgroundRuntime) -> Self {
        if let Ok(mut slot) = self.runtime.try_lock() {
            *slot = Some(runtime);
        }
        self
    }

    pub fn events(&self) -> Option<&mpsc::Sender<InboundEvent>> {
        self.events.as_ref()
    }

    pub fn channels(&self) -> &Arc<ChannelDirectory> {
        &self.channels
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_deref()
    }

    /// Stop the background runtime, if one was attached.
    pub async fn shutdown_runtime(&self) -> MindcordResult<()> {
        if let Some(mut runtime) = self.runtime.lock().await.take() {
            runtime.shutdown().await?;
        }
        Ok(())
    }
}
