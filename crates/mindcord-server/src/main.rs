//! mindcord-server - HTTP bridge binary.

use std::sync::Arc;

use anyhow::Context;
use mindcord_core::{BackgroundRuntime, Engine};
use mindcord_llm::LlmFactory;
use mindcord_server::{create_server, AppState, ChannelDirectory, ServerConfig, WebhookSink};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mindcord=debug")),
        )
        .init();

    let server_config = ServerConfig::from_env().context("reading server settings")?;
    let engine_config = server_config
        .engine_config()
        .context("loading engine configuration")?;

    let generator = LlmFactory::from_env().context("creating generation provider")?;
    let channels = Arc::new(ChannelDirectory::new());
    let sink = Arc::new(
        WebhookSink::new(server_config.webhook.clone(), channels.clone())
            .context("creating webhook sink")?,
    );

    let engine = Arc::new(
        Engine::from_config(engine_config, generator, sink)
            .await
            .context("opening engine")?,
    );

    let mut runtime = BackgroundRuntime::new(&engine)
        .await
        .context("creating background runtime")?;
    runtime.start().await.context("starting background loops")?;

    let (events_tx, events_rx) = mpsc::channel(server_config.event_queue_depth);
    let dispatcher = tokio::spawn(engine.clone().run(events_rx));

    let mut state = AppState::new(engine)
        .with_event_queue(events_tx)
        .with_channel_directory(channels)
        .with_runtime(runtime);
    if let Some(key) = server_config.api_key.clone() {
        info!("Authentication enabled");
        state = state.with_api_key(key);
    }

    let app = create_server(state.clone());
    let addr = server_config.addr()?;
    info!("Starting mindcord-server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, stopping background loops...");
        })
        .await?;

    state.shutdown_runtime().await?;

    // Closing the last queue sender lets the dispatcher drain and exit.
    drop(state);
    if let Err(e) = dispatcher.await {
        error!(error = %e, "Event dispatcher panicked");
    }

    info!("Server stopped cleanly");
    Ok(())
}
