//! Sonos Web client - headless session runner
//!
//! Connects to the controller, keeps the local state in sync and logs every
//! render notification until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use sonos_web_client::config;
use sonos_web_client::zone_model::RenderTarget;
use sonos_web_client::{HttpTransport, RenderBus, Session};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sonos_web_client=info,sonos_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sonos Web client");

    // Load configuration
    let config = config::load_config()?;
    tracing::info!(?config, "Configuration loaded");

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let bus = RenderBus::default();
    let mut rx = bus.subscribe();
    let session = Arc::new(Session::new(config, transport, Arc::new(bus)));

    if let Some(zone) = session.config().zone.clone() {
        session.select_zone(&zone).await?;
    }

    let sync = session.start().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C");
                break;
            }
            received = rx.recv() => match received {
                Ok(target) => log_target(&session, &target).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Render log fell behind, skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown();
    sync.await?;
    Ok(())
}

async fn log_target(session: &Session, target: &RenderTarget) {
    let store = session.store().await;
    match target {
        RenderTarget::Zones => {
            let names: Vec<String> = store.zones().iter().map(|z| z.display_name()).collect();
            tracing::info!(zones = ?names, "Zone list changed");
        }
        RenderTarget::Zone(id) => {
            if let Some(zone) = store.zone(id) {
                tracing::info!(
                    zone = %zone.display_name(),
                    mode = %zone.mode,
                    volume = zone.volume,
                    muted = zone.muted,
                    track = %zone.track.name,
                    artist = %zone.track.artist,
                    "Zone changed"
                );
            }
        }
        RenderTarget::Queue(id) => {
            let len = store.queue(id).map(|q| q.len()).unwrap_or(0);
            tracing::info!(zone_id = %id, items = len, "Queue changed");
        }
        RenderTarget::Music(path) => {
            if let Some(node) = store.music(path) {
                tracing::info!(
                    path = %path,
                    name = %node.name,
                    children = node.children.len(),
                    "Music node changed"
                );
            }
        }
    }
}
