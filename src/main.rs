use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::interval;
use tracing::{event, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use platformer::api;
use platformer::cli;
use platformer::error::PlatformerError;
use platformer::gossip::GossipScheduler;
use platformer::node::{Node, SharedNode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platformer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings();
    let socket_address = settings.socket_address()?;

    let node: SharedNode = Arc::new(Node::from_settings(settings.clone()).await?);

    // Build Axum Router
    let api = api::api(node.clone()).await?;

    // Bind before anything gossips: identifying ourselves needs a listening server
    let server = axum::Server::try_bind(&socket_address)?.serve(api.into_make_service());
    info!(
        "Starting Platformer node '{}' on {}",
        settings.name, socket_address
    );

    tokio::spawn(expire_secrets(node.clone()));
    if !settings.bootstrap.is_empty() {
        tokio::spawn(bootstrap(node.clone()));
    }
    if let Some(gossip_interval) = settings.gossip_interval() {
        info!("Gossiping every {:?}", gossip_interval);
        tokio::spawn(GossipScheduler::new(gossip_interval).run(node.clone()));
    }

    server.await?;
    Ok(())
}

async fn bootstrap(node: SharedNode) {
    for url in node.settings().bootstrap.clone() {
        match node.get_peer_list_from(url.as_str()).await {
            Ok(report) => info!(
                "Bootstrapped from {}: {} peers merged",
                url,
                report.merged.len()
            ),
            Err(PlatformerError::PeerUnreachable(url)) => {
                warn!("Bootstrap peer {} unreachable", url)
            }
            Err(err) => event!(
                Level::ERROR,
                message = "Bootstrap import failed",
                url = url.as_str(),
                err = format!("{:?}", err)
            ),
        }
    }
}

async fn expire_secrets(node: SharedNode) {
    let mut ticker = interval(node.settings().secret_ttl().max(Duration::from_secs(1)));
    loop {
        ticker.tick().await;
        match node.expire_secrets() {
            Ok(0) => {}
            Ok(expired) => info!("Expired {} identification secrets", expired),
            Err(err) => event!(
                Level::ERROR,
                message = "Failed expiring secrets",
                err = format!("{:?}", err)
            ),
        }
    }
}
