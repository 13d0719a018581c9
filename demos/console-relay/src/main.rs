use std::env;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use uorcon::prelude::*;

// ---------------------------------------------------------------------------
// Configuration from the environment
// ---------------------------------------------------------------------------

fn client_config() -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::default();
    if let Ok(host) = env::var("UORCON_HOST") {
        config.host = host;
    }
    if let Ok(port) = env::var("UORCON_PORT") {
        config.port = port.parse()?;
    }
    if let Ok(password) = env::var("UORCON_PASSWORD") {
        config.password = password;
    }
    Ok(config)
}

fn listener_config() -> Result<ListenerConfig, Box<dyn std::error::Error>> {
    let mut config = ListenerConfig::default();
    if let Ok(addr) = env::var("UORCON_LISTEN") {
        config.bind_addr = addr.parse::<SocketAddr>()?;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (subscriber, mut events) = ChannelSubscriber::bounded(256);
    let service = RelayService::builder()
        .client_config(client_config()?)
        .listen(listener_config()?)
        .subscribe(subscriber)
        .start()
        .await?;

    match service.client().status().await {
        Ok(CommandOutcome::Completed(status)) => tracing::info!(
            shard = %status.shard,
            online = status.online,
            characters = status.characters,
            "connected"
        ),
        Ok(CommandOutcome::Rejected(reason)) => {
            tracing::warn!(?reason, "status refused, check UORCON_PASSWORD")
        }
        Err(e) => tracing::warn!(error = %e, "server did not answer status"),
    }

    loop {
        tokio::select! {
            Some(event) = events.recv() => println!("{event}"),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    service.shutdown();
    Ok(())
}
