//! AcTEC gateway bridge
//!
//! `actec-bridge [run] <config.yaml>` connects to the gateway, loads its
//! units and logs availability changes and property reports until Ctrl-C.
//! `actec-bridge probe <config.yaml>` only checks that the gateway accepts
//! the configured token.

use std::path::Path;
use std::sync::Arc;

use actec_config::GatewayConfig;
use actec_gateway::{Gateway, Unsubscribe};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let command = Cli::parse().into_command();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    match command {
        Commands::Run { config } => run(&config).await,
        Commands::Probe { config } => probe(&config).await,
    }
}

fn load(path: &Path) -> Result<GatewayConfig> {
    GatewayConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

async fn probe(path: &Path) -> Result<()> {
    let config = load(path)?;
    actec_gateway::probe(config.client_config()?)
        .await
        .with_context(|| format!("gateway {} refused the probe", config.host))?;
    info!(host = %config.host, "gateway accepts this configuration");
    Ok(())
}

async fn run(path: &Path) -> Result<()> {
    let config = load(path)?;
    let gateway = Arc::new(Gateway::new(config.client_config()?, config.mac.clone()));

    info!(host = %config.host, mac = %config.mac, "starting AcTEC bridge");
    gateway
        .bootstrap(config.area_name_rule)
        .await
        .context("gateway setup failed")?;
    info!(
        devices = gateway.devices().count(),
        scenes = gateway.scenes().count(),
        groups = gateway.groups().count(),
        "gateway loaded"
    );

    let subscriptions = watch_units(&gateway);

    let mut receiver = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move { gateway.run().await }
    });
    let pinger = tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move { gateway.run_ping_loop().await }
    });

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("shutting down");
            signal.map_err(anyhow::Error::from)
        }
        finished = &mut receiver => match finished {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(anyhow::Error::from(err).context("receive loop failed")),
            Err(err) => Err(anyhow::Error::from(err).context("receive loop panicked")),
        },
    };

    gateway.close().await;
    if !receiver.is_finished() {
        if let Err(err) = receiver.await {
            warn!(%err, "receive loop did not stop cleanly");
        }
    }
    if let Err(err) = pinger.await {
        warn!(%err, "ping loop did not stop cleanly");
    }
    for subscription in subscriptions {
        subscription.unsubscribe();
    }

    if let Err(err) = &outcome {
        error!(err = %format!("{:#}", err), "bridge stopped");
    }
    outcome
}

/// Log availability and property reports for every loaded unit
fn watch_units(gateway: &Gateway) -> Vec<Unsubscribe> {
    let mut subscriptions = Vec::new();

    for device in gateway.devices() {
        let device_id = device.device_id().to_string();
        subscriptions.push(device.add_available_listener({
            let device_id = device_id.clone();
            move |available| info!(%device_id, available, "device availability changed")
        }));

        let channels = device.info().product_channel.unwrap_or(1).max(1);
        for endpoint in 1..=channels {
            subscriptions.push(device.add_listener(endpoint, |report| {
                info!(
                    device_id = %report.device_id,
                    endpoint = report.endpoint,
                    action = %report.action,
                    property = %report.property,
                    "property update"
                )
            }));
        }
    }

    for scene in gateway.scenes() {
        let scene_id = scene.scene_id();
        subscriptions.push(scene.add_available_listener(move |available| {
            info!(scene_id, available, "scene availability changed")
        }));
    }
    for group in gateway.groups() {
        let group_id = group.group_id();
        subscriptions.push(group.add_available_listener(move |available| {
            info!(group_id, available, "group availability changed")
        }));
    }

    subscriptions
}
