// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The host daemon: bridges a USB-attached mesh radio to APRS-IS.
//!
//! Wires three crates together: [`hostlink_session::SessionClient`] talks
//! HostLink over the serial port and feeds a [`hostlink_session::SessionStore`];
//! [`aprs_gateway::GatewayService`] subscribes to that store and turns
//! mesh activity into APRS packets; [`aprs_is_client::IsClient`] carries
//! those packets to an APRS-IS server. The gateway never references the
//! uplink crate directly -- it hands packets to whatever implements
//! `GatewaySink`.

mod config;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use aprs_gateway::GatewayService;
use aprs_is_client::IsClient;
use clap::Parser;
use hostlink_session::{SessionClient, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::sync::CancellationToken;

/// Bridges a HostLink-speaking mesh radio on a serial/USB-CDC port to an
/// APRS-IS server.
#[derive(Debug, Parser)]
#[command(name = "trailmate-gatewayd", version, about)]
struct Args {
    /// Path to the TOML configuration file. Missing files fall back to
    /// built-in defaults (uplink disabled, dummy callsign).
    #[arg(long, default_value = "trailmate-gatewayd.toml")]
    config: PathBuf,

    /// Overrides `[serial].port` from the config file.
    #[arg(long)]
    port: Option<String>,

    /// Overrides `[serial].baud_rate` from the config file.
    #[arg(long)]
    baud: Option<u32>,

    /// Overrides the `log_filter` from the config file, e.g. `debug` or
    /// `trailmate_gatewayd=debug,aprs_gateway=info`.
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut app_config = AppConfig::load(&args.config)?;

    if let Some(port) = args.port {
        app_config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        app_config.serial.baud_rate = baud;
    }
    if let Some(log_filter) = args.log_filter {
        app_config.log_filter = log_filter;
    }

    let (serial_config, gateway_config, is_client_config, log_filter) = app_config.into_parts()?;
    init_tracing(&log_filter);

    tracing::info!(
        port = %serial_config.port,
        baud = serial_config.baud_rate,
        "opening serial transport"
    );
    let transport = tokio_serial::new(&serial_config.port, serial_config.baud_rate)
        .open_native_async()
        .with_context(|| format!("opening serial port {}", serial_config.port))?;

    let store = Arc::new(SessionStore::new());
    let session = SessionClient::new(transport, store.clone(), true);
    session
        .connect()
        .await
        .context("HostLink handshake failed")?;
    tracing::info!("HostLink session ready");

    let is_client = IsClient::new(is_client_config);
    let gateway = Arc::new(GatewayService::new(gateway_config, is_client.sink()));

    let cancel = CancellationToken::new();
    let is_client_task = tokio::spawn(is_client.clone().run(cancel.clone()));
    let gateway_task = tokio::spawn(gateway.run(store, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested, draining");
    cancel.cancel();

    let _ = is_client_task.await;
    let _ = gateway_task.await;
    Ok(())
}

/// Mirrors the teacher's [`tracing_subscriber`] setup: a compact event
/// format driven by an [`tracing_subscriber::EnvFilter`], defaulting to
/// `log_filter` when `RUST_LOG` isn't set.
fn init_tracing(log_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .parse_lossy(log_filter);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
}
