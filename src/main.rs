//! ==============================================================================
//! main.rs - hive monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     runs the beehive dashboard: a simulated sensor feed, threshold alerts,
//!     and a chat assistant backed by an external text generation api.
//!
//! responsibilities:
//!     - load configuration (config/hive.toml) and set up logging
//!     - seed the telemetry state and start the simulation ticker
//!     - build the chat widget around the generative api client
//!     - serve the dashboard until ctrl-c, then stop every background task
//!
//! relationships:
//!     - uses: config.rs, simulator.rs, alerts.rs, chat.rs, llm.rs, dashboard.rs
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                     hive monitor (this file)                 │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ ticker      │  │ web server  │  │ chat requests       │  │
//!     │  │ (5s cycle)  │  │ (port 3000) │  │ (one task per send) │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//!     │         │ write          │ read / send        │ append      │
//!     │         ▼                ▼                    ▼             │
//!     │   ┌───────────┐                        ┌────────────┐       │
//!     │   │ telemetry │                        │ chat state │       │
//!     │   └───────────┘                        └────────────┘       │
//!     └──────────────────────────────────────────────┬──────────────┘
//!                                                    │ https
//!                                                    ▼
//!                                        generative language api
//!
//! ==============================================================================

mod alerts;
mod chat;
mod config;
mod dashboard;
mod domain;
mod llm;
mod simulator;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Hive Monitor - simulated beehive telemetry");
    println!("===========================================================");

    // step 1: load configuration
    let config = config::HiveConfig::load_or_default();
    config.print_summary();

    // step 2: logging, RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: telemetry state and the simulation ticker
    let telemetry = simulator::Telemetry::from_config(&config, simulator::clock_label()).shared();
    let rng = match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let period = Duration::from_secs(config.simulation.interval_seconds.max(1));
    let ticker = simulator::Ticker::spawn(
        simulator::Simulator::from_config(rng, &config),
        telemetry.clone(),
        period,
        config.logging.show_sensor_data,
    );
    tracing::info!("[RUNTIME] Simulating hive sensors ({}s interval)", period.as_secs());

    // step 4: chat widget
    let chat = chat::ChatWidget::new(llm::GenerativeClient::new(&config.chat), config.chat.persona.as_str());

    // step 5: web server until ctrl-c
    let state = dashboard::AppState {
        telemetry,
        chat: chat.clone(),
        refresh_seconds: period.as_secs(),
    };
    tracing::info!("[STARTUP] Dashboard live at http://{}", config.server.bind);
    let served = dashboard::run_server(state, &config.server.bind, shutdown_signal()).await;

    // step 6: tear down background work
    ticker.stop();
    chat.shutdown().await;
    tracing::info!("[SHUTDOWN] Ticker stopped, pending chat requests cancelled");

    if let Err(e) = &served {
        tracing::error!("[ERROR] {:#}", e);
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[ERROR] Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[SHUTDOWN] Ctrl-C received");
}
