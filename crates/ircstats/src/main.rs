// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ircstats CLI
//!
//! # Usage
//!
//! ```bash
//! # Run with a configuration file
//! ircstats --config ircstats.toml
//!
//! # Override the HTTP bind address
//! ircstats --config ircstats.toml --bind 127.0.0.1:9000
//!
//! # Generate / check configuration
//! ircstats gen-config --output ircstats.toml
//! ircstats validate --config ircstats.toml
//! ```

use clap::{Parser, Subcommand};
use ircstats::http::{self, AppState};
use ircstats::{
    Config, InfluxSink, RefreshPolicy, RefreshScheduler, Resolver, SnapshotBuilder, SnapshotStore,
    UserCache, XmlRpcSession,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// IRC services statistics collector
#[derive(Parser, Debug)]
#[command(name = "ircstats")]
#[command(about = "Cached statistics snapshots of an Atheme services network")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// HTTP bind address (overrides [http] bind)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = Config::from_file(&args.config)?;
    let bind = args.bind.unwrap_or(config.http.bind);

    let session = Arc::new(XmlRpcSession::new(&config.rpc)?);
    let cache = Arc::new(UserCache::new(config.cache.capacity, config.cache.ttl()));
    let resolver = Resolver::new(Arc::clone(&session), Arc::clone(&cache));
    let builder = SnapshotBuilder::new(Arc::clone(&session), resolver, config.ircops.clone());
    let store = Arc::new(SnapshotStore::new());

    let mut scheduler = RefreshScheduler::new(
        builder,
        Arc::clone(&store),
        RefreshPolicy::from(&config.refresh),
    );
    if let Some(sink) = InfluxSink::from_config(&config.influx)? {
        info!("InfluxDB metrics enabled ({})", sink.write_url());
        scheduler = scheduler.with_metrics(sink);
    }
    let shutdown = scheduler.shutdown_handle();

    info!(
        "ircstats v{} polling {}",
        env!("CARGO_PKG_VERSION"),
        session.endpoint()
    );

    let mut refresh = tokio::spawn(async move { scheduler.run().await });

    // Serve nothing until the first snapshot exists.
    tokio::select! {
        _ = store.wait_ready() => {}
        result = &mut refresh => {
            return match result? {
                Ok(()) => Ok(()),
                Err(e) => {
                    error!("{}", e);
                    Err(e.into())
                }
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted before first snapshot");
            shutdown.shutdown();
            return Ok(());
        }
    }

    let state = Arc::new(AppState {
        store,
        rpc: session,
        cache,
    });
    let app = http::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("HTTP API listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    shutdown.shutdown();
    refresh.await??;
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(&output, Config::example())?;
    println!("Generated example configuration: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&config_path)?;

    println!("Configuration is valid!");
    println!();
    println!("Services:  {}", config.rpc.url());
    println!("Operators: {}", config.ircops.join(", "));
    println!(
        "Refresh:   every {}s (startup backoff {}s, {} attempts)",
        config.refresh.interval_secs,
        config.refresh.backoff_secs,
        config.refresh.max_startup_failures
    );
    println!(
        "Cache:     {} users, {}s TTL",
        config.cache.capacity, config.cache.ttl_secs
    );
    println!(
        "Metrics:   {}",
        if config.influx.is_enabled() {
            config.influx.endpoint.as_str()
        } else {
            "disabled"
        }
    );

    Ok(())
}
