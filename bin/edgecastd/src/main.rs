mod config;
mod server;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use edgecast::{Gateway, HttpClient};
use tokio::signal;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
struct EdgecastdArgs {
    /// Configuration file
    #[clap(short, long, default_value = "edgecastd.toml", env = "EDGECASTD_CONFIG")]
    config: PathBuf,

    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = EdgecastdArgs::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&args.config)?;
    let http = HttpClient::with_timeout(config.cdn_timeout())?;
    let gateway = Arc::new(Gateway::new(config.gateway_settings(), http));
    for stream in &config.streams {
        gateway
            .add_stream(
                &stream.name,
                &stream.cdn_endpoint,
                stream.protocol,
                stream.mpd_time_offset_ms,
            )
            .with_context(|| format!("Invalid stream {}", stream.name))?;
    }
    gateway.start();

    let app = server::create_router(gateway.clone(), config.server.ingest);
    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    tracing::info!("Listening on {}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gateway.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
