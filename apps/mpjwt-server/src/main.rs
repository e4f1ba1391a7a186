#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! MP-JWT demo server.
//!
//! Serves the `/endp` roles endpoint behind bearer authentication.

mod endpoints;
mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mpjwt_auth::{JwtAuthConfig, JwtAuthLayer, JwtAuthMechanism, RoutePolicy};
use tower_http::trace::TraceLayer;

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "mpjwt-server", version, about = "MP-JWT bearer authentication demo server")]
struct Args {
    /// YAML configuration file; `MPJWT_*` environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_format)?;

    let config = JwtAuthConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let registry = Arc::new(
        mpjwt_inject::bootstrap_registered().context("invalid claim injection points")?,
    );
    let mechanism = JwtAuthMechanism::from_config(&config).context("invalid authentication settings")?;
    let policy = RoutePolicy::from_config(&config).context("invalid public routes")?;
    let issuer = mechanism.auth_context().issuer().to_owned();

    let app = endpoints::router(&registry)
        .context("failed to build the roles endpoint")?
        .layer(JwtAuthLayer::new(mechanism, policy).with_registry(registry))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(%issuer, "Listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
