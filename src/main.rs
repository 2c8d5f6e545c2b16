//! frame-delivery - localized content delivery API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frame_delivery::{
    config::Args,
    server::{self, AppState},
    upstream::{HttpUpstream, Upstream},
    Delivery,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    let json_logs = args.json_logs();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("frame_delivery={},info", log_level).into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  frame-delivery {}", env!("CARGO_PKG_VERSION"));
    info!("  API version {}", server::API_VERSION);
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Content service: {}", args.content_service_url);
    info!("Menu service: {}", args.menu_service_url);
    info!("Project service: {}", args.project_service_url);
    info!(
        "Limits: page {} / depth {} / fanout {} / request {}ms",
        args.page_limit, args.max_depth, args.fanout, args.request_timeout_ms
    );
    info!(
        "Translations: {}",
        if args.batch_translations { "bulk" } else { "per subject" }
    );
    info!("======================================");

    let client = HttpUpstream::new(args.upstream_config())?;
    let delivery = Delivery::new(Upstream::http(client), args.delivery_config());

    let state = Arc::new(AppState::new(args, delivery));
    server::run(state).await?;

    Ok(())
}
