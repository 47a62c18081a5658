use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapter;
mod cli;
mod config;
mod core;
mod errors;
mod store;

use adapter::AdapterState;
use core::signature::SystemClock;
use core::Authorizer;
use store::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "edge_authz=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();
    let port = args.port.unwrap_or(cfg.port);

    tracing::info!("connecting to database");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("running migrations");
    db.migrate().await?;

    let authorizer = Authorizer::new(
        Arc::new(db),
        Arc::new(SystemClock),
        cfg.signature_tolerance_secs,
        cfg.repository_timeout(),
    );
    let state = Arc::new(AdapterState { authorizer });

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/authorize", any(adapter::authorize_subrequest::<PgStore>))
        .fallback(any(adapter::authorize_subrequest::<PgStore>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "edge-authzd listening");
    axum::serve(listener, app).await?;

    Ok(())
}
