mod auth;
mod burst;
mod config;
mod cost;
mod global_cap;
mod guard;
mod handlers;
mod ledger;
mod metrics;
mod models;
mod session;
mod state;
mod sweeper;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{AuthVerifier, DisabledAuth, HttpAuthVerifier};
use crate::config::Args;
use crate::state::AppState;
use crate::upstream::HttpAgentBackend;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = reqwest::Client::new();

    let auth: Arc<dyn AuthVerifier> = match &args.auth_url {
        Some(url) => Arc::new(HttpAuthVerifier::new(client.clone(), url.clone())),
        None => Arc::new(DisabledAuth),
    };
    let backend = Arc::new(HttpAgentBackend::new(client, args.upstream_url.clone()));

    // all guard state lives in one object handed to handlers by Arc
    let state = Arc::new(AppState::new(&args, auth, backend));

    // background cleanup of expired counters
    let sweep_state = state.clone();
    let sweep_every = Duration::from_secs(args.sweep_interval);
    tokio::spawn(async move {
        sweeper::sweep_loop(sweep_state, sweep_every).await;
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("gateway listening on http://localhost:{}", args.port);
    info!("forwarding agent calls to {}", args.upstream_url);
    info!(
        "anonymous limits: {}/day per caller, {}/day global, {}/min burst, {:.1}c daily cost ceiling",
        args.anonymous_daily_limit,
        args.global_daily_limit,
        args.burst_limit_per_minute,
        args.daily_cost_limit_cents
    );
    axum::serve(listener, app).await.unwrap();
}
