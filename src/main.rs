use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    auth::Sessions,
    config::{Config, StartArgs},
    remote::HttpDocumentService,
    state::{AccessPolicy, AppState},
};

pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod permission;
pub mod remote;
pub mod router;
pub mod state;
pub mod ui_control;
pub mod visibility;
pub mod workflow;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let StartArgs {
        config_path,
        address: host,
        port,
        log_level: level,
    } = StartArgs::parse();

    tracing_subscriber::fmt().with_max_level(level).init();

    let addr = format!("{host}:{port}");

    let mut config = Config::read(config_path).expect("invalid config file");

    if let Ok(key) = std::env::var("QDOCS_API_KEY") {
        config.api.api_key = Some(key);
    }

    if config.api.api_key.is_none() {
        warn!("No API key configured, calls to {} are unauthenticated", config.api.base_url);
    }

    let policy = AccessPolicy::from_config(&config).expect("invalid permission path in config");

    let service = Arc::new(HttpDocumentService::new(config.api.clone()));
    let sessions = Sessions::new(config.session.clone());

    let state = AppState::new(service, sessions, policy);

    info!("Now listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("error while starting TCP listener");

    axum::serve(listener, router::router(state))
        .await
        .expect("error while starting server");
}
