mod airtable_types;
mod config;
mod error;
mod handlers;
mod relays;
mod resend_types;
mod types;
mod upstream;
mod utils;
mod vapi_types;

use crate::config::Config;
use crate::types::AppState;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

pub mod consts {
    pub const CALL_STARTED_MESSAGE: &str = "Call initiated successfully";
    pub const CONTACT_SUBMITTED_MESSAGE: &str = "Form submitted successfully";
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=%e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; deployments set the environment directly.
    let _ = dotenvy::dotenv();
    let config = Config::from_env().expect("invalid configuration");

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("tower_http", tracing_subscriber::filter::LevelFilter::DEBUG),
            ("receptionist_relay", config.log_level),
        ]));
    tracing::subscriber::set_global_default(subscriber).expect("failed to install subscriber");

    let bind_addr = config.bind_addr;
    info!(config = ?config, "starting relay");
    let app = handlers::router(Arc::new(AppState::new(config)));

    axum::Server::bind(&bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}
