// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atendo serve` command implementation.
//!
//! Wires SQLite storage, the change feed, the query cache, and the HTTP
//! gateway together, then serves until interrupted.

use std::sync::Arc;

use atendo_config::model::AtendoConfig;
use atendo_core::AtendoError;
use atendo_gateway::{
    AuthConfig, GatewayState, ServerConfig, Transcriber, TranscriberConfig, start_server,
};
use atendo_storage::Database;
use atendo_sync::{AssignmentService, ChangeFeed, ChangeFeedListener, ConversationQueryService};
use tracing::{debug, info};

/// Runs the `atendo serve` command.
///
/// Starts the gateway with a feed-invalidated query cache behind it and
/// shuts down cleanly on Ctrl-C, checkpointing the database.
pub async fn run_serve(config: AtendoConfig) -> Result<(), AtendoError> {
    init_tracing(&config.service.log_level);

    info!("starting atendo serve");

    let db = Arc::new(
        Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?,
    );
    info!(path = %config.storage.database_path, "storage opened");

    let feed = ChangeFeed::default();
    let query = Arc::new(ConversationQueryService::new(Arc::clone(&db)));
    let listener = ChangeFeedListener::spawn(&feed, query.cache());

    let assignment = Arc::new(AssignmentService::new(Arc::clone(&db), feed.clone()));
    let transcriber = Arc::new(Transcriber::new(
        Arc::clone(&db),
        feed.clone(),
        TranscriberConfig {
            api_url: config.transcription.api_url.clone(),
            api_key: config.transcription.api_key.clone(),
            model: config.transcription.model.clone(),
            prompt: config.transcription.prompt.clone(),
            max_tokens: config.transcription.max_tokens,
        },
    ));

    let state = GatewayState {
        query,
        assignment,
        db: Arc::clone(&db),
        transcriber,
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    tokio::select! {
        result = start_server(&server_config, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    drop(listener);

    // The gateway future and its state are gone at this point; if nothing
    // else holds the database, checkpoint and close it.
    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await?,
        Err(_) => debug!("database still referenced at shutdown, skipping checkpoint"),
    }

    info!("atendo serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atendo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
