mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod validation;

use chrono::{DateTime, Utc};
use config::ServerConfig;
use db::Db;
use ntex::web;
use ntex_cors::Cors;
use services::ledger::LedgerEngine;
use services::mirror::{GistMirror, RemoteMirror};
use services::schedule::ResetSchedule;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Shared by every request handler and the rollover timer.
pub struct AppState {
    pub ledger: Mutex<LedgerEngine>,
    pub active_game: String,
}

#[ntex::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ServerConfig::from_env().map_err(io::Error::other)?;
    let db = Db::open(&config.database_path).map_err(io::Error::other)?;

    let mirror: Option<Box<dyn RemoteMirror>> = match &config.mirror {
        Some(mirror_config) => {
            Some(Box::new(GistMirror::new(mirror_config).map_err(io::Error::other)?))
        }
        None => None,
    };

    let mut ledger = LedgerEngine::open(
        Box::new(db),
        ResetSchedule::new(config.reset_offset),
        mirror,
    )
    .map_err(io::Error::other)?;

    start_ledger(&mut ledger, Utc::now()).await;

    let state = Arc::new(AppState {
        ledger: Mutex::new(ledger),
        active_game: config.active_game.clone(),
    });

    ntex::rt::spawn(rollover_timer(state.clone(), config.rollover_check_interval));

    info!(host = %config.host, port = config.port, "Retro club server starting");

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type"])
                    .max_age(3600)
                    .finish(),
            )
            .route("/api/health", web::get().to(health))
            .route("/api/scores", web::post().to(handlers::ledger::submit_score))
            .route("/api/scores", web::get().to(handlers::ledger::get_current_standings))
            .route("/api/season", web::get().to(handlers::ledger::get_season_standings))
            .route("/api/rollover", web::post().to(handlers::ledger::check_and_roll))
            .route("/api/sync/pull", web::post().to(handlers::ledger::pull_remote))
    })
    .bind(format!("{}:{}", config.host, config.port))?
    .run()
    .await
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Brings the ledger up to date before anything is served. Failures are
/// logged; the rollover timer retries a rollover that could not be saved.
async fn start_ledger(ledger: &mut LedgerEngine, now: DateTime<Utc>) {
    if ledger.mirror_enabled() {
        if let Err(e) = ledger.pull_remote().await {
            warn!(error = %e, "startup pull failed; continuing with local ledger");
        }
    }

    match ledger.check_and_roll(now).await {
        Ok(outcome) if outcome.rolled_over => {
            info!(awards = outcome.awards.len(), "rolled over at startup");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "startup rollover check failed; will retry"),
    }
}

/// Re-runs the rollover check so a long-lived process still closes weeks.
async fn rollover_timer(state: Arc<AppState>, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
    // The first tick fires immediately and startup already checked.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut ledger = state.ledger.lock().await;
        match ledger.check_and_roll(Utc::now()).await {
            Ok(outcome) if outcome.rolled_over => {
                info!(awards = outcome.awards.len(), "scheduled rollover applied");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "scheduled rollover check failed"),
        }
    }
}
