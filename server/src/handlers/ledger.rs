use crate::error::AppError;
use crate::models::ledger::*;
use crate::validation;
use crate::AppState;
use chrono::Utc;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn submit_score(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<ScoreSubmission>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let score = validation::parse_score(&req.score)?;
    let entries = state.ledger.lock().await.submit_score(&req.player, score).await?;
    Ok(HttpResponse::Ok().json(&entries))
}

pub async fn get_current_standings(
    state: web::types::State<Arc<AppState>>,
) -> Result<HttpResponse, AppError> {
    let ledger = state.ledger.lock().await;
    let view = PeriodView {
        game: state.active_game.clone(),
        period_start: ledger.period_start(),
        next_reset: ledger.next_reset(Utc::now()),
        scores: ledger.current_standings(),
    };
    Ok(HttpResponse::Ok().json(&view))
}

pub async fn get_season_standings(
    state: web::types::State<Arc<AppState>>,
) -> Result<HttpResponse, AppError> {
    let standings = state.ledger.lock().await.season_standings();
    Ok(HttpResponse::Ok().json(&standings))
}

pub async fn check_and_roll(
    state: web::types::State<Arc<AppState>>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.ledger.lock().await.check_and_roll(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(&outcome))
}

pub async fn pull_remote(
    state: web::types::State<Arc<AppState>>,
) -> Result<HttpResponse, AppError> {
    let applied = state.ledger.lock().await.pull_remote().await?;
    Ok(HttpResponse::Ok().json(&PullResult { applied }))
}
