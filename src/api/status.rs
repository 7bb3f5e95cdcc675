//! Bot status endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::{models::BotStatus, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(bot_status))
}

async fn bot_status(State(state): State<AppState>) -> Json<BotStatus> {
    Json(BotStatus {
        online: true,
        uptime_ms: i64::try_from(state.started_at.elapsed().as_millis()).unwrap_or(i64::MAX),
        tenant_count: state.gateway.tenant_count().await,
        actor_count: state.gateway.actor_count().await,
        action_count: state.registry.len(),
        features: state.registry.features(),
    })
}
