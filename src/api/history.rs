//! Recent activity endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{models::HistoryEntry, utils::AppError, AppState};

const DEFAULT_LIMIT: usize = 20;

pub fn routes() -> Router<AppState> {
    Router::new().route("/history", get(recent_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    #[serde(alias = "guildId")]
    pub tenant_id: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

async fn recent_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::invalid(e.body_text()))?;
    let limit = match params.limit {
        Some(0) => return Err(AppError::invalid("limit must be greater than 0")),
        Some(limit) => limit.min(state.history.capacity()),
        None => DEFAULT_LIMIT,
    };

    Ok(Json(HistoryResponse {
        entries: state.history.recent(&params.tenant_id, limit),
    }))
}
