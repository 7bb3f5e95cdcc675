//! Command execution API endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    models::{CommandInfo, InvocationRequest, InvocationResult},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/execute-command", post(execute_command))
        .route("/commands", get(list_commands))
}

#[derive(Serialize)]
struct CommandList {
    commands: Vec<CommandInfo>,
}

/// Run an action on behalf of a dashboard user
///
/// Precondition failures map to 4xx responses. A handler failure is a
/// regular `200` response with `success: false`.
async fn execute_command(
    State(state): State<AppState>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::invalid(e.body_text()))?;
    let result = state.adapter.invoke(request).await?;
    Ok(Json(render_result(result)))
}

fn render_result(result: InvocationResult) -> Value {
    if result.success {
        json!({
            "success": true,
            "result": {
                "message": result.message,
                "timestamp": result.timestamp_ms,
                "replies": result.replies,
            }
        })
    } else {
        json!({
            "success": false,
            "error": result.error.unwrap_or(result.message),
            "timestamp": result.timestamp_ms,
        })
    }
}

async fn list_commands(State(state): State<AppState>) -> Json<CommandList> {
    Json(CommandList {
        commands: state.registry.list(),
    })
}
