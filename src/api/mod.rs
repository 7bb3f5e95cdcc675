//! API routes and handlers
//!
//! This module defines all HTTP and WebSocket endpoints and their routing.

use axum::{routing::get, Router};

use crate::{middleware, AppState};

mod audit;
mod commands;
mod health;
mod history;
mod status;
mod ws;

pub use health::*;
pub use ws::ws_handler;

/// Public routes (no credential required)
///
/// `/ws` authenticates itself: a valid credential only upgrades the
/// connection to privileged.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .route("/ws", get(ws::ws_handler))
}

/// Routes guarded by the service credential
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(commands::routes())
        .merge(status::routes())
        .merge(audit::routes())
        .merge(history::routes())
}

/// Full application router with the credential check applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(
            protected_routes().route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::service_auth_middleware,
            )),
        )
        .with_state(state)
}
