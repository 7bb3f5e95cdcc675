//! Audit log API endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use chrono::DateTime;
use serde::Deserialize;

use crate::{
    models::{AuditPage, AuditQuery, AuditStats},
    utils::{validation, AppError},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit", get(list_audit))
        .route("/audit/stats", get(audit_stats))
}

/// Query parameters of `GET /audit`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListParams {
    #[serde(alias = "guildId")]
    pub tenant_id: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantParams {
    #[serde(alias = "guildId")]
    pub tenant_id: String,
}

async fn list_audit(
    State(state): State<AppState>,
    params: Result<Query<AuditListParams>, QueryRejection>,
) -> Result<Json<AuditPage>, AppError> {
    let Query(params) = params.map_err(|e| AppError::invalid(e.body_text()))?;
    let query = build_query(&params, state.config.audit.default_page_size)?;
    let page = state.audit.query(&params.tenant_id, query).await?;
    Ok(Json(page))
}

async fn audit_stats(
    State(state): State<AppState>,
    params: Result<Query<TenantParams>, QueryRejection>,
) -> Result<Json<AuditStats>, AppError> {
    let Query(params) = params.map_err(|e| AppError::invalid(e.body_text()))?;
    ensure_tenant(&params.tenant_id)?;
    let stats = state.audit.stats_by_action(&params.tenant_id).await?;
    Ok(Json(stats))
}

fn build_query(params: &AuditListParams, default_page_size: u32) -> Result<AuditQuery, AppError> {
    ensure_tenant(&params.tenant_id)?;

    let page = match params.page {
        None => 1,
        Some(p) if p >= 1 => u32::try_from(p).map_err(|_| AppError::invalid("page is too large"))?,
        Some(_) => return Err(AppError::invalid("page must be 1 or greater")),
    };
    // Values above the maximum are clamped by the audit store
    let page_size = match params.limit {
        None => default_page_size,
        Some(l) if l >= 1 => u32::try_from(l).unwrap_or(u32::MAX),
        Some(_) => return Err(AppError::invalid("limit must be greater than 0")),
    };

    Ok(AuditQuery {
        page,
        page_size,
        action: params.action.as_deref().map(str::parse).transpose()?,
        actor_id: params.user_id.clone().filter(|id| !id.is_empty()),
        start_time: params.start_date.as_deref().map(parse_time).transpose()?,
        end_time: params.end_date.as_deref().map(parse_time).transpose()?,
    })
}

fn ensure_tenant(tenant_id: &str) -> Result<(), AppError> {
    if validation::validate_identifier(tenant_id) {
        Ok(())
    } else {
        Err(AppError::invalid("tenantId is required"))
    }
}

/// Epoch milliseconds or an RFC 3339 timestamp
fn parse_time(raw: &str) -> Result<i64, AppError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| AppError::invalid(format!("invalid date '{}'", raw)))
}
