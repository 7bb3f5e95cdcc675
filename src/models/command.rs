//! Command catalog and bot status models

use serde::Serialize;

/// Registered action as listed by `GET /commands`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    pub subactions: Vec<String>,
}

/// Bot liveness summary for `GET /status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub online: bool,
    pub uptime_ms: i64,
    pub tenant_count: usize,
    pub actor_count: usize,
    pub action_count: usize,
    pub features: Vec<String>,
}
