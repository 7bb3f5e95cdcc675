//! Recent activity models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounded, non-durable record of one invocation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub action_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subaction: Option<String>,
    pub tenant_id: String,
    pub actor_id: String,
    pub actor_display_name: String,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub success: bool,
}
