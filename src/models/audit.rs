//! Audit log models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::utils::AppError;

/// Kinds of privileged action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    SettingsUpdate,
    RoleCreate,
    RoleDelete,
    ModerationBan,
    ModerationKick,
    EconomyTransfer,
    MarketplaceListing,
    CommandExecute,
    Other,
}

impl AuditAction {
    pub const ALL: [AuditAction; 9] = [
        AuditAction::SettingsUpdate,
        AuditAction::RoleCreate,
        AuditAction::RoleDelete,
        AuditAction::ModerationBan,
        AuditAction::ModerationKick,
        AuditAction::EconomyTransfer,
        AuditAction::MarketplaceListing,
        AuditAction::CommandExecute,
        AuditAction::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SettingsUpdate => "settings-update",
            AuditAction::RoleCreate => "role-create",
            AuditAction::RoleDelete => "role-delete",
            AuditAction::ModerationBan => "moderation-ban",
            AuditAction::ModerationKick => "moderation-kick",
            AuditAction::EconomyTransfer => "economy-transfer",
            AuditAction::MarketplaceListing => "marketplace-listing",
            AuditAction::CommandExecute => "command-execute",
            AuditAction::Other => "other",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AppError::invalid(format!("unknown audit action '{}'", s)))
    }
}

/// Kind of object an audited action was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    User,
    Channel,
    Role,
    Message,
    Guild,
    Other,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "user",
            TargetType::Channel => "channel",
            TargetType::Role => "role",
            TargetType::Message => "message",
            TargetType::Guild => "guild",
            TargetType::Other => "other",
        }
    }

    /// Lenient parse used when reading stored rows
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => TargetType::User,
            "channel" => TargetType::Channel,
            "role" => TargetType::Role,
            "message" => TargetType::Message,
            "guild" => TargetType::Guild,
            _ => TargetType::Other,
        }
    }
}

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditExecutor {
    pub id: String,
    pub display_name: String,
    pub is_automated: bool,
}

/// What an audited action was applied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTarget {
    pub id: String,
    pub display_name: String,
    pub target_type: TargetType,
}

impl AuditTarget {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            target_type,
        }
    }
}

/// A single field diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Builder for the `changes` document of an audit entry
#[derive(Debug, Clone, Default)]
pub struct Changes(BTreeMap<String, FieldChange>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, old: impl Into<Value>, new: impl Into<Value>) -> Self {
        self.0.insert(
            name.into(),
            FieldChange {
                old: old.into(),
                new: new.into(),
            },
        );
        self
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self.0).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Audit entry prior to persistence
///
/// `id` and `timestamp_ms` are filled in by the audit store when absent.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub id: Option<Uuid>,
    pub tenant_id: String,
    pub action: AuditAction,
    pub executor: AuditExecutor,
    pub target: Option<AuditTarget>,
    pub changes: Value,
    pub reason: Option<String>,
    pub metadata: Map<String, Value>,
    pub timestamp_ms: Option<i64>,
}

impl NewAuditEntry {
    pub fn new(tenant_id: impl Into<String>, action: AuditAction, executor: AuditExecutor) -> Self {
        Self {
            id: None,
            tenant_id: tenant_id.into(),
            action,
            executor,
            target: None,
            changes: Value::Object(Map::new()),
            reason: None,
            metadata: Map::new(),
            timestamp_ms: None,
        }
    }

    pub fn with_target(mut self, target: AuditTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_changes(mut self, changes: Value) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// Durable, immutable record of a privileged action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub action: AuditAction,
    pub executor: AuditExecutor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,
    pub changes: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub metadata: Map<String, Value>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

/// Filters and paging for audit queries (all filters are ANDed)
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub action: Option<AuditAction>,
    pub actor_id: Option<String>,
    /// Inclusive lower bound (epoch ms)
    pub start_time: Option<i64>,
    /// Inclusive upper bound (epoch ms)
    pub end_time: Option<i64>,
}

impl AuditQuery {
    pub fn first_page(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            ..Default::default()
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            pages: (total + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total: i64,
    pub by_action: BTreeMap<String, i64>,
}
