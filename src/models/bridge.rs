//! Pub/sub bridge wire models
//!
//! Every frame on the bridge, in either direction, is an [`Envelope`]:
//! `{ "event": <name>, "data": <payload> }`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::utils::{validation, AppError};

/// Event vocabulary shared by dashboards and the bot
pub mod events {
    /// client -> bridge: join a tenant room
    pub const JOIN_GUILD: &str = "join_guild";
    /// client -> bridge: leave a tenant room
    pub const LEAVE_GUILD: &str = "leave_guild";
    /// client -> bridge: settings edited in the dashboard
    pub const SETTINGS_UPDATE: &str = "settings_update";
    /// bridge -> clients: room-scoped settings broadcast
    pub const SETTINGS_CHANGED: &str = "settings_changed";
    /// bot -> clients: an action finished (successfully or not)
    pub const COMMAND_EXECUTED: &str = "command_executed";
    /// bridge -> one client: a frame it sent was rejected
    pub const ERROR: &str = "error";

    /// Events only the bridge itself may emit
    pub const BRIDGE_ONLY: [&str; 3] = [SETTINGS_CHANGED, COMMAND_EXECUTED, ERROR];

    pub fn is_bridge_only(event: &str) -> bool {
        BRIDGE_ONLY.contains(&event)
    }
}

/// Identifier of one live bridge connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One labelled payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// `settings_update` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(alias = "guildId")]
    pub tenant_id: String,
    pub settings: Value,
}

/// `settings_changed` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChanged {
    pub tenant_id: String,
    pub settings: Value,
    pub timestamp: i64,
}

/// `command_executed` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecuted {
    pub tenant_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subaction: Option<String>,
    pub actor_id: String,
    pub success: bool,
    pub timestamp: i64,
}

/// A client request to the bridge, decoded from an [`Envelope`]
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Join(String),
    Leave(String),
    SettingsUpdate(SettingsUpdate),
    Publish {
        tenant_id: String,
        event: String,
        payload: Value,
    },
}

impl ClientCommand {
    /// Decode a client frame.
    ///
    /// Room requests accept either a bare tenant id string or
    /// `{ "tenantId": ... }`. Any other event must name its tenant in
    /// `data.tenantId`.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, AppError> {
        let Envelope { event, data } = envelope;
        match event.as_str() {
            events::JOIN_GUILD => Ok(ClientCommand::Join(room_argument(&data)?)),
            events::LEAVE_GUILD => Ok(ClientCommand::Leave(room_argument(&data)?)),
            events::SETTINGS_UPDATE => {
                let update: SettingsUpdate = serde_json::from_value(data)?;
                ensure_identifier(&update.tenant_id)?;
                Ok(ClientCommand::SettingsUpdate(update))
            }
            _ => {
                ensure_client_event(&event)?;
                if !validation::validate_event_name(&event) {
                    return Err(AppError::invalid(format!("invalid event name '{}'", event)));
                }
                let tenant_id = data
                    .get("tenantId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| AppError::invalid("event data must include tenantId"))?;
                ensure_identifier(&tenant_id)?;
                Ok(ClientCommand::Publish {
                    tenant_id,
                    event,
                    payload: data,
                })
            }
        }
    }
}

/// Reject event names reserved for bridge -> client traffic
pub fn ensure_client_event(event: &str) -> Result<(), AppError> {
    if events::is_bridge_only(event) {
        Err(AppError::invalid(format!("'{}' cannot be sent by clients", event)))
    } else {
        Ok(())
    }
}

fn room_argument(data: &Value) -> Result<String, AppError> {
    let tenant_id = match data {
        Value::String(id) => id.clone(),
        Value::Object(map) => map
            .get("tenantId")
            .or_else(|| map.get("guildId"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::invalid("room request must include tenantId"))?,
        _ => return Err(AppError::invalid("room request must include tenantId")),
    };
    ensure_identifier(&tenant_id)?;
    Ok(tenant_id)
}

fn ensure_identifier(id: &str) -> Result<(), AppError> {
    if validation::validate_identifier(id) {
        Ok(())
    } else {
        Err(AppError::invalid(format!("invalid tenant id '{}'", id)))
    }
}
