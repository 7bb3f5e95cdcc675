//! Invocation request/result models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::check_identifier;

/// Where an invocation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationOrigin {
    /// Slash command or component interaction on the chat platform
    Native,
    /// `POST /execute-command` from the dashboard
    Web,
}

impl InvocationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationOrigin::Native => "native",
            InvocationOrigin::Web => "web",
        }
    }
}

/// One request to run a named action on behalf of an actor in a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    #[serde(alias = "action")]
    #[validate(length(min = 1, max = 64))]
    pub action_name: String,
    #[serde(alias = "guildId")]
    #[validate(custom(function = "check_identifier"))]
    pub tenant_id: String,
    #[serde(alias = "userId")]
    #[validate(custom(function = "check_identifier"))]
    pub actor_id: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub subaction: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl InvocationRequest {
    pub fn new(
        action_name: impl Into<String>,
        tenant_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
            subaction: None,
            parameters: HashMap::new(),
        }
    }

    pub fn with_subaction(mut self, subaction: impl Into<String>) -> Self {
        self.subaction = Some(subaction.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// How a reply was emitted through the invocation context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyKind {
    Reply,
    Deferred,
    FollowUp,
    Edit,
}

/// Response primitive captured on the web path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedReply {
    pub kind: ReplyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ephemeral: bool,
}

/// Normalized outcome of an invocation, identical for both origins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Replies captured from the handler (web path only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CapturedReply>,
}

impl InvocationResult {
    pub fn success(message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            timestamp_ms,
            replies: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>, timestamp_ms: i64) -> Self {
        let error = error.into();
        Self {
            success: false,
            message: "Command failed".to_string(),
            error: Some(error),
            timestamp_ms,
            replies: Vec::new(),
        }
    }
}
