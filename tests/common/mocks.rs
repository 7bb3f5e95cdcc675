//! Mock collaborators for testing
//!
//! Provides a recording responder for the native invocation path and a few
//! scripted action handlers for exercising the adapter's audit policy.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use guild_bridge::models::{AuditAction, CapturedReply};
use guild_bridge::services::{ActionHandler, ActionOutcome, InvocationContext, NativeResponder};
use guild_bridge::utils::{AppError, AppResult};

/// Native responder that keeps every reply it is asked to send
#[derive(Default)]
pub struct RecordingResponder {
    sent: Mutex<Vec<CapturedReply>>,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<CapturedReply> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NativeResponder for RecordingResponder {
    async fn send(&self, reply: CapturedReply) -> AppResult<()> {
        self.sent.lock().unwrap().push(reply);
        Ok(())
    }
}

/// Action whose handler always fails
pub struct FailingAction;

#[async_trait]
impl ActionHandler for FailingAction {
    fn name(&self) -> &'static str {
        "explode"
    }

    fn description(&self) -> &'static str {
        "Always fails"
    }

    async fn execute(&self, _ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        Err(AppError::Handler("boom".to_string()))
    }
}

/// Action behind a feature flag that echoes its `text` parameter
pub struct EchoAction;

#[async_trait]
impl ActionHandler for EchoAction {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Repeat a message"
    }

    fn feature(&self) -> Option<&'static str> {
        Some("fun")
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let text = ctx.require_string("text")?.to_string();
        ctx.reply(&text, false).await?;
        Ok(ActionOutcome::new(AuditAction::CommandExecute, text))
    }
}
