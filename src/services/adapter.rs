//! Command adapter
//!
//! Runs an invocation request against its action handler with the same
//! checks and the same side effects whether it came from a native platform
//! interaction or from the dashboard:
//!
//! 1. resolve action, tenant and actor, and check the feature gate;
//!    any failure here is returned as an error and records nothing
//! 2. run the handler
//! 3. on success append one audit entry, then one history entry
//! 4. on handler failure append only a failed history entry
//! 5. emit `command_executed` into the tenant room

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    events, Actor, AuditExecutor, CommandExecuted, Envelope, HistoryEntry, InvocationOrigin,
    InvocationRequest, InvocationResult, NewAuditEntry, Tenant,
};
use crate::services::actions::{ActionHandler, ActionOutcome, ActionRegistry};
use crate::services::audit::AuditStore;
use crate::services::bridge::BridgeHub;
use crate::services::context::{ContextCore, InvocationContext, NativeContext, NativeResponder, WebContext};
use crate::services::features::FeatureFlags;
use crate::services::gateway::PlatformGateway;
use crate::services::history::HistoryBuffer;
use crate::utils::{now_ms, AppError, AppResult};

/// A request that passed every precondition
struct Resolved {
    handler: Arc<dyn ActionHandler>,
    subaction: Option<String>,
    tenant: Tenant,
    actor: Actor,
}

pub struct CommandAdapter {
    registry: Arc<ActionRegistry>,
    gateway: Arc<dyn PlatformGateway>,
    flags: Arc<FeatureFlags>,
    audit: Arc<AuditStore>,
    history: Arc<HistoryBuffer>,
    hub: Arc<BridgeHub>,
}

impl CommandAdapter {
    pub fn new(
        registry: Arc<ActionRegistry>,
        gateway: Arc<dyn PlatformGateway>,
        flags: Arc<FeatureFlags>,
        audit: Arc<AuditStore>,
        history: Arc<HistoryBuffer>,
        hub: Arc<BridgeHub>,
    ) -> Self {
        Self {
            registry,
            gateway,
            flags,
            audit,
            history,
            hub,
        }
    }

    /// Run a dashboard-originated request; replies are captured into the result
    pub async fn invoke(&self, request: InvocationRequest) -> AppResult<InvocationResult> {
        let resolved = self.resolve(&request).await?;
        let ctx = WebContext::new(self.context_core(InvocationOrigin::Web, &request, &resolved));
        let mut result = self.execute(&request, &resolved, &ctx).await;
        result.replies = ctx.take_replies();
        Ok(result)
    }

    /// Run a native platform interaction; replies go to `responder`
    pub async fn invoke_native(
        &self,
        request: InvocationRequest,
        responder: Arc<dyn NativeResponder>,
    ) -> AppResult<InvocationResult> {
        let resolved = self.resolve(&request).await?;
        let ctx = NativeContext::new(
            self.context_core(InvocationOrigin::Native, &request, &resolved),
            responder,
        );
        Ok(self.execute(&request, &resolved, &ctx).await)
    }

    async fn resolve(&self, request: &InvocationRequest) -> AppResult<Resolved> {
        request.validate()?;

        let (handler, subaction) = self
            .registry
            .resolve(&request.action_name, request.subaction.as_deref())?;

        let tenant = self
            .gateway
            .tenant(&request.tenant_id)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(request.tenant_id.clone()))?;

        let actor = self
            .gateway
            .member(&tenant.id, &request.actor_id)
            .await?
            .ok_or_else(|| AppError::ActorNotInTenant {
                tenant_id: tenant.id.clone(),
                actor_id: request.actor_id.clone(),
            })?;

        if let Some(feature) = handler.feature() {
            if !self.flags.is_enabled(&tenant.id, feature) {
                return Err(AppError::FeatureDisabled {
                    tenant_id: tenant.id.clone(),
                    feature: feature.to_string(),
                });
            }
        }

        Ok(Resolved {
            handler,
            subaction,
            tenant,
            actor,
        })
    }

    fn context_core(&self, origin: InvocationOrigin, request: &InvocationRequest, resolved: &Resolved) -> ContextCore {
        ContextCore::new(
            origin,
            resolved.tenant.clone(),
            resolved.actor.clone(),
            resolved.subaction.clone(),
            request.parameters.clone(),
            self.gateway.clone(),
        )
    }

    async fn execute(
        &self,
        request: &InvocationRequest,
        resolved: &Resolved,
        ctx: &dyn InvocationContext,
    ) -> InvocationResult {
        let action = resolved.handler.name();
        let tenant_id = resolved.tenant.id.as_str();

        let result = match resolved.handler.execute(ctx).await {
            Ok(outcome) => {
                let message = outcome.message.clone();
                match self.audit.append(self.audit_entry(ctx.origin(), resolved, outcome)).await {
                    Ok(entry) => {
                        info!(
                            tenant_id,
                            action,
                            subaction = resolved.subaction.as_deref().unwrap_or(""),
                            actor_id = %resolved.actor.id,
                            audit_id = %entry.id,
                            "Command executed"
                        );
                        self.record_history(resolved, true);
                        InvocationResult::success(message, now_ms())
                    }
                    Err(e) => {
                        // The handler's side effect stands; only the audit record is missing.
                        error!(tenant_id, action, "Failed to append audit entry: {}", e);
                        self.record_history(resolved, false);
                        InvocationResult::failure(e.to_string(), now_ms())
                    }
                }
            }
            Err(e) => {
                warn!(tenant_id, action, actor_id = %request.actor_id, "Command failed: {}", e);
                self.record_history(resolved, false);
                InvocationResult::failure(e.to_string(), now_ms())
            }
        };

        self.emit_executed(resolved, result.success);
        result
    }

    fn audit_entry(&self, origin: InvocationOrigin, resolved: &Resolved, outcome: ActionOutcome) -> NewAuditEntry {
        let mut metadata = outcome.metadata;
        metadata.insert("origin".to_string(), Value::from(origin.as_str()));
        metadata.insert("command".to_string(), Value::from(resolved.handler.name()));
        if let Some(subaction) = &resolved.subaction {
            metadata.insert("subaction".to_string(), Value::from(subaction.as_str()));
        }

        NewAuditEntry {
            id: None,
            tenant_id: resolved.tenant.id.clone(),
            action: outcome.audit_action,
            executor: AuditExecutor {
                id: resolved.actor.id.clone(),
                display_name: resolved.actor.display_name.clone(),
                is_automated: resolved.actor.is_automated,
            },
            target: outcome.target,
            changes: outcome.changes,
            reason: outcome.reason,
            metadata,
            timestamp_ms: None,
        }
    }

    fn record_history(&self, resolved: &Resolved, success: bool) {
        self.history.record(HistoryEntry {
            id: Uuid::now_v7(),
            action_name: resolved.handler.name().to_string(),
            subaction: resolved.subaction.clone(),
            tenant_id: resolved.tenant.id.clone(),
            actor_id: resolved.actor.id.clone(),
            actor_display_name: resolved.actor.display_name.clone(),
            timestamp_ms: now_ms(),
            success,
        });
    }

    fn emit_executed(&self, resolved: &Resolved, success: bool) {
        let event = CommandExecuted {
            tenant_id: resolved.tenant.id.clone(),
            action: resolved.handler.name().to_string(),
            subaction: resolved.subaction.clone(),
            actor_id: resolved.actor.id.clone(),
            success,
            timestamp: now_ms(),
        };
        match serde_json::to_value(&event) {
            Ok(data) => {
                self.hub
                    .broadcast(&event.tenant_id, Envelope::new(events::COMMAND_EXECUTED, data));
            }
            Err(e) => warn!("Failed to encode command_executed event: {}", e),
        }
    }
}
