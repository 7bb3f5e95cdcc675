//! Invocation context
//!
//! Action handlers see one interface regardless of whether they were
//! triggered by a native platform interaction or by the dashboard. The
//! native implementation forwards replies to the platform; the web
//! implementation captures them so they can be returned in the HTTP result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::models::{Actor, CapturedReply, ChannelRef, InvocationOrigin, ReplyKind, RoleRef, Tenant};
use crate::services::gateway::PlatformGateway;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyPhase {
    Pending,
    Deferred,
    Replied,
}

/// State shared by every context implementation
pub struct ContextCore {
    origin: InvocationOrigin,
    tenant: Tenant,
    actor: Actor,
    subaction: Option<String>,
    parameters: HashMap<String, String>,
    gateway: Arc<dyn PlatformGateway>,
    phase: Mutex<ReplyPhase>,
}

impl ContextCore {
    pub fn new(
        origin: InvocationOrigin,
        tenant: Tenant,
        actor: Actor,
        subaction: Option<String>,
        parameters: HashMap<String, String>,
        gateway: Arc<dyn PlatformGateway>,
    ) -> Self {
        Self {
            origin,
            tenant,
            actor,
            subaction,
            parameters,
            gateway,
            phase: Mutex::new(ReplyPhase::Pending),
        }
    }

    /// Advance the reply state machine for one response primitive
    fn advance(&self, kind: ReplyKind) -> AppResult<()> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match (kind, *phase) {
            (ReplyKind::Reply, ReplyPhase::Pending) => ReplyPhase::Replied,
            (ReplyKind::Deferred, ReplyPhase::Pending) => ReplyPhase::Deferred,
            (ReplyKind::Reply | ReplyKind::Deferred, _) => {
                return Err(AppError::Handler("interaction has already been acknowledged".to_string()))
            }
            (ReplyKind::FollowUp | ReplyKind::Edit, ReplyPhase::Pending) => {
                return Err(AppError::Handler("interaction has not been acknowledged yet".to_string()))
            }
            (ReplyKind::Edit, _) => ReplyPhase::Replied,
            (ReplyKind::FollowUp, current) => current,
        };
        *phase = next;
        Ok(())
    }
}

/// Parameter accessors, tenant-scoped resolvers and response primitives
#[async_trait]
pub trait InvocationContext: Send + Sync {
    fn core(&self) -> &ContextCore;

    /// Emit one response primitive on this context's transport
    async fn deliver(&self, reply: CapturedReply) -> AppResult<()>;

    fn origin(&self) -> InvocationOrigin {
        self.core().origin
    }

    fn tenant(&self) -> &Tenant {
        &self.core().tenant
    }

    fn actor(&self) -> &Actor {
        &self.core().actor
    }

    fn subaction(&self) -> Option<&str> {
        self.core().subaction.as_deref()
    }

    fn get_string(&self, name: &str) -> Option<&str> {
        self.core()
            .parameters
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn get_integer(&self, name: &str) -> AppResult<Option<i64>> {
        self.get_string(name)
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::invalid(format!("parameter '{}' must be an integer", name)))
            })
            .transpose()
    }

    fn get_boolean(&self, name: &str) -> AppResult<Option<bool>> {
        self.get_string(name)
            .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(AppError::invalid(format!("parameter '{}' must be a boolean", name))),
            })
            .transpose()
    }

    fn require_string(&self, name: &str) -> AppResult<&str> {
        self.get_string(name)
            .ok_or_else(|| AppError::invalid(format!("missing parameter '{}'", name)))
    }

    fn require_integer(&self, name: &str) -> AppResult<i64> {
        self.get_integer(name)?
            .ok_or_else(|| AppError::invalid(format!("missing parameter '{}'", name)))
    }

    /// Resolve a channel id parameter inside the invoking tenant
    async fn get_channel(&self, name: &str) -> AppResult<Option<ChannelRef>> {
        let Some(id) = self.get_string(name) else {
            return Ok(None);
        };
        let core = self.core();
        core.gateway
            .channel(&core.tenant.id, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::invalid(format!("channel '{}' not found", id)))
    }

    async fn get_role(&self, name: &str) -> AppResult<Option<RoleRef>> {
        let Some(id) = self.get_string(name) else {
            return Ok(None);
        };
        let core = self.core();
        core.gateway
            .role(&core.tenant.id, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::invalid(format!("role '{}' not found", id)))
    }

    async fn get_user(&self, name: &str) -> AppResult<Option<Actor>> {
        let Some(id) = self.get_string(name) else {
            return Ok(None);
        };
        let core = self.core();
        core.gateway
            .member(&core.tenant.id, id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::invalid(format!("user '{}' is not a member of this server", id)))
    }

    async fn reply(&self, content: &str, ephemeral: bool) -> AppResult<()> {
        self.core().advance(ReplyKind::Reply)?;
        self.deliver(CapturedReply {
            kind: ReplyKind::Reply,
            content: Some(content.to_string()),
            ephemeral,
        })
        .await
    }

    async fn defer_reply(&self, ephemeral: bool) -> AppResult<()> {
        self.core().advance(ReplyKind::Deferred)?;
        self.deliver(CapturedReply {
            kind: ReplyKind::Deferred,
            content: None,
            ephemeral,
        })
        .await
    }

    async fn follow_up(&self, content: &str, ephemeral: bool) -> AppResult<()> {
        self.core().advance(ReplyKind::FollowUp)?;
        self.deliver(CapturedReply {
            kind: ReplyKind::FollowUp,
            content: Some(content.to_string()),
            ephemeral,
        })
        .await
    }

    async fn edit_reply(&self, content: &str) -> AppResult<()> {
        self.core().advance(ReplyKind::Edit)?;
        self.deliver(CapturedReply {
            kind: ReplyKind::Edit,
            content: Some(content.to_string()),
            ephemeral: false,
        })
        .await
    }
}

/// Context for dashboard-originated invocations; replies are captured
pub struct WebContext {
    core: ContextCore,
    replies: Mutex<Vec<CapturedReply>>,
}

impl WebContext {
    pub fn new(core: ContextCore) -> Self {
        Self {
            core,
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn take_replies(&self) -> Vec<CapturedReply> {
        std::mem::take(&mut *self.replies.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl InvocationContext for WebContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    async fn deliver(&self, reply: CapturedReply) -> AppResult<()> {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reply);
        Ok(())
    }
}

/// Native interaction transport (the platform's reply endpoints)
#[async_trait]
pub trait NativeResponder: Send + Sync {
    async fn send(&self, reply: CapturedReply) -> AppResult<()>;
}

/// Context for native platform interactions; replies go to the platform
pub struct NativeContext {
    core: ContextCore,
    responder: Arc<dyn NativeResponder>,
}

impl NativeContext {
    pub fn new(core: ContextCore, responder: Arc<dyn NativeResponder>) -> Self {
        Self { core, responder }
    }
}

#[async_trait]
impl InvocationContext for NativeContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    async fn deliver(&self, reply: CapturedReply) -> AppResult<()> {
        self.responder
            .send(reply)
            .await
            .map_err(|e| AppError::Transport(format!("failed to deliver reply: {}", e)))
    }
}
