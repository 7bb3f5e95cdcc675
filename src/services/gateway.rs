//! Platform gateway
//!
//! The chat platform's directory (tenants, members, channels, roles) and the
//! handful of mutations the built-in actions perform. Everything that needs
//! the platform receives a gateway explicitly; there is no global client.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::PlatformConfig;
use crate::models::{Actor, ChannelKind, ChannelRef, RoleRef, Tenant};
use crate::utils::{AppError, AppResult};

/// Access to the chat platform for a single bot identity
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// A tenant the bot can currently reach
    async fn tenant(&self, tenant_id: &str) -> AppResult<Option<Tenant>>;

    /// A member of a tenant
    async fn member(&self, tenant_id: &str, user_id: &str) -> AppResult<Option<Actor>>;

    async fn channel(&self, tenant_id: &str, channel_id: &str) -> AppResult<Option<ChannelRef>>;

    async fn role(&self, tenant_id: &str, role_id: &str) -> AppResult<Option<RoleRef>>;

    /// Every tenant the bot manages
    async fn tenant_ids(&self) -> Vec<String>;

    async fn tenant_count(&self) -> usize;

    /// Distinct members across all tenants
    async fn actor_count(&self) -> usize;

    async fn ban_member(&self, tenant_id: &str, user_id: &str, reason: Option<&str>) -> AppResult<Actor>;

    async fn kick_member(&self, tenant_id: &str, user_id: &str, reason: Option<&str>) -> AppResult<Actor>;

    async fn create_role(&self, tenant_id: &str, name: &str, color: Option<u32>) -> AppResult<RoleRef>;

    async fn delete_role(&self, tenant_id: &str, role_id: &str) -> AppResult<RoleRef>;
}

#[derive(Debug, Default)]
struct TenantDirectory {
    tenant: Option<Tenant>,
    members: HashMap<String, Actor>,
    channels: HashMap<String, ChannelRef>,
    roles: HashMap<String, RoleRef>,
    banned: HashSet<String>,
}

/// In-memory gateway seeded from configuration
#[derive(Debug, Default)]
pub struct StaticGateway {
    tenants: RwLock<HashMap<String, TenantDirectory>>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the directory from the `platform` configuration section
    pub fn from_config(config: &PlatformConfig) -> Self {
        let mut tenants = HashMap::new();

        for seed in &config.tenants {
            let name = if seed.name.is_empty() {
                seed.id.clone()
            } else {
                seed.name.clone()
            };
            let mut directory = TenantDirectory {
                tenant: Some(Tenant {
                    id: seed.id.clone(),
                    name,
                }),
                ..Default::default()
            };
            for member in &seed.members {
                directory.members.insert(
                    member.id.clone(),
                    Actor {
                        id: member.id.clone(),
                        display_name: member.display_name.clone(),
                        is_automated: member.is_bot,
                    },
                );
            }
            for channel in &seed.channels {
                directory.channels.insert(
                    channel.id.clone(),
                    ChannelRef {
                        id: channel.id.clone(),
                        name: channel.name.clone(),
                        kind: ChannelKind::Text,
                    },
                );
            }
            for role in &seed.roles {
                directory.roles.insert(
                    role.id.clone(),
                    RoleRef {
                        id: role.id.clone(),
                        name: role.name.clone(),
                        color: None,
                    },
                );
            }
            tenants.insert(seed.id.clone(), directory);
        }

        info!("Platform gateway seeded with {} tenant(s)", tenants.len());

        Self {
            tenants: RwLock::new(tenants),
        }
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        let id = tenant.id.clone();
        let mut tenants = self.tenants.write().await;
        tenants.entry(id).or_default().tenant = Some(tenant);
    }

    /// Drop a tenant from the directory (the bot left or lost access)
    pub async fn remove_tenant(&self, tenant_id: &str) {
        self.tenants.write().await.remove(tenant_id);
    }

    pub async fn add_member(&self, tenant_id: &str, actor: Actor) {
        let mut tenants = self.tenants.write().await;
        let directory = tenants.entry(tenant_id.to_string()).or_default();
        directory.banned.remove(&actor.id);
        directory.members.insert(actor.id.clone(), actor);
    }

    pub async fn add_channel(&self, tenant_id: &str, channel: ChannelRef) {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .channels
            .insert(channel.id.clone(), channel);
    }

    pub async fn add_role(&self, tenant_id: &str, role: RoleRef) {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .roles
            .insert(role.id.clone(), role);
    }

    pub async fn is_banned(&self, tenant_id: &str, user_id: &str) -> bool {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .is_some_and(|d| d.banned.contains(user_id))
    }

    async fn remove_member(&self, tenant_id: &str, user_id: &str, ban: bool) -> AppResult<Actor> {
        let mut tenants = self.tenants.write().await;
        let directory = tenants
            .get_mut(tenant_id)
            .filter(|d| d.tenant.is_some())
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))?;
        let actor = directory
            .members
            .remove(user_id)
            .ok_or_else(|| AppError::Handler(format!("User {} is not a member of this server", user_id)))?;
        if ban {
            directory.banned.insert(user_id.to_string());
        }
        Ok(actor)
    }
}

#[async_trait]
impl PlatformGateway for StaticGateway {
    async fn tenant(&self, tenant_id: &str) -> AppResult<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant_id)
            .and_then(|d| d.tenant.clone()))
    }

    async fn member(&self, tenant_id: &str, user_id: &str) -> AppResult<Option<Actor>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant_id)
            .and_then(|d| d.members.get(user_id).cloned()))
    }

    async fn channel(&self, tenant_id: &str, channel_id: &str) -> AppResult<Option<ChannelRef>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant_id)
            .and_then(|d| d.channels.get(channel_id).cloned()))
    }

    async fn role(&self, tenant_id: &str, role_id: &str) -> AppResult<Option<RoleRef>> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant_id)
            .and_then(|d| d.roles.get(role_id).cloned()))
    }

    async fn tenant_ids(&self) -> Vec<String> {
        let tenants = self.tenants.read().await;
        let mut ids: Vec<String> = tenants
            .iter()
            .filter(|(_, d)| d.tenant.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    async fn tenant_count(&self) -> usize {
        self.tenants
            .read()
            .await
            .values()
            .filter(|d| d.tenant.is_some())
            .count()
    }

    async fn actor_count(&self) -> usize {
        let tenants = self.tenants.read().await;
        tenants
            .values()
            .flat_map(|d| d.members.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    async fn ban_member(&self, tenant_id: &str, user_id: &str, reason: Option<&str>) -> AppResult<Actor> {
        let actor = self.remove_member(tenant_id, user_id, true).await?;
        info!(tenant_id, user_id, reason = reason.unwrap_or(""), "Member banned");
        Ok(actor)
    }

    async fn kick_member(&self, tenant_id: &str, user_id: &str, reason: Option<&str>) -> AppResult<Actor> {
        let actor = self.remove_member(tenant_id, user_id, false).await?;
        info!(tenant_id, user_id, reason = reason.unwrap_or(""), "Member kicked");
        Ok(actor)
    }

    async fn create_role(&self, tenant_id: &str, name: &str, color: Option<u32>) -> AppResult<RoleRef> {
        let mut tenants = self.tenants.write().await;
        let directory = tenants
            .get_mut(tenant_id)
            .filter(|d| d.tenant.is_some())
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))?;
        if directory.roles.values().any(|r| r.name == name) {
            return Err(AppError::Handler(format!("A role named '{}' already exists", name)));
        }
        let role = RoleRef {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            color,
        };
        directory.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn delete_role(&self, tenant_id: &str, role_id: &str) -> AppResult<RoleRef> {
        let mut tenants = self.tenants.write().await;
        let directory = tenants
            .get_mut(tenant_id)
            .filter(|d| d.tenant.is_some())
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))?;
        directory
            .roles
            .remove(role_id)
            .ok_or_else(|| AppError::Handler(format!("Role {} does not exist", role_id)))
    }
}
