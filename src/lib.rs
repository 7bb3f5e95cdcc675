//! Guild Bridge Library
//!
//! Command and settings bridge between a chat-platform bot and its web
//! dashboard: room-scoped pub/sub, a command adapter shared by native and web
//! invocations, an append-only audit log and a recent-activity buffer.

use std::sync::Arc;
use std::time::Instant;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
use services::{
    ActionRegistry, AuditStore, BridgeHub, BuiltinDeps, CommandAdapter, FeatureFlags, HistoryBuffer,
    PlatformGateway,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Database connection pool
    pub db: DbPool,
    /// Chat platform directory
    pub gateway: Arc<dyn PlatformGateway>,
    pub flags: Arc<FeatureFlags>,
    pub history: Arc<HistoryBuffer>,
    pub audit: Arc<AuditStore>,
    pub hub: Arc<BridgeHub>,
    pub registry: Arc<ActionRegistry>,
    pub adapter: Arc<CommandAdapter>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Wire every service from configuration, a migrated pool and a gateway
    pub fn new(config: AppConfig, db: DbPool, gateway: Arc<dyn PlatformGateway>) -> Self {
        let flags = Arc::new(FeatureFlags::from_config(&config.features));
        let history = Arc::new(HistoryBuffer::new(config.history.capacity));
        let audit = Arc::new(AuditStore::new(db.clone(), &config.audit));
        let hub = Arc::new(BridgeHub::new(gateway.clone(), config.bridge.channel_capacity));
        let registry = Arc::new(ActionRegistry::with_builtins(BuiltinDeps {
            pool: db.clone(),
            gateway: gateway.clone(),
            hub: hub.clone(),
            opening_balance: config.economy.opening_balance,
        }));
        let adapter = Arc::new(CommandAdapter::new(
            registry.clone(),
            gateway.clone(),
            flags.clone(),
            audit.clone(),
            history.clone(),
            hub.clone(),
        ));

        Self {
            config: Arc::new(config),
            db,
            gateway,
            flags,
            history,
            audit,
            hub,
            registry,
            adapter,
            started_at: Instant::now(),
        }
    }
}
