//! Business logic services

pub mod actions;
pub mod adapter;
pub mod audit;
pub mod bot_sync;
pub mod bridge;
pub mod context;
pub mod features;
pub mod gateway;
pub mod history;
pub mod retention;

pub use actions::{ActionHandler, ActionOutcome, ActionRegistry, BuiltinDeps};
pub use adapter::CommandAdapter;
pub use audit::AuditStore;
pub use bridge::{BridgeHub, BridgeSession, LocalTransport, ReconnectPolicy, SessionState};
pub use context::{InvocationContext, NativeContext, NativeResponder, WebContext};
pub use features::FeatureFlags;
pub use gateway::{PlatformGateway, StaticGateway};
pub use history::HistoryBuffer;
