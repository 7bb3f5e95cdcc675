//! Room-scoped pub/sub bridge between dashboards and the bot

pub mod hub;
pub mod session;

pub use hub::{BridgeConnection, BridgeHub};
pub use session::{
    BridgeSession, LinkSink, LocalTransport, ReconnectPolicy, SessionState, SubscriptionId, Transport,
    TransportLink,
};
