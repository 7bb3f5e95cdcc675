//! Client side of the bridge
//!
//! A [`BridgeSession`] keeps one logical connection to the hub through a
//! [`Transport`], dispatches inbound events to subscribers, and reconnects
//! on link loss with a bounded number of attempts. Rooms joined through the
//! session are joined again after a successful reconnect. Events published
//! while the link is down are lost.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::hub::BridgeHub;
use crate::config::BridgeConfig;
use crate::models::{events, ClientCommand, ConnectionId, Envelope, SettingsUpdate};
use crate::utils::{AppError, AppResult};

/// Observable connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Outbound half of an open link
#[async_trait]
pub trait LinkSink: Send + Sync {
    async fn send(&self, command: ClientCommand) -> AppResult<()>;

    async fn close(&self);
}

/// An established link: commands go out through `sink`, events arrive on
/// `events` until the link drops
pub struct TransportLink {
    pub sink: Box<dyn LinkSink>,
    pub events: mpsc::Receiver<Envelope>,
}

/// Something able to open links to the hub
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self) -> AppResult<TransportLink>;
}

/// In-process transport straight into a [`BridgeHub`]
pub struct LocalTransport {
    hub: Arc<BridgeHub>,
    privileged: bool,
}

impl LocalTransport {
    pub fn new(hub: Arc<BridgeHub>) -> Self {
        Self {
            hub,
            privileged: false,
        }
    }

    /// Transport for the bot's own session
    pub fn privileged(hub: Arc<BridgeHub>) -> Self {
        Self {
            hub,
            privileged: true,
        }
    }
}

struct LocalSink {
    hub: Arc<BridgeHub>,
    id: ConnectionId,
}

#[async_trait]
impl LinkSink for LocalSink {
    async fn send(&self, command: ClientCommand) -> AppResult<()> {
        self.hub.handle(self.id, command).map(|_| ())
    }

    async fn close(&self) {
        self.hub.disconnect(self.id);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn open(&self) -> AppResult<TransportLink> {
        let connection = self.hub.connect(self.privileged).await;
        Ok(TransportLink {
            sink: Box::new(LocalSink {
                hub: self.hub.clone(),
                id: connection.id,
            }),
            events: connection.events,
        })
    }
}

/// Fixed-delay, bounded reconnect schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            max_attempts: config.reconnect_attempts,
            delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// Handle returned by [`BridgeSession::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

struct SessionInner<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    state: watch::Sender<SessionState>,
    sink: tokio::sync::Mutex<Option<Box<dyn LinkSink>>>,
    rooms: Mutex<HashSet<String>>,
    subscribers: Mutex<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
    next_subscription: AtomicU64,
    /// Bumped by every explicit connect/disconnect so stale link tasks exit
    generation: AtomicU64,
}

pub struct BridgeSession<T: Transport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for BridgeSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> BridgeSession<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(SessionState::Closed);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                policy,
                state,
                sink: tokio::sync::Mutex::new(None),
                rooms: Mutex::new(HashSet::new()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscription: AtomicU64::new(1),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Open the link. A no-op when the session is already open.
    pub async fn connect(&self) -> AppResult<()> {
        if self.state() == SessionState::Open {
            return Ok(());
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let events = establish(&self.inner).await?;
        tokio::spawn(run_link(self.inner.clone(), events, generation));
        Ok(())
    }

    /// Close the link without scheduling a reconnect
    pub async fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.inner.sink.lock().await.take() {
            sink.close().await;
        }
        self.inner.state.send_replace(SessionState::Closed);
    }

    /// Join a tenant room; the room is re-joined after reconnects
    pub async fn join_room(&self, tenant_id: &str) -> AppResult<()> {
        self.send(ClientCommand::Join(tenant_id.to_string())).await?;
        self.inner
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_id.to_string());
        Ok(())
    }

    pub async fn leave_room(&self, tenant_id: &str) -> AppResult<()> {
        self.inner
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tenant_id);
        self.send(ClientCommand::Leave(tenant_id.to_string())).await
    }

    /// Fire-and-forget publish into a tenant room
    pub async fn publish(&self, event: &str, tenant_id: &str, payload: Value) -> AppResult<()> {
        let command = if event == events::SETTINGS_UPDATE {
            ClientCommand::SettingsUpdate(SettingsUpdate {
                tenant_id: tenant_id.to_string(),
                settings: payload,
            })
        } else {
            ClientCommand::Publish {
                tenant_id: tenant_id.to_string(),
                event: event.to_string(),
                payload,
            }
        };
        self.send(command).await
    }

    /// Register a handler for one event name
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(handlers) = subscribers.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(event);
        }
        removed
    }

    async fn send(&self, command: ClientCommand) -> AppResult<()> {
        let sink = self.inner.sink.lock().await;
        match sink.as_ref() {
            Some(sink) => sink.send(command).await,
            None => Err(AppError::Transport("bridge session is not connected".to_string())),
        }
    }
}

/// Open a link, mark the session open and restore room memberships
async fn establish<T: Transport>(inner: &Arc<SessionInner<T>>) -> AppResult<mpsc::Receiver<Envelope>> {
    inner.state.send_replace(SessionState::Connecting);

    let link = match inner.transport.open().await {
        Ok(link) => link,
        Err(e) => {
            inner.state.send_replace(SessionState::Closed);
            return Err(match e {
                AppError::Transport(_) => e,
                other => AppError::Transport(other.to_string()),
            });
        }
    };

    let rooms: Vec<String> = inner
        .rooms
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .cloned()
        .collect();
    for tenant_id in rooms {
        if let Err(e) = link.sink.send(ClientCommand::Join(tenant_id.clone())).await {
            warn!(tenant_id = %tenant_id, "Failed to re-join room: {}", e);
        }
    }

    *inner.sink.lock().await = Some(link.sink);
    inner.state.send_replace(SessionState::Open);
    debug!("Bridge session open");
    Ok(link.events)
}

/// Pump inbound events until the link drops, then try to reconnect
async fn run_link<T: Transport>(inner: Arc<SessionInner<T>>, mut events: mpsc::Receiver<Envelope>, generation: u64) {
    loop {
        while let Some(envelope) = events.recv().await {
            dispatch(&inner, envelope);
        }

        if inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        warn!("Bridge link lost");
        inner.sink.lock().await.take();
        inner.state.send_replace(SessionState::Closed);

        match reconnect(&inner, generation).await {
            Some(next) => events = next,
            None => return,
        }
    }
}

async fn reconnect<T: Transport>(inner: &Arc<SessionInner<T>>, generation: u64) -> Option<mpsc::Receiver<Envelope>> {
    for attempt in 1..=inner.policy.max_attempts {
        tokio::time::sleep(inner.policy.delay).await;
        if inner.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        match establish(inner).await {
            Ok(events) => {
                info!(attempt, "Bridge session reconnected");
                return Some(events);
            }
            Err(e) => warn!(attempt, "Reconnect attempt failed: {}", e),
        }
    }
    warn!(
        "Bridge session closed after {} reconnect attempt(s)",
        inner.policy.max_attempts
    );
    None
}

fn dispatch<T: Transport>(inner: &SessionInner<T>, envelope: Envelope) {
    let handlers: Vec<EventHandler> = inner
        .subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&envelope.event)
        .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
        .unwrap_or_default();

    for handler in handlers {
        handler(envelope.data.clone());
    }
}
