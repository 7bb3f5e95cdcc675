//! Room registry and fan-out
//!
//! Every live connection owns a bounded outbound queue. Publishing into a
//! room copies the envelope into the queue of each member with `try_send`;
//! a full or closed queue simply misses the event. Delivery is at-most-once
//! and nothing is buffered for connections that are not currently joined.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::models::{ensure_client_event, events, ClientCommand, ConnectionId, Envelope, SettingsChanged};
use crate::services::gateway::PlatformGateway;
use crate::utils::{now_ms, validation, AppError, AppResult};

struct ConnectionHandle {
    sender: mpsc::Sender<Envelope>,
    privileged: bool,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Server side of one accepted connection
pub struct BridgeConnection {
    pub id: ConnectionId,
    pub events: mpsc::Receiver<Envelope>,
}

pub struct BridgeHub {
    gateway: Arc<dyn PlatformGateway>,
    channel_capacity: usize,
    state: Mutex<HubState>,
}

impl BridgeHub {
    pub fn new(gateway: Arc<dyn PlatformGateway>, channel_capacity: usize) -> Self {
        Self {
            gateway,
            channel_capacity: channel_capacity.max(1),
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection.
    ///
    /// Privileged connections (the bot itself) are placed in the room of
    /// every tenant the gateway manages and may publish anywhere.
    pub async fn connect(&self, privileged: bool) -> BridgeConnection {
        let tenants = if privileged {
            self.gateway.tenant_ids().await
        } else {
            Vec::new()
        };

        let id = ConnectionId::new();
        let (sender, events) = mpsc::channel(self.channel_capacity);

        let mut state = self.state();
        for tenant_id in &tenants {
            state.rooms.entry(tenant_id.clone()).or_default().insert(id);
        }
        state.connections.insert(
            id,
            ConnectionHandle {
                sender,
                privileged,
                rooms: tenants.into_iter().collect(),
            },
        );
        drop(state);

        info!(connection_id = %id, privileged, "Bridge connection opened");
        BridgeConnection { id, events }
    }

    /// Join a tenant room; joining twice is a no-op
    pub fn join(&self, id: ConnectionId, tenant_id: &str) -> AppResult<()> {
        ensure_tenant_id(tenant_id)?;
        let mut state = self.state();
        let handle = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| unknown_connection(id))?;
        if handle.rooms.insert(tenant_id.to_string()) {
            state.rooms.entry(tenant_id.to_string()).or_default().insert(id);
            debug!(connection_id = %id, tenant_id, "Joined room");
        }
        Ok(())
    }

    pub fn leave(&self, id: ConnectionId, tenant_id: &str) -> AppResult<()> {
        let mut state = self.state();
        let handle = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| unknown_connection(id))?;
        if handle.rooms.remove(tenant_id) {
            remove_from_room(&mut state.rooms, tenant_id, id);
            debug!(connection_id = %id, tenant_id, "Left room");
        }
        Ok(())
    }

    /// Drop a connection and all of its memberships
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut state = self.state();
        let Some(handle) = state.connections.remove(&id) else {
            return false;
        };
        for tenant_id in &handle.rooms {
            remove_from_room(&mut state.rooms, tenant_id, id);
        }
        drop(state);

        info!(connection_id = %id, "Bridge connection closed");
        true
    }

    /// Relay an event from a connection into one of its rooms.
    ///
    /// Returns the number of connections the event was queued for. Publishing
    /// into a room the sender has not joined is dropped.
    pub fn publish(&self, from: ConnectionId, tenant_id: &str, event: &str, payload: Value) -> AppResult<usize> {
        let state = self.state();
        let sender = state
            .connections
            .get(&from)
            .ok_or_else(|| unknown_connection(from))?;
        if !sender.privileged && !sender.rooms.contains(tenant_id) {
            warn!(connection_id = %from, tenant_id, event, "Dropping publish into a room the sender has not joined");
            return Ok(0);
        }
        Ok(fan_out(&state, tenant_id, &Envelope::new(event, payload)))
    }

    /// Emit an event into a room on behalf of the bridge itself
    pub fn broadcast(&self, tenant_id: &str, envelope: Envelope) -> usize {
        let state = self.state();
        fan_out(&state, tenant_id, &envelope)
    }

    /// Queue an event for a single connection
    pub fn notify(&self, id: ConnectionId, envelope: Envelope) -> bool {
        let state = self.state();
        state
            .connections
            .get(&id)
            .is_some_and(|handle| deliver(id, handle, envelope))
    }

    /// Apply one decoded client frame
    pub fn handle(&self, id: ConnectionId, command: ClientCommand) -> AppResult<usize> {
        match command {
            ClientCommand::Join(tenant_id) => self.join(id, &tenant_id).map(|_| 0),
            ClientCommand::Leave(tenant_id) => self.leave(id, &tenant_id).map(|_| 0),
            ClientCommand::SettingsUpdate(update) => {
                let changed = SettingsChanged {
                    tenant_id: update.tenant_id,
                    settings: update.settings,
                    timestamp: now_ms(),
                };
                let payload = serde_json::to_value(&changed)
                    .map_err(|e| AppError::internal(format!("failed to encode settings: {}", e)))?;
                let delivered = self.publish(id, &changed.tenant_id, events::SETTINGS_CHANGED, payload)?;
                info!(tenant_id = %changed.tenant_id, delivered, "Settings change broadcast");
                Ok(delivered)
            }
            ClientCommand::Publish {
                tenant_id,
                event,
                payload,
            } => {
                ensure_client_event(&event)?;
                self.publish(id, &tenant_id, &event, payload)
            }
        }
    }

    /// Members of a room, sorted for stable output
    pub fn room_members(&self, tenant_id: &str) -> Vec<ConnectionId> {
        let state = self.state();
        let mut members: Vec<ConnectionId> = state
            .rooms
            .get(tenant_id)
            .map(|room| room.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }
}

fn fan_out(state: &HubState, tenant_id: &str, envelope: &Envelope) -> usize {
    let Some(room) = state.rooms.get(tenant_id) else {
        return 0;
    };
    room.iter()
        .filter_map(|id| state.connections.get(id).map(|handle| (*id, handle)))
        .filter(|(id, handle)| deliver(*id, handle, envelope.clone()))
        .count()
}

fn deliver(id: ConnectionId, handle: &ConnectionHandle, envelope: Envelope) -> bool {
    match handle.sender.try_send(envelope) {
        Ok(()) => true,
        Err(TrySendError::Full(envelope)) => {
            debug!(connection_id = %id, event = %envelope.event, "Outbound queue full, event dropped");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

fn remove_from_room(rooms: &mut HashMap<String, HashSet<ConnectionId>>, tenant_id: &str, id: ConnectionId) {
    if let Some(room) = rooms.get_mut(tenant_id) {
        room.remove(&id);
        if room.is_empty() {
            rooms.remove(tenant_id);
        }
    }
}

fn ensure_tenant_id(tenant_id: &str) -> AppResult<()> {
    if validation::validate_identifier(tenant_id) {
        Ok(())
    } else {
        Err(AppError::invalid(format!("invalid tenant id '{}'", tenant_id)))
    }
}

fn unknown_connection(id: ConnectionId) -> AppError {
    AppError::Transport(format!("connection {} is not open", id))
}
