//! Pub/sub bridge step definitions

use cucumber::{given, then, when};
use serde_json::json;

use guild_bridge::models::{events, ClientCommand, SettingsUpdate};

use crate::features::support::TestWorld;

#[given(expr = "dashboard {string} has joined {string}")]
async fn dashboard_joined(world: &mut TestWorld, name: String, tenant: String) {
    let hub = world.app().state.hub.clone();
    let connection = hub.connect(false).await;
    hub.join(connection.id, &tenant).unwrap();
    world.dashboards.insert(name, connection);
}

#[when(expr = "dashboard {string} leaves {string}")]
async fn dashboard_leaves(world: &mut TestWorld, name: String, tenant: String) {
    let hub = world.app().state.hub.clone();
    let id = world.dashboard(&name).id;
    hub.leave(id, &tenant).unwrap();
}

#[when(expr = "dashboard {string} sets the prefix of {string} to {string}")]
async fn settings_update(world: &mut TestWorld, name: String, tenant: String, prefix: String) {
    let hub = world.app().state.hub.clone();
    let id = world.dashboard(&name).id;
    let command = ClientCommand::SettingsUpdate(SettingsUpdate {
        tenant_id: tenant,
        settings: json!({ "prefix": prefix }),
    });
    hub.handle(id, command).unwrap();
}

#[then(expr = "dashboard {string} should see the prefix of {string} become {string}")]
async fn sees_settings_changed(world: &mut TestWorld, name: String, tenant: String, prefix: String) {
    let envelope = world
        .dashboard(&name)
        .events
        .try_recv()
        .expect("no event was delivered");
    assert_eq!(envelope.event, events::SETTINGS_CHANGED);
    assert_eq!(envelope.data["tenantId"], tenant.as_str());
    assert_eq!(envelope.data["settings"]["prefix"], prefix.as_str());
}

#[then(expr = "dashboard {string} should receive nothing")]
async fn receives_nothing(world: &mut TestWorld, name: String) {
    assert!(world.dashboard(&name).events.try_recv().is_err());
}
