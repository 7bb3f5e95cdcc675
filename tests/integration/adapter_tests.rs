//! Command adapter integration tests
//!
//! Drives the adapter directly to check that native and web invocations go
//! through the same gates and leave the same audit and history trail.

use std::sync::Arc;
use std::time::Duration;

use guild_bridge::db::EconomyRepository;
use guild_bridge::models::{events, AuditQuery, Envelope, InvocationRequest, ReplyKind};
use guild_bridge::services::{ActionRegistry, BuiltinDeps, CommandAdapter, PlatformGateway};
use guild_bridge::utils::AppError;
use serde_json::json;
use tokio::sync::mpsc::Receiver;

use crate::common::{ids, EchoAction, FailingAction, InvocationFactory, RecordingResponder, TestApp, OPENING_BALANCE};

/// Adapter over the test app's services with the scripted actions added
fn scripted_adapter(app: &TestApp) -> CommandAdapter {
    let state = &app.state;
    let mut registry = ActionRegistry::with_builtins(BuiltinDeps {
        pool: state.db.clone(),
        gateway: state.gateway.clone(),
        hub: state.hub.clone(),
        opening_balance: state.config.economy.opening_balance,
    });
    registry.register(Arc::new(FailingAction));
    registry.register(Arc::new(EchoAction));

    CommandAdapter::new(
        Arc::new(registry),
        state.gateway.clone(),
        state.flags.clone(),
        state.audit.clone(),
        state.history.clone(),
        state.hub.clone(),
    )
}

async fn audit_total(app: &TestApp) -> i64 {
    app.state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(50))
        .await
        .unwrap()
        .pagination
        .total
}

async fn next_event(events: &mut Receiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a bridge event")
        .expect("bridge connection closed")
}

#[tokio::test]
async fn test_native_and_web_paths_share_the_audit_trail() {
    let app = TestApp::new().await;
    let adapter = &app.state.adapter;

    let responder = RecordingResponder::new();
    let native = adapter
        .invoke_native(InvocationFactory::ping(), responder.clone())
        .await
        .unwrap();
    assert!(native.success);
    assert!(native.replies.is_empty());
    let sent = responder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, ReplyKind::Reply);
    assert_eq!(sent[0].content.as_deref(), Some("Pong!"));

    let web = adapter.invoke(InvocationFactory::ping()).await.unwrap();
    assert!(web.success);
    assert_eq!(web.replies.len(), 1);
    assert_eq!(web.replies[0].content.as_deref(), Some("Pong!"));

    let page = app
        .state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(10))
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 2);
    let origins: Vec<_> = page
        .entries
        .iter()
        .map(|e| e.metadata["origin"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(origins, vec!["web", "native"]);
    assert_eq!(app.state.history.len(ids::TENANT), 2);
}

#[tokio::test]
async fn test_handler_failure_records_only_failed_history() {
    let app = TestApp::new().await;
    let adapter = scripted_adapter(&app);

    let request = InvocationRequest::new("explode", ids::TENANT, ids::SENDER);
    let result = adapter.invoke(request).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("boom"));
    assert_eq!(audit_total(&app).await, 0);

    let history = app.state.history.recent(ids::TENANT, 10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action_name, "explode");
    assert!(!history[0].success);
}

#[tokio::test]
async fn test_feature_gate_follows_flag_changes() {
    let app = TestApp::new().await;
    let adapter = scripted_adapter(&app);
    let echo = || {
        InvocationRequest::new("echo", ids::TENANT, ids::SENDER)
            .with_param("text", "hello")
    };

    // Flags default to enabled
    let result = adapter.invoke(echo()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.message, "hello");

    app.state.flags.set(ids::TENANT, "fun", false);
    let err = adapter.invoke(echo()).await.unwrap_err();
    assert!(matches!(err, AppError::FeatureDisabled { ref feature, .. } if feature == "fun"));

    // Only the first, permitted run left a trace
    assert_eq!(audit_total(&app).await, 1);
    assert_eq!(app.state.history.len(ids::TENANT), 1);

    // Other tenants are unaffected
    let other = InvocationRequest::new("echo", ids::OTHER_TENANT, ids::SENDER)
        .with_param("text", "still here");
    assert!(adapter.invoke(other).await.unwrap().success);
}

#[tokio::test]
async fn test_invalid_parameters_fail_inside_the_handler() {
    let app = TestApp::new().await;

    // Unknown recipient: the handler rejects it, so history records a failure
    let result = app
        .state
        .adapter
        .invoke(InvocationFactory::transfer(ids::OUTSIDER, 10))
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("not a member"));
    assert_eq!(audit_total(&app).await, 0);
    assert_eq!(app.state.history.len(ids::TENANT), 1);
}

#[tokio::test]
async fn test_command_executed_is_emitted_to_the_room() {
    let app = TestApp::new().await;
    let hub = &app.state.hub;

    let mut dashboard = hub.connect(false).await;
    hub.join(dashboard.id, ids::TENANT).unwrap();
    let mut elsewhere = hub.connect(false).await;
    hub.join(elsewhere.id, ids::OTHER_TENANT).unwrap();

    app.state.adapter.invoke(InvocationFactory::ping()).await.unwrap();

    let event = next_event(&mut dashboard.events).await;
    assert_eq!(event.event, events::COMMAND_EXECUTED);
    assert_eq!(event.data["action"], "ping");
    assert_eq!(event.data["actorId"], ids::SENDER);
    assert_eq!(event.data["success"], true);

    assert!(elsewhere.events.try_recv().is_err());
}

#[tokio::test]
async fn test_history_keeps_the_latest_hundred_invocations() {
    let app = TestApp::new().await;

    for _ in 0..101 {
        app.state.adapter.invoke(InvocationFactory::ping()).await.unwrap();
    }

    assert_eq!(app.state.history.len(ids::TENANT), 100);
    // The audit log is not capped
    assert_eq!(audit_total(&app).await, 101);
}

#[tokio::test]
async fn test_settings_update_persists_broadcasts_and_diffs() {
    let app = TestApp::new().await;
    let hub = &app.state.hub;
    let mut dashboard = hub.connect(false).await;
    hub.join(dashboard.id, ids::TENANT).unwrap();

    let first = app
        .state
        .adapter
        .invoke(InvocationFactory::settings_update(json!({"prefix": "!"})))
        .await
        .unwrap();
    assert!(first.success);

    let changed = next_event(&mut dashboard.events).await;
    assert_eq!(changed.event, events::SETTINGS_CHANGED);
    assert_eq!(changed.data["settings"]["prefix"], "!");

    app.state
        .adapter
        .invoke(InvocationFactory::settings_update(json!({"prefix": "?"})))
        .await
        .unwrap();

    let page = app
        .state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(10))
        .await
        .unwrap();
    let latest = &page.entries[0];
    assert_eq!(latest.action.as_str(), "settings-update");
    assert_eq!(latest.changes["prefix"], json!({"old": "!", "new": "?"}));
}

#[tokio::test]
async fn test_moderation_ban_removes_member() {
    let app = TestApp::new().await;

    let result = app
        .state
        .adapter
        .invoke(InvocationFactory::ban(ids::BYSTANDER, "spam"))
        .await
        .unwrap();
    assert!(result.success);
    assert!(app.gateway.is_banned(ids::TENANT, ids::BYSTANDER).await);

    let page = app
        .state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(10))
        .await
        .unwrap();
    assert_eq!(page.entries[0].reason.as_deref(), Some("spam"));
    assert_eq!(page.entries[0].target.as_ref().unwrap().id, ids::BYSTANDER);

    // A banned member can no longer invoke anything
    let err = app
        .state
        .adapter
        .invoke(InvocationRequest::new("ping", ids::TENANT, ids::BYSTANDER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ActorNotInTenant { .. }));
}

#[tokio::test]
async fn test_role_lifecycle_through_dashed_action_names() {
    let app = TestApp::new().await;
    let adapter = &app.state.adapter;

    let created = adapter
        .invoke(
            InvocationRequest::new("role-create", ids::TENANT, ids::SENDER)
                .with_param("name", "Helpers")
                .with_param("color", "255"),
        )
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.message, "Created role Helpers");

    let page = app
        .state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(10))
        .await
        .unwrap();
    let entry = &page.entries[0];
    assert_eq!(entry.action.as_str(), "role-create");
    assert_eq!(entry.changes["name"]["new"], "Helpers");
    assert_eq!(entry.changes["color"]["new"], 255);

    // Names are unique within a tenant
    let duplicate = adapter
        .invoke(InvocationRequest::new("role-create", ids::TENANT, ids::SENDER).with_param("name", "Moderators"))
        .await
        .unwrap();
    assert!(!duplicate.success);
    assert!(duplicate.error.unwrap().contains("already exists"));

    let deleted = adapter
        .invoke(InvocationRequest::new("role-delete", ids::TENANT, ids::SENDER).with_param("role", ids::ROLE))
        .await
        .unwrap();
    assert!(deleted.success);
    assert!(app.gateway.role(ids::TENANT, ids::ROLE).await.unwrap().is_none());

    assert_eq!(audit_total(&app).await, 2);
    assert_eq!(app.state.history.len(ids::TENANT), 3);
}

#[tokio::test]
async fn test_audit_storage_failure_reports_failure_but_keeps_the_effect() {
    let app = TestApp::new().await;
    sqlx::query("DROP TABLE audit_log")
        .execute(&app.state.db)
        .await
        .unwrap();

    let result = app
        .state
        .adapter
        .invoke(InvocationFactory::transfer(ids::RECIPIENT, 250))
        .await
        .unwrap();

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("Storage error"), "unexpected error: {}", error);
    assert!(error.contains("audit_log"), "unexpected error: {}", error);

    // The transfer itself went through
    let economy = EconomyRepository::new(&app.state.db).with_opening_balance(OPENING_BALANCE);
    assert_eq!(economy.balance(ids::TENANT, ids::SENDER).await.unwrap(), OPENING_BALANCE - 250);
    assert_eq!(economy.balance(ids::TENANT, ids::RECIPIENT).await.unwrap(), OPENING_BALANCE + 250);

    let history = app.state.history.recent(ids::TENANT, 10);
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
}
