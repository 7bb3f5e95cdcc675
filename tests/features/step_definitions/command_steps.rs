//! Command execution step definitions

use cucumber::{given, then, when};
use serde_json::{json, Value};

use guild_bridge::models::{AuditAction, AuditQuery};

use crate::features::support::TestWorld;

#[given(expr = "the {string} feature is disabled for {string}")]
async fn feature_disabled(world: &mut TestWorld, feature: String, tenant: String) {
    world.app().state.flags.set(&tenant, &feature, false);
}

#[when(expr = "{string} transfers {int} coins to {string} in {string}")]
async fn transfer(world: &mut TestWorld, actor: String, amount: i64, recipient: String, tenant: String) {
    let body = json!({
        "action": "economy-transfer",
        "tenantId": tenant,
        "actorId": actor,
        "parameters": { "to": recipient, "amount": amount.to_string() }
    });
    let token = world.token.clone();
    let response = world
        .app()
        .post_json_with_token("/execute-command", body, token.as_deref())
        .await;
    world.last_response = Some(response);
}

#[then(expr = "the command should have {word}")]
async fn command_outcome(world: &mut TestWorld, outcome: String) {
    let body: Value = world.response().json();
    let expected = match outcome.as_str() {
        "succeeded" => true,
        "failed" => false,
        other => panic!("unknown outcome '{}'", other),
    };
    assert_eq!(body["success"], expected, "Body: {}", body);
}

#[then(expr = "the audit log of {string} should contain {int} {string} entry/entries")]
async fn audit_count(world: &mut TestWorld, tenant: String, count: i64, action: String) {
    let query = AuditQuery {
        action: Some(action.parse::<AuditAction>().unwrap()),
        ..AuditQuery::first_page(50)
    };
    let page = world.app().state.audit.query(&tenant, query).await.unwrap();
    assert_eq!(page.pagination.total, count);
}

#[then(expr = "the history of {string} should hold {int} entry/entries")]
async fn history_count(world: &mut TestWorld, tenant: String, count: usize) {
    assert_eq!(world.app().state.history.len(&tenant), count);
}

#[then(expr = "the balance of {string} in {string} should be {int}")]
async fn balance(world: &mut TestWorld, user: String, tenant: String, expected: i64) {
    let app = world.app();
    let repo = guild_bridge::db::EconomyRepository::new(&app.state.db)
        .with_opening_balance(app.state.config.economy.opening_balance);
    assert_eq!(repo.balance(&tenant, &user).await.unwrap(), expected);
}
