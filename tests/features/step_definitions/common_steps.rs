//! Common step definitions used across features

use cucumber::{given, then};

use crate::features::support::TestWorld;

#[given("a running bridge")]
async fn running_bridge(world: &mut TestWorld) {
    world.start().await;
}

#[given("the dashboard has no credential")]
async fn no_credential(world: &mut TestWorld) {
    world.token = None;
}

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    assert_eq!(
        world.response().status.as_u16(),
        status,
        "Body: {}",
        world.response().text()
    );
}

#[then("the response should contain an error")]
async fn response_contains_error(world: &mut TestWorld) {
    let body: serde_json::Value = world.response().json();
    assert!(body.get("error").is_some());
}
