//! In-process bridge for integration tests
//!
//! Every `TestApp` owns a fresh SQLite file and the fixture guild directory,
//! and drives the router through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use guild_bridge::{
    api,
    config::{AppConfig, AuthConfig, DatabaseConfig, EconomyConfig},
    db,
    middleware::auth::API_KEY_HEADER,
    services::StaticGateway,
    AppState,
};

use super::fixtures::{test_platform, OPENING_BALANCE, TEST_TOKEN};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Concrete handle on the gateway behind `state.gateway`
    pub gateway: Arc<StaticGateway>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("test database should migrate");
        let gateway = Arc::new(StaticGateway::from_config(&config.platform));
        let state = AppState::new(config, db, gateway.clone());

        Self {
            router: api::router(state.clone()),
            state,
            gateway,
        }
    }

    /// GET as an anonymous caller
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, None).await
    }

    /// GET as the dashboard backend
    pub async fn get_authed(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, Some(TEST_TOKEN)).await
    }

    /// POST a JSON body as the dashboard backend
    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), Some(TEST_TOKEN)).await
    }

    pub async fn post_json_with_token(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::POST, uri, Some(body), token).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(API_KEY_HEADER, token);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        };
        self.request(request.expect("request should build")).await
    }

    /// Send a hand-built request, for headers the helpers do not cover
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body should be readable");

        TestResponse { status, body }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({}): {}", e, self.text()))
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected {} but got {}; body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }
}

/// Fixture platform, the shared test token and a throwaway database file
pub fn test_config() -> AppConfig {
    let db_path = format!("/tmp/guild_bridge_test_{}.db", Uuid::new_v4().simple());

    AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path),
            max_connections: 1,
            connect_timeout_secs: 30,
        },
        auth: AuthConfig {
            service_token: TEST_TOKEN.to_string(),
        },
        economy: EconomyConfig {
            opening_balance: OPENING_BALANCE,
        },
        platform: test_platform(),
        ..AppConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_loads_fixture_platform() {
        let app = TestApp::new().await;
        assert_eq!(app.state.gateway.tenant_count().await, 2);
        assert_eq!(app.state.hub.connection_count(), 0);
    }
}
