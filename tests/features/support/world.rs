//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::fmt;

use cucumber::World;

use guild_bridge::services::bridge::BridgeConnection;

use crate::common::{TestApp, TestResponse, TEST_TOKEN};

/// Test world that maintains state across scenario steps
#[derive(Default, World)]
pub struct TestWorld {
    /// Application under test, created by the background step
    pub app: Option<TestApp>,

    /// Credential sent with REST calls
    pub token: Option<String>,

    /// Response from last API call
    pub last_response: Option<TestResponse>,

    /// Open bridge connections by dashboard name
    pub dashboards: HashMap<String, BridgeConnection>,
}

impl fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWorld")
            .field("started", &self.app.is_some())
            .field("token", &self.token)
            .field("last_status", &self.last_response.as_ref().map(|r| r.status))
            .field("dashboards", &self.dashboards.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TestWorld {
    /// Boot a fresh application and use the valid credential
    pub async fn start(&mut self) {
        self.app = Some(TestApp::new().await);
        self.token = Some(TEST_TOKEN.to_string());
    }

    pub fn app(&self) -> &TestApp {
        self.app.as_ref().expect("the bridge has not been started")
    }

    pub fn dashboard(&mut self, name: &str) -> &mut BridgeConnection {
        self.dashboards
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown dashboard '{}'", name))
    }

    pub fn response(&self) -> &TestResponse {
        self.last_response.as_ref().expect("No response available")
    }
}
