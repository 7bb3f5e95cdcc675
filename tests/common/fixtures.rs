//! Test fixtures for common test data
//!
//! Fixtures provide a fixed platform directory that every integration test
//! shares: one tenant with three members, the bot, a channel and a role.

use guild_bridge::config::{MemberSeed, NamedSeed, PlatformConfig, TenantSeed};

/// Fixed identifiers for testing (reproducible tests)
pub mod ids {
    pub const TENANT: &str = "g1";
    pub const OTHER_TENANT: &str = "g2";
    pub const SENDER: &str = "u1";
    pub const RECIPIENT: &str = "u2";
    pub const BYSTANDER: &str = "u3";
    pub const BOT: &str = "bot";
    pub const CHANNEL: &str = "c1";
    pub const ROLE: &str = "r1";
    pub const OUTSIDER: &str = "u9";
}

/// Service credential configured for the test application
pub const TEST_TOKEN: &str = "test-service-token";

/// Opening balance every member starts with
pub const OPENING_BALANCE: i64 = 10_000;

fn member(id: &str, display_name: &str, is_bot: bool) -> MemberSeed {
    MemberSeed {
        id: id.to_string(),
        display_name: display_name.to_string(),
        is_bot,
    }
}

fn named(id: &str, name: &str) -> NamedSeed {
    NamedSeed {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Platform directory seeded into the test gateway
pub fn test_platform() -> PlatformConfig {
    PlatformConfig {
        tenants: vec![
            TenantSeed {
                id: ids::TENANT.to_string(),
                name: "Test Guild".to_string(),
                members: vec![
                    member(ids::SENDER, "Alice", false),
                    member(ids::RECIPIENT, "Bob", false),
                    member(ids::BYSTANDER, "Carol", false),
                    member(ids::BOT, "Guild Bot", true),
                ],
                channels: vec![named(ids::CHANNEL, "general")],
                roles: vec![named(ids::ROLE, "Moderators")],
            },
            TenantSeed {
                id: ids::OTHER_TENANT.to_string(),
                name: "Other Guild".to_string(),
                members: vec![member(ids::SENDER, "Alice", false)],
                channels: vec![],
                roles: vec![],
            },
        ],
    }
}
