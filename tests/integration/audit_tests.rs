//! Audit store integration tests
//!
//! Pagination, filtering, retention and statistics against a real database.

use guild_bridge::models::{AuditAction, AuditQuery, NewAuditEntry};
use guild_bridge::utils::AppError;

use crate::common::{executor, ids, AuditEntryFactory, TestApp};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const BASE_MS: i64 = 1_700_000_000_000;

#[tokio::test]
async fn test_pagination_is_newest_first() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;
    let factory = AuditEntryFactory::starting_at(BASE_MS);

    for _ in 0..5 {
        audit
            .append(factory.create(ids::TENANT, AuditAction::CommandExecute, ids::SENDER))
            .await
            .unwrap();
    }

    let first = audit
        .query(ids::TENANT, AuditQuery { page: 1, page_size: 2, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(first.pagination.total, 5);
    assert_eq!(first.pagination.pages, 3);
    let stamps: Vec<i64> = first.entries.iter().map(|e| e.timestamp_ms).collect();
    assert_eq!(stamps, vec![BASE_MS + 4_000, BASE_MS + 3_000]);

    let last = audit
        .query(ids::TENANT, AuditQuery { page: 3, page_size: 2, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(last.entries.len(), 1);
    assert_eq!(last.entries[0].timestamp_ms, BASE_MS);

    let beyond = audit
        .query(ids::TENANT, AuditQuery { page: 4, page_size: 2, ..Default::default() })
        .await
        .unwrap();
    assert!(beyond.entries.is_empty());
    assert_eq!(beyond.pagination.total, 5);
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let app = TestApp::new().await;
    let page = app
        .state
        .audit
        .query(ids::TENANT, AuditQuery::first_page(10_000))
        .await
        .unwrap();
    assert_eq!(page.pagination.limit, app.state.config.audit.max_page_size);
}

#[tokio::test]
async fn test_filters_are_combined() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;
    let factory = AuditEntryFactory::starting_at(BASE_MS);

    // t+0 ban by u1, t+1 transfer by u1, t+2 transfer by u2, t+3 transfer by u1
    audit.append(factory.create(ids::TENANT, AuditAction::ModerationBan, ids::SENDER)).await.unwrap();
    audit.append(factory.create(ids::TENANT, AuditAction::EconomyTransfer, ids::SENDER)).await.unwrap();
    audit.append(factory.create(ids::TENANT, AuditAction::EconomyTransfer, ids::RECIPIENT)).await.unwrap();
    audit.append(factory.create(ids::TENANT, AuditAction::EconomyTransfer, ids::SENDER)).await.unwrap();

    let query = AuditQuery {
        page: 1,
        page_size: 50,
        action: Some(AuditAction::EconomyTransfer),
        actor_id: Some(ids::SENDER.to_string()),
        start_time: Some(BASE_MS + 1_000),
        end_time: Some(BASE_MS + 1_000),
    };
    let page = audit.query(ids::TENANT, query).await.unwrap();

    // Both time bounds are inclusive
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.entries[0].timestamp_ms, BASE_MS + 1_000);

    let transfers_by_sender = AuditQuery {
        action: Some(AuditAction::EconomyTransfer),
        actor_id: Some(ids::SENDER.to_string()),
        ..AuditQuery::first_page(50)
    };
    assert_eq!(audit.query(ids::TENANT, transfers_by_sender).await.unwrap().pagination.total, 2);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;
    let factory = AuditEntryFactory::starting_at(BASE_MS);

    audit.append(factory.create(ids::TENANT, AuditAction::RoleCreate, ids::SENDER)).await.unwrap();
    audit.append(factory.create(ids::OTHER_TENANT, AuditAction::RoleCreate, ids::SENDER)).await.unwrap();

    let page = audit.query(ids::OTHER_TENANT, AuditQuery::first_page(50)).await.unwrap();
    assert_eq!(page.pagination.total, 1);
    assert!(page.entries.iter().all(|e| e.tenant_id == ids::OTHER_TENANT));
}

#[tokio::test]
async fn test_invalid_queries_are_rejected() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;

    let zero_size = audit.query(ids::TENANT, AuditQuery::first_page(0)).await;
    assert!(matches!(zero_size, Err(AppError::InvalidArgument(_))));

    let inverted = AuditQuery {
        start_time: Some(BASE_MS + 1),
        end_time: Some(BASE_MS),
        ..AuditQuery::first_page(10)
    };
    assert!(matches!(audit.query(ids::TENANT, inverted).await, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_purge_keeps_the_boundary_entry() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;
    let now = BASE_MS + 200 * DAY_MS;
    let cutoff = now - 90 * DAY_MS;

    let entries = [
        NewAuditEntry::new(ids::TENANT, AuditAction::Other, executor(ids::SENDER))
            .with_timestamp(cutoff - 1),
        NewAuditEntry::new(ids::TENANT, AuditAction::Other, executor(ids::SENDER))
            .with_timestamp(cutoff),
        NewAuditEntry::new(ids::OTHER_TENANT, AuditAction::Other, executor(ids::SENDER))
            .with_timestamp(now - DAY_MS),
    ];
    for entry in entries {
        audit.append(entry).await.unwrap();
    }

    let deleted = audit.purge_older_than_at(90, now).await.unwrap();
    assert_eq!(deleted, 1);

    let remaining = audit.query(ids::TENANT, AuditQuery::first_page(50)).await.unwrap();
    assert_eq!(remaining.pagination.total, 1);
    assert_eq!(remaining.entries[0].timestamp_ms, cutoff);

    // Running again finds nothing new
    assert_eq!(audit.purge_older_than_at(90, now).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stats_by_action() {
    let app = TestApp::new().await;
    let audit = &app.state.audit;
    let factory = AuditEntryFactory::starting_at(BASE_MS);

    for action in [
        AuditAction::ModerationKick,
        AuditAction::ModerationKick,
        AuditAction::SettingsUpdate,
    ] {
        audit.append(factory.create(ids::TENANT, action, ids::SENDER)).await.unwrap();
    }
    audit
        .append(factory.create(ids::OTHER_TENANT, AuditAction::RoleDelete, ids::SENDER))
        .await
        .unwrap();

    let stats = audit.stats_by_action(ids::TENANT).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_action["moderation-kick"], 2);
    assert_eq!(stats.by_action["settings-update"], 1);
    assert!(!stats.by_action.contains_key("role-delete"));

    let empty = audit.stats_by_action("g404").await.unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.by_action.is_empty());
}
