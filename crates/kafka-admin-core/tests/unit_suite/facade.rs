//! Group aggregation through the facade.
//!
//! Covers precedence between the registries, snapshot retention on failure
//! and read consistency.

use kafka_admin_core::{GroupKind, HealthStatus, RefreshState};

use super::helpers::test_cluster;

// ============================================================================
// Merge Semantics
// ============================================================================

#[tokio::test]
async fn legacy_only_group_is_served_as_is() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");
    cluster.legacy_offset("svc-a", "orders", 1, "7");

    cluster.facade.refresh().await.unwrap();

    let group = cluster.facade.get_group("svc-a").unwrap();
    assert_eq!(group.kind, GroupKind::Legacy);
    assert_eq!(group.offsets.len(), 2);
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(120));
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 1), Some(7));
}

#[tokio::test]
async fn native_registry_takes_over_migrated_group() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");

    cluster.facade.refresh().await.unwrap();
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(120));

    cluster.native_offset("svc-a", "orders", 0, 130);
    cluster.facade.refresh().await.unwrap();

    let group = cluster.facade.get_group("svc-a").unwrap();
    assert_eq!(group.kind, GroupKind::Native);
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(130));
}

#[tokio::test]
async fn groups_from_both_registries_are_listed() {
    let cluster = test_cluster();
    cluster.legacy_offset("legacy-app", "orders", 0, "1");
    cluster.native_offset("native-app", "payments", 2, 40);

    assert_eq!(cluster.facade.refresh().await.unwrap(), 2);
    assert_eq!(
        cluster.facade.list_groups(),
        vec!["legacy-app".to_string(), "native-app".to_string()]
    );
    assert_eq!(
        cluster.facade.group_topics("native-app"),
        Some(vec!["payments".to_string()])
    );
}

// ============================================================================
// Partial Failure
// ============================================================================

#[tokio::test]
async fn unreachable_zookeeper_keeps_previous_snapshot() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");
    cluster.facade.refresh().await.unwrap();
    let before = cluster.facade.snapshot();

    cluster.legacy_offset("svc-a", "orders", 0, "500");
    cluster.zookeeper.set_unavailable(true);
    assert!(cluster.facade.refresh().await.is_err());

    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(120));
    assert_eq!(cluster.facade.snapshot().refreshed_at, before.refreshed_at);

    let health = cluster.facade.health();
    assert_eq!(health.status, HealthStatus::Unhealthy);
    assert_eq!(health.groups, 1);
    assert_eq!(cluster.facade.refresh_state(), RefreshState::Idle);
}

#[tokio::test]
async fn zookeeper_lost_mid_scan_keeps_previous_snapshot() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");
    cluster.legacy_offset("svc-b", "payments", 0, "7");
    cluster.facade.refresh().await.unwrap();
    let before = cluster.facade.snapshot();

    cluster.zookeeper.unavailable_after_listing("/consumers");
    assert!(cluster.facade.refresh().await.is_err());

    assert_eq!(
        cluster.facade.list_groups(),
        vec!["svc-a".to_string(), "svc-b".to_string()]
    );
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(120));
    assert_eq!(cluster.facade.snapshot().refreshed_at, before.refreshed_at);
    assert_eq!(cluster.facade.health().status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn kafka_lost_mid_scan_does_not_fall_back_to_legacy() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");
    cluster.native_offset("svc-a", "orders", 0, 130);
    cluster.native_offset("svc-n", "payments", 1, 5);
    cluster.facade.refresh().await.unwrap();
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(130));

    cluster.kafka.unavailable_after_listing();
    assert!(cluster.facade.refresh().await.is_err());

    let group = cluster.facade.get_group("svc-a").unwrap();
    assert_eq!(group.kind, GroupKind::Native);
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(130));
    assert_eq!(
        cluster.facade.list_groups(),
        vec!["svc-a".to_string(), "svc-n".to_string()]
    );
    assert_eq!(cluster.kafka.open_consumers(), 0);
}

#[tokio::test]
async fn partition_deleted_during_scan_is_omitted() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");
    cluster.legacy_offset("svc-a", "orders", 1, "121");
    cluster
        .zookeeper
        .vanish_after_listing("/consumers/svc-a/offsets/orders/1");

    cluster.facade.refresh().await.unwrap();

    let group = cluster.facade.get_group("svc-a").unwrap();
    assert_eq!(group.offsets.len(), 1);
    assert!(group.offset("orders", 1).is_none());
}

#[tokio::test]
async fn malformed_legacy_offset_does_not_hide_group() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "garbage");
    cluster.legacy_offset("svc-a", "orders", 1, "12");

    cluster.facade.refresh().await.unwrap();

    let group = cluster.facade.get_group("svc-a").unwrap();
    assert_eq!(group.offset("orders", 0).unwrap().offset, None);
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 1), Some(12));
}

#[tokio::test]
async fn failing_native_group_leaves_others_published() {
    let cluster = test_cluster();
    cluster.native_offset("healthy", "orders", 0, 3);
    cluster.native_offset("broken", "orders", 0, 9);
    cluster.kafka.break_group("broken");

    cluster.facade.refresh().await.unwrap();

    assert_eq!(cluster.facade.list_groups(), vec!["healthy".to_string()]);
    assert_eq!(cluster.kafka.open_consumers(), 0);
}

// ============================================================================
// Read Consistency
// ============================================================================

#[tokio::test]
async fn unknown_group_is_not_found() {
    let cluster = test_cluster();
    cluster.facade.refresh().await.unwrap();

    assert!(cluster.facade.get_group("missing").is_none());
    assert!(cluster.facade.group_topics("missing").is_none());
}

#[tokio::test]
async fn empty_group_is_distinct_from_unknown() {
    let cluster = test_cluster();
    cluster.kafka.add_empty_group("idle");

    cluster.facade.refresh().await.unwrap();

    let group = cluster.facade.get_group("idle").unwrap();
    assert!(group.offsets.is_empty());
    assert_eq!(cluster.facade.group_topics("idle"), Some(vec![]));
}

#[tokio::test]
async fn listed_groups_resolve_in_same_snapshot() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "1");
    cluster.native_offset("svc-b", "orders", 0, 2);
    cluster.facade.refresh().await.unwrap();

    let snapshot = cluster.facade.snapshot();

    // A later refresh that drops a group does not affect the held snapshot.
    cluster.zookeeper.delete("/consumers/svc-a");
    cluster.facade.refresh().await.unwrap();

    for id in snapshot.group_ids() {
        assert!(snapshot.get(&id).is_some(), "{} listed but not found", id);
    }
    assert_eq!(snapshot.len(), 2);
    assert_eq!(cluster.facade.list_groups(), vec!["svc-b".to_string()]);
}

#[tokio::test]
async fn nothing_is_served_before_first_refresh() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "1");

    assert!(cluster.facade.list_groups().is_empty());
    assert!(cluster.facade.health().snapshot_age_secs.is_none());
}

// ============================================================================
// Background Refresh
// ============================================================================

#[tokio::test(start_paused = true)]
async fn started_refresher_publishes_periodically() {
    let cluster = test_cluster();
    cluster.legacy_offset("svc-a", "orders", 0, "120");

    cluster.facade.start();
    cluster.facade.start();
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(120));

    cluster.legacy_offset("svc-a", "orders", 0, "125");
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(125));
}

#[tokio::test]
async fn metrics_track_cycles() {
    let cluster = test_cluster();
    cluster.facade.refresh().await.unwrap();
    cluster.kafka.set_unavailable(true);
    let _ = cluster.facade.refresh().await;

    let text = cluster.facade.metrics().encode();
    assert!(text.contains("kafka_admin_refresh_cycles_total{outcome=\"published\"} 1"));
    assert!(text.contains("kafka_admin_refresh_cycles_total{outcome=\"failed\"} 1"));
    assert!(text.contains("kafka_admin_scan_failures_total{source=\"kafka\"} 1"));
}
