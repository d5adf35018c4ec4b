//! Offset reset through the facade.

use kafka_admin_core::{Error, GroupAdmin, GroupConsumer};

use super::helpers::test_cluster;

#[tokio::test]
async fn reset_is_visible_to_fresh_client_before_snapshot() {
    let cluster = test_cluster();
    cluster.native_offset("svc-a", "orders", 0, 130);
    cluster.facade.refresh().await.unwrap();

    cluster
        .facade
        .reset_offset("svc-a", "orders", 0, 42)
        .await
        .unwrap();

    let mut consumer = cluster.kafka.open_consumer("svc-a").await.unwrap();
    assert_eq!(consumer.committed("orders", 0).await.unwrap(), Some(42));
    consumer.close().await.unwrap();

    // The published view only changes with the next refresh.
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(130));
    cluster.facade.refresh().await.unwrap();
    assert_eq!(cluster.snapshot_offset("svc-a", "orders", 0), Some(42));
}

#[tokio::test]
async fn negative_offset_is_rejected_without_client() {
    let cluster = test_cluster();

    let err = cluster
        .facade
        .reset_offset("svc-a", "orders", 0, -5)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OffsetReset { .. }));
    assert_eq!(cluster.kafka.consumers_opened(), 0);
}

#[tokio::test]
async fn rejected_commit_is_returned_once() {
    let cluster = test_cluster();
    cluster.native_offset("svc-a", "orders", 0, 130);
    cluster.kafka.reject_commits("svc-a");

    let result = cluster.facade.reset_offset("svc-a", "orders", 0, 1).await;

    assert!(result.is_err());
    assert_eq!(cluster.kafka.consumers_opened(), 1);
    assert_eq!(cluster.kafka.open_consumers(), 0);
    assert_eq!(cluster.kafka.committed_offset("svc-a", "orders", 0), Some(130));

    let text = cluster.facade.metrics().encode();
    assert!(text.contains("kafka_admin_offset_resets_total{status=\"failure\"} 1"));
}

#[tokio::test]
async fn reset_does_not_disturb_concurrent_readers() {
    let cluster = test_cluster();
    cluster.native_offset("svc-a", "orders", 0, 10);
    cluster.facade.refresh().await.unwrap();
    let held = cluster.facade.snapshot();

    let (reset, _) = tokio::join!(
        cluster.facade.reset_offset("svc-a", "orders", 0, 99),
        async { cluster.facade.get_group("svc-a") },
    );
    reset.unwrap();

    assert_eq!(
        held.get("svc-a").unwrap().offset("orders", 0).unwrap().offset,
        Some(10)
    );
}
