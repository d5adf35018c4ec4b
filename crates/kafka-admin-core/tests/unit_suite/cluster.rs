//! Broker and topic queries through the facade.

use super::helpers::test_cluster;

#[tokio::test]
async fn brokers_and_registrations() {
    let cluster = test_cluster();
    cluster.zookeeper.set(
        "/brokers/ids/1",
        r#"{"host":"kafka-1","port":9092,"jmx_port":9999}"#,
    );
    cluster
        .zookeeper
        .set("/brokers/ids/0", r#"{"host":"kafka-0","port":9092,"jmx_port":-1}"#);

    assert_eq!(cluster.facade.brokers().await.unwrap(), vec![0, 1]);

    let broker = cluster.facade.broker(1).await.unwrap().unwrap();
    assert_eq!(broker.host, "kafka-1");
    assert!(broker.jmx_enabled());
    assert!(!cluster.facade.broker(0).await.unwrap().unwrap().jmx_enabled());
    assert!(cluster.facade.broker(5).await.unwrap().is_none());
}

#[tokio::test]
async fn topics_and_legacy_consumers() {
    let cluster = test_cluster();
    cluster.zookeeper.set("/brokers/topics/orders", "{}");
    cluster.legacy_offset("svc-a", "orders", 0, "1");
    cluster.legacy_offset("svc-b", "payments", 0, "1");

    assert_eq!(cluster.facade.topics().await.unwrap(), vec!["orders"]);
    assert_eq!(
        cluster
            .facade
            .legacy_groups_for_topic("orders")
            .await
            .unwrap(),
        vec!["svc-a"]
    );
}

#[tokio::test]
async fn empty_cluster() {
    let cluster = test_cluster();

    assert!(cluster.facade.brokers().await.unwrap().is_empty());
    assert!(cluster.facade.topics().await.unwrap().is_empty());
    assert!(cluster
        .facade
        .legacy_groups_for_topic("orders")
        .await
        .unwrap()
        .is_empty());
}
