//! Broker-native group registry access.
//!
//! [`GroupAdmin`] enumerates and describes groups; [`GroupConsumer`] is a
//! short-lived client bound to exactly one group id, used to read committed
//! offsets and to seek and commit. Consumers are opened for one logical
//! operation and always closed afterwards, see [`with_consumer`].

mod kafka;
mod memory;

pub use self::kafka::{KafkaGroupAdmin, KafkaGroupConsumer};
pub use memory::MemoryGroupAdmin;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use tracing::warn;

use crate::Result;

/// Partitions assigned to one group member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberAssignment {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    /// topic -> partitions
    pub partitions: BTreeMap<String, Vec<i32>>,
}

impl MemberAssignment {
    /// Flatten into (topic, partition) pairs.
    pub fn topic_partitions(&self) -> impl Iterator<Item = (String, i32)> + '_ {
        self.partitions
            .iter()
            .flat_map(|(topic, parts)| parts.iter().map(move |p| (topic.clone(), *p)))
    }
}

/// Cluster-wide group administration
#[async_trait]
pub trait GroupAdmin: Send + Sync {
    /// Every group id known to any broker of the cluster.
    async fn list_groups(&self) -> Result<Vec<String>>;

    /// Members of a group with their assignments.
    async fn describe_group(&self, group_id: &str) -> Result<Vec<MemberAssignment>>;

    /// Open a client bound to `group_id`. The caller must close it.
    async fn open_consumer(&self, group_id: &str) -> Result<Box<dyn GroupConsumer>>;
}

/// Client bound to a single group id
#[async_trait]
pub trait GroupConsumer: Send {
    fn group_id(&self) -> &str;

    /// Last committed offset, `None` if the group never committed there.
    async fn committed(&mut self, topic: &str, partition: i32) -> Result<Option<i64>>;

    /// Position the group on `offset`; takes effect on the next commit.
    fn seek(&mut self, topic: &str, partition: i32, offset: i64);

    /// Commit every pending seek and wait for the broker's answer.
    async fn commit_sync(&mut self) -> Result<()>;

    /// Release the client and any broker-side resources it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Open a consumer for `group_id`, run `op` with it and close it on every
/// exit path, including a panic in `op`, which is resumed once the consumer is
/// closed. A failure to close is logged and does not mask `op`'s result.
pub async fn with_consumer<T, F>(admin: &dyn GroupAdmin, group_id: &str, op: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c mut dyn GroupConsumer) -> BoxFuture<'c, Result<T>>,
{
    let mut consumer = admin.open_consumer(group_id).await?;
    let outcome = AssertUnwindSafe(async { op(consumer.as_mut()).await })
        .catch_unwind()
        .await;
    let bound_to = consumer.group_id().to_string();
    if let Err(e) = consumer.close().await {
        warn!("Failed to close consumer for group {}: {}", bound_to, e);
    }
    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KafkaError;

    #[test]
    fn test_member_topic_partitions() {
        let member = MemberAssignment {
            partitions: BTreeMap::from([
                ("orders".to_string(), vec![0, 1]),
                ("payments".to_string(), vec![3]),
            ]),
            ..Default::default()
        };
        let pairs: Vec<_> = member.topic_partitions().collect();
        assert_eq!(
            pairs,
            vec![
                ("orders".to_string(), 0),
                ("orders".to_string(), 1),
                ("payments".to_string(), 3)
            ]
        );
    }

    #[tokio::test]
    async fn test_with_consumer_closes_on_success() {
        let admin = MemoryGroupAdmin::new();
        admin.commit("g1", "orders", 0, 10);

        let offset = with_consumer(&admin, "g1", |consumer| {
            async move { consumer.committed("orders", 0).await }.boxed()
        })
        .await
        .unwrap();

        assert_eq!(offset, Some(10));
        assert_eq!(admin.open_consumers(), 0);
        assert_eq!(admin.consumers_opened(), 1);
    }

    #[tokio::test]
    async fn test_with_consumer_closes_on_error() {
        let admin = MemoryGroupAdmin::new();

        let result: Result<()> = with_consumer(&admin, "g1", |_consumer| {
            async move { Err(KafkaError::Protocol("boom".into()).into()) }.boxed()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(admin.open_consumers(), 0);
    }

    async fn panicking_op(_consumer: &mut dyn GroupConsumer) -> Result<()> {
        panic!("offset read blew up")
    }

    #[tokio::test]
    async fn test_with_consumer_closes_on_panic() {
        let admin = MemoryGroupAdmin::new();

        let outcome = AssertUnwindSafe(with_consumer(&admin, "g1", |consumer| {
            panicking_op(consumer).boxed()
        }))
        .catch_unwind()
        .await;

        assert!(outcome.is_err());
        assert_eq!(admin.consumers_opened(), 1);
        assert_eq!(admin.open_consumers(), 0);
    }
}
