//! Entry point tying the sources, the refresher and the store together.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broker::{GroupAdmin, KafkaGroupAdmin};
use crate::cluster;
use crate::config::{Config, RefreshConfig};
use crate::coordination::{CoordinationClient, ZooKeeperClient};
use crate::health::{HealthCheck, HealthReport};
use crate::metrics::AdminMetrics;
use crate::model::{BrokerDescriptor, Group, OffsetSnapshot};
use crate::offset_store::OffsetStore;
use crate::refresher::{RefreshState, Refresher};
use crate::reset;
use crate::Result;

/// Read and write access to consumer group metadata.
///
/// Group queries are served from the last published snapshot and never wait
/// on the network. Broker and topic queries and offset resets go to the
/// collaborators directly.
pub struct AdminFacade {
    coordination: Arc<dyn CoordinationClient>,
    admin: Arc<dyn GroupAdmin>,
    store: Arc<OffsetStore>,
    health: Arc<HealthCheck>,
    metrics: Arc<AdminMetrics>,
    refresher: Arc<Refresher>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AdminFacade {
    /// Connect to ZooKeeper and Kafka. Either being unreachable is fatal.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let coordination = ZooKeeperClient::connect(&config.zookeeper).await?;
        let admin = KafkaGroupAdmin::connect(config.kafka.clone()).await?;

        Ok(Self::new(
            Arc::new(coordination),
            Arc::new(admin),
            &config.refresh,
        ))
    }

    /// Build a facade over already connected collaborators.
    pub fn new(
        coordination: Arc<dyn CoordinationClient>,
        admin: Arc<dyn GroupAdmin>,
        refresh: &RefreshConfig,
    ) -> Self {
        let store = Arc::new(OffsetStore::new());
        let health = Arc::new(HealthCheck::new());
        let metrics = Arc::new(AdminMetrics::new());
        let refresher = Arc::new(Refresher::new(
            coordination.clone(),
            admin.clone(),
            store.clone(),
            health.clone(),
            metrics.clone(),
            refresh.interval(),
            refresh.max_concurrent_groups,
        ));

        Self {
            coordination,
            admin,
            store,
            health,
            metrics,
            refresher,
            task: Mutex::new(None),
        }
    }

    /// Start the background refresher. Later calls do nothing.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!("Refresher already started");
            return;
        }
        *task = Some(self.refresher.clone().spawn());
        info!("Consumer group refresher started");
    }

    /// Run one refresh cycle on the caller's task.
    pub async fn refresh(&self) -> Result<usize> {
        self.refresher.refresh_once().await
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresher.state()
    }

    /// Group ids in the current snapshot.
    pub fn list_groups(&self) -> Vec<String> {
        self.store.list()
    }

    /// `None` if the group is not in the current snapshot.
    pub fn get_group(&self, group_id: &str) -> Option<Group> {
        self.store.get(group_id)
    }

    /// Topics a group holds offsets for, `None` if the group is unknown.
    pub fn group_topics(&self, group_id: &str) -> Option<Vec<String>> {
        self.store.get(group_id).map(|group| group.topics())
    }

    /// The whole current snapshot, for callers combining several reads.
    pub fn snapshot(&self) -> Arc<OffsetSnapshot> {
        self.store.snapshot()
    }

    /// Commit a new offset for a group. The snapshot catches up on the next
    /// refresh.
    pub async fn reset_offset(
        &self,
        group_id: &str,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> Result<()> {
        reset::reset_offset(
            self.admin.as_ref(),
            &self.metrics,
            group_id,
            topic,
            partition,
            offset,
        )
        .await
    }

    pub async fn brokers(&self) -> Result<Vec<i32>> {
        cluster::brokers(self.coordination.as_ref()).await
    }

    pub async fn broker(&self, id: i32) -> Result<Option<BrokerDescriptor>> {
        cluster::broker(self.coordination.as_ref(), id).await
    }

    pub async fn topics(&self) -> Result<Vec<String>> {
        cluster::topics(self.coordination.as_ref()).await
    }

    pub async fn legacy_groups_for_topic(&self, topic: &str) -> Result<Vec<String>> {
        cluster::legacy_groups_for_topic(self.coordination.as_ref(), topic).await
    }

    pub fn health(&self) -> HealthReport {
        self.health.report()
    }

    pub fn metrics(&self) -> &AdminMetrics {
        &self.metrics
    }
}
