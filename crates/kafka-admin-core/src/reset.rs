//! Offset repositioning for one group on one partition.

use futures::FutureExt;
use tracing::{info, warn};

use crate::broker::{with_consumer, GroupAdmin};
use crate::metrics::AdminMetrics;
use crate::{Error, Result};

/// Commit `offset` as the position of `group_id` on `topic`/`partition`.
///
/// Uses a consumer bound to the group that is closed before returning. The
/// published snapshot is not touched; it reflects the new position after the
/// next refresh. Failures are returned as-is and not retried.
pub async fn reset_offset(
    admin: &dyn GroupAdmin,
    metrics: &AdminMetrics,
    group_id: &str,
    topic: &str,
    partition: i32,
    offset: i64,
) -> Result<()> {
    if offset < 0 {
        metrics.record_reset(false);
        return Err(Error::OffsetReset {
            group: group_id.to_string(),
            topic: topic.to_string(),
            partition,
            message: format!("offset must not be negative, got {}", offset),
        });
    }

    let owned_topic = topic.to_string();
    let result = with_consumer(admin, group_id, move |consumer| {
        async move {
            consumer.seek(&owned_topic, partition, offset);
            consumer.commit_sync().await
        }
        .boxed()
    })
    .await;

    match result {
        Ok(()) => {
            metrics.record_reset(true);
            info!(
                "Reset group {} on {}:{} to offset {}",
                group_id, topic, partition, offset
            );
            Ok(())
        }
        Err(e) => {
            metrics.record_reset(false);
            warn!(
                "Failed to reset group {} on {}:{}: {}",
                group_id, topic, partition, e
            );
            Err(Error::OffsetReset {
                group: group_id.to_string(),
                topic: topic.to_string(),
                partition,
                message: e.to_string(),
            })
        }
    }
}
