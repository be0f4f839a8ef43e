use async_trait::async_trait;

use crate::models::{Profile, Snapshot};
use crate::MonitorResult;

/// Source of live metrics for monitored entities.
///
/// Implementations must tolerate concurrent calls for distinct entities and
/// for the same entity from different cadences. Failures are reported with
/// [`MonitorError::TransientFetch`](crate::MonitorError::TransientFetch) when
/// a retry may succeed and
/// [`MonitorError::PermanentFetch`](crate::MonitorError::PermanentFetch) when
/// the entity no longer exists upstream.
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn fetch_live(&self, entity_id: &str) -> MonitorResult<Snapshot>;

    async fn fetch_profile(&self, entity_id: &str) -> MonitorResult<Profile>;

    /// Rejects ids this fetcher can never serve. Accepts everything by default.
    fn validate_entity_id(&self, _entity_id: &str) -> MonitorResult<()> {
        Ok(())
    }
}
