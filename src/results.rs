//! Result sink: the narrow interface onto an external results store.
//! Failure here is non-fatal (spec section 6/7): logged and surfaced as a
//! `persistence` error, never reverting a `FINISHED` lifecycle transition.

use async_trait::async_trait;

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Called exactly once per `FINISHED` transition.
    async fn record_race_result(
        &self,
        race_id: u64,
        finish_order: &[String],
        elapsed_ms: u64,
    ) -> anyhow::Result<()>;
}

/// Default sink for standalone deployments: logs the standings instead of
/// persisting them anywhere.
pub struct LoggingSink;

#[async_trait]
impl ResultSink for LoggingSink {
    async fn record_race_result(
        &self,
        race_id: u64,
        finish_order: &[String],
        elapsed_ms: u64,
    ) -> anyhow::Result<()> {
        log::info!(
            "race {race_id} finished in {elapsed_ms}ms, standings: {:?}",
            finish_order
        );
        Ok(())
    }
}
