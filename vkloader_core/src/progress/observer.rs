use async_trait::async_trait;

use super::snapshot::RunSnapshot;
use crate::types::types::ItemReport;

/// Trait for anything that wants to watch a run.
///
/// Lifecycle:
/// - `on_catalog` is called once the listing is known, before any report.
/// - `on_item` is called once per attempted track, in completion order.
/// - `on_finish` is called once after the last report of the run.
#[async_trait]
pub trait RunObserver: Send + Sync + 'static {
    async fn on_catalog(&self, _total: usize) {}

    async fn on_item(&self, report: &ItemReport, snapshot: &RunSnapshot);

    async fn on_finish(&self, snapshot: &RunSnapshot);
}
