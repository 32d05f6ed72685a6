use std::sync::Arc;

use tokio::sync::mpsc;

use super::observer::RunObserver;
use super::snapshot::RunSnapshot;
use crate::types::types::{ItemReport, LoaderError};

/// Drains worker reports, keeps a [`RunSnapshot`] and fans out to observers.
///
/// # Lifecycle
///
/// | Event                         | Observer method called      |
/// |-------------------------------|-----------------------------|
/// | `run()` starts                | `on_catalog(expected)`      |
/// | report received               | `on_item(&report, &snap)`   |
/// | `expected` reports received   | `on_finish(&final_snap)`    |
///
/// If the channel closes early the run is reported as
/// [`LoaderError::PoolStopped`] and `on_finish` is not called.
pub struct CompletionNotifier {
    observers: Vec<Arc<dyn RunObserver>>,
    snapshot: RunSnapshot,
}

impl CompletionNotifier {
    pub fn with_observers(expected: usize, observers: Vec<Arc<dyn RunObserver>>) -> Self {
        Self {
            observers,
            snapshot: RunSnapshot::new(expected),
        }
    }

    /// Waits for exactly `expected` reports and returns the final snapshot.
    pub async fn run(
        mut self,
        mut reports: mpsc::UnboundedReceiver<ItemReport>,
    ) -> Result<RunSnapshot, LoaderError> {
        let expected = self.snapshot.total;
        for observer in &self.observers {
            observer.on_catalog(expected).await;
        }

        while self.snapshot.attempted < expected {
            let Some(report) = reports.recv().await else {
                return Err(LoaderError::PoolStopped {
                    completed: self.snapshot.attempted,
                    expected,
                });
            };
            self.snapshot.record(&report.outcome);
            for observer in &self.observers {
                observer.on_item(&report, &self.snapshot).await;
            }
        }

        self.snapshot.done = true;
        for observer in &self.observers {
            observer.on_finish(&self.snapshot).await;
        }
        Ok(self.snapshot)
    }
}
