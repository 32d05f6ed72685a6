use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::downloader::item_downloader::{file_name, ItemDownloader};
use crate::types::types::{AudioTrack, ItemOutcome, ItemReport};

/// Receiving end of the track queue, shared by every worker.
type SharedQueue = Arc<Mutex<mpsc::Receiver<AudioTrack>>>;

/// Fixed set of workers draining one bounded track queue.
pub struct WorkerPool {
    downloader: Arc<ItemDownloader>,
    workers: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    pub fn new(downloader: Arc<ItemDownloader>) -> Self {
        let workers = downloader.config().workers();
        let queue_capacity = downloader.config().queue_capacity();
        Self {
            downloader,
            workers,
            queue_capacity,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns the workers and returns the queue sender plus the worker tasks.
    ///
    /// Every track pulled from the queue produces exactly one [`ItemReport`] on
    /// `reports`. Workers exit once the sender is dropped and the queue is empty.
    pub fn start(
        &self,
        reports: mpsc::UnboundedSender<ItemReport>,
    ) -> (mpsc::Sender<AudioTrack>, JoinSet<()>) {
        let (queue_tx, queue_rx) = mpsc::channel(self.queue_capacity);
        let queue: SharedQueue = Arc::new(Mutex::new(queue_rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let reports = reports.clone();
            let downloader = Arc::clone(&self.downloader);
            workers.spawn(run_worker(worker_id, queue, downloader, reports));
        }

        log::debug!(
            "[pool] started {} workers, queue capacity {}",
            self.workers,
            self.queue_capacity
        );

        (queue_tx, workers)
    }
}

async fn next_track(queue: &SharedQueue) -> Option<AudioTrack> {
    // The guard is released before the download starts.
    queue.lock().await.recv().await
}

async fn run_worker(
    worker_id: usize,
    queue: SharedQueue,
    downloader: Arc<ItemDownloader>,
    reports: mpsc::UnboundedSender<ItemReport>,
) {
    while let Some(track) = next_track(&queue).await {
        let name = file_name(&track);
        let outcome = match downloader.download(&track).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("[worker {}] {}: {}", worker_id, name, e);
                ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        log::info!("[worker {}] {} ({:?})", worker_id, name, outcome);

        let report = ItemReport {
            track_id: track.id,
            file_name: name,
            outcome,
        };
        if reports.send(report).is_err() {
            log::debug!("[worker {}] report channel closed, exiting", worker_id);
            return;
        }
    }
    log::debug!("[worker {}] queue drained", worker_id);
}
