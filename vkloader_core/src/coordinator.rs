use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;

use crate::auth::credentials::Credentials;
use crate::catalog::catalog_fetcher::CatalogFetcher;
use crate::catalog::catalog_source::CatalogSource;
use crate::downloader::item_downloader::ItemDownloader;
use crate::downloader::worker_pool::WorkerPool;
use crate::progress::notifier::CompletionNotifier;
use crate::progress::observer::RunObserver;
use crate::types::types::{LoaderError, PoolConfig};

/// Where a [`Coordinator`] is in its fetch → dispatch → wait cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Dispatching,
    Draining,
    Done,
}

/// Runs one full cycle: list the catalog, push every track through the
/// worker pool and return once each of them has been attempted.
pub struct Coordinator {
    credentials: Credentials,
    catalog: Arc<dyn CatalogSource>,
    pool: WorkerPool,
    observers: Vec<Arc<dyn RunObserver>>,
    phase: watch::Sender<RunPhase>,
}

impl Coordinator {
    /// Wires a loader against the public VK API.
    pub fn new(credentials: Credentials, config: PoolConfig) -> Result<Self, LoaderError> {
        let client = build_client(&config)?;
        let catalog = Arc::new(CatalogFetcher::new(client.clone()));
        Ok(Self::with_parts(credentials, catalog, client, config))
    }

    /// Same as [`Coordinator::new`] but listing from another API base.
    pub fn with_endpoint(
        credentials: Credentials,
        config: PoolConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self, LoaderError> {
        let client = build_client(&config)?;
        let catalog = Arc::new(CatalogFetcher::with_endpoint(client.clone(), endpoint));
        Ok(Self::with_parts(credentials, catalog, client, config))
    }

    pub fn with_parts(
        credentials: Credentials,
        catalog: Arc<dyn CatalogSource>,
        client: Client,
        config: PoolConfig,
    ) -> Self {
        let downloader = Arc::new(ItemDownloader::new(client, Arc::new(config)));
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            credentials,
            catalog,
            pool: WorkerPool::new(downloader),
            observers: Vec::new(),
            phase,
        }
    }

    /// Register an observer. Observers stay registered across runs.
    pub fn add_observer(&mut self, observer: Arc<dyn RunObserver>) {
        self.observers.push(observer);
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: RunPhase) {
        log::debug!("[coordinator] {:?} -> {:?}", self.phase(), phase);
        self.phase.send_replace(phase);
    }

    /// Fetches the catalog and downloads every track in it.
    ///
    /// Returns the number of tracks attempted once all of them are finished,
    /// whatever their individual outcome. Only catalog failures (and a pool
    /// that died mid-run) are errors.
    pub async fn run(&mut self) -> Result<usize, LoaderError> {
        self.enter(RunPhase::Fetching);
        let tracks = match self.catalog.fetch(&self.credentials).await {
            Ok(tracks) => tracks,
            Err(e) => {
                self.enter(RunPhase::Idle);
                return Err(e);
            }
        };
        let expected = tracks.len();
        log::info!(
            "[coordinator] {} tracks, {} workers",
            expected,
            self.pool.workers()
        );

        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (queue_tx, mut workers) = self.pool.start(report_tx);

        self.enter(RunPhase::Dispatching);
        // Feeding runs alongside draining; it blocks whenever the queue is full.
        // Dropping `queue_tx` at the end closes the queue.
        let producer = tokio::spawn(async move {
            let mut dispatched = 0usize;
            for track in tracks {
                if queue_tx.send(track).await.is_err() {
                    break;
                }
                dispatched += 1;
            }
            dispatched
        });

        self.enter(RunPhase::Draining);
        let notifier = CompletionNotifier::with_observers(expected, self.observers.clone());
        let drained = notifier.run(report_rx).await;

        let dispatched = joined(producer.await);
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                log::error!("[coordinator] worker task failed: {}", e);
            }
        }

        let (snapshot, dispatched) = match drained.and_then(|s| dispatched.map(|n| (s, n))) {
            Ok(done) => done,
            Err(e) => {
                self.enter(RunPhase::Idle);
                return Err(e);
            }
        };
        log::debug!("[coordinator] dispatched {} tracks", dispatched);
        log::info!(
            "[coordinator] done: {} downloaded, {} skipped, {} failed",
            snapshot.downloaded,
            snapshot.skipped,
            snapshot.failed
        );

        self.enter(RunPhase::Done);
        Ok(snapshot.attempted)
    }
}

fn joined<T>(result: Result<T, JoinError>) -> Result<T, LoaderError> {
    result.map_err(|e| LoaderError::TaskFailed(e.to_string()))
}

/// One HTTP client shared by the catalog request and every worker.
pub fn build_client(config: &PoolConfig) -> Result<Client, LoaderError> {
    let client = Client::builder()
        .pool_max_idle_per_host(config.workers())
        .tcp_nodelay(true)
        .build()?;
    Ok(client)
}
