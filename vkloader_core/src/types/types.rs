use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of concurrent download workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Default capacity of the descriptor queue between the coordinator and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("catalog API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid authorization URL: {0}")]
    InvalidAuthUrl(String),

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error("worker pool stopped after {completed} of {expected} items")]
    PoolStopped { completed: usize, expected: usize },
}

/// One catalog entry: where to fetch the payload and what to call the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioCollection {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub items: Vec<AudioTrack>,
}

/// Error envelope the VK API returns with a 200 status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

/// Top-level body of `audio.get`. Exactly one of the two fields is set.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioGetResponse {
    pub response: Option<AudioCollection>,
    pub error: Option<ApiErrorBody>,
}

/// Outcome of a single download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum ItemOutcome {
    Downloaded { bytes: u64 },
    Skipped,
    Failed { error: String },
}

/// Completion signal sent by a worker once per attempted track.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub track_id: u64,
    pub file_name: String,
    pub outcome: ItemOutcome,
}

/// Settings for one run of the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    workers: usize,
    skip_if_exists: bool,
    output_dir: PathBuf,
    queue_capacity: usize,
}

impl PoolConfig {
    pub fn builder(output_dir: impl Into<PathBuf>) -> PoolConfigBuilder {
        PoolConfigBuilder::new(output_dir)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn skip_if_exists(&self) -> bool {
        self.skip_if_exists
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

pub struct PoolConfigBuilder {
    workers: usize,
    skip_if_exists: bool,
    output_dir: PathBuf,
    queue_capacity: usize,
}

impl PoolConfigBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            skip_if_exists: false,
            output_dir: output_dir.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_skip_if_exists(mut self, skip: bool) -> Self {
        self.skip_if_exists = skip;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validates the settings. The output directory must already exist.
    pub fn build(self) -> Result<PoolConfig, LoaderError> {
        if self.workers == 0 {
            return Err(LoaderError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(LoaderError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if !self.output_dir.is_dir() {
            return Err(LoaderError::InvalidConfig(format!(
                "output directory {} does not exist",
                self.output_dir.display()
            )));
        }

        Ok(PoolConfig {
            workers: self.workers,
            skip_if_exists: self.skip_if_exists,
            output_dir: self.output_dir,
            queue_capacity: self.queue_capacity,
        })
    }
}
