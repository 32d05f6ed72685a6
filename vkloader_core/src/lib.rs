//! Batch downloader for a VK user's audio tracks.
//!
//! [`coordinator::Coordinator`] lists the tracks once, then pushes them through a
//! fixed-size pool of workers that each stream one payload to disk at a time.

pub mod auth;
pub mod catalog;
pub mod coordinator;
pub mod downloader;
pub mod progress;
pub mod types;

pub use auth::credentials::Credentials;
pub use coordinator::{Coordinator, RunPhase};
pub use types::types::{AudioTrack, ItemOutcome, ItemReport, LoaderError, PoolConfig};
