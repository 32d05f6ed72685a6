use async_trait::async_trait;

use crate::auth::credentials::Credentials;
use crate::types::types::{AudioTrack, LoaderError};

/// Anything that can list the tracks to download for a user.
///
/// Any error returned here aborts the whole run before a single download starts.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<AudioTrack>, LoaderError>;
}
