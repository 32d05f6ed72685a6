use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::auth::credentials::Credentials;
use crate::catalog::catalog_source::CatalogSource;
use crate::types::types::{AudioGetResponse, AudioTrack, LoaderError};

pub const API_METHOD_ENDPOINT: &str = "https://api.vk.com/method";
pub const API_METHOD_GET_AUDIO: &str = "audio.get";
pub const API_VERSION: &str = "5.60";

/// Upper bound on tracks requested in one listing. Large enough for any account.
pub const MAX_TRACKS: &str = "5000";

/// Lists a user's audio tracks with a single `audio.get` call.
pub struct CatalogFetcher {
    client: Client,
    endpoint: String,
}

impl CatalogFetcher {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, API_METHOD_ENDPOINT)
    }

    /// Points the fetcher at a different API base, e.g. a local mock server.
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the full request URL including the credentials.
    pub fn request_url(&self, credentials: &Credentials) -> Result<Url, LoaderError> {
        let base = format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            API_METHOD_GET_AUDIO
        );
        Url::parse_with_params(
            &base,
            &[
                ("v", API_VERSION),
                ("owner_id", credentials.user_id.as_str()),
                ("access_token", credentials.access_token.as_str()),
                ("count", MAX_TRACKS),
            ],
        )
        .map_err(|e| LoaderError::InvalidConfig(format!("bad API endpoint {}: {}", base, e)))
    }
}

/// Decodes an `audio.get` body. An API error envelope is turned into [`LoaderError::Api`].
pub fn parse_audio_response(body: &[u8]) -> Result<Vec<AudioTrack>, LoaderError> {
    let decoded: AudioGetResponse = serde_json::from_slice(body)?;

    if let Some(err) = decoded.error {
        return Err(LoaderError::Api {
            code: err.error_code,
            message: err.error_msg,
        });
    }

    let collection = decoded.response.ok_or_else(|| LoaderError::Api {
        code: 0,
        message: "response has neither `response` nor `error`".to_string(),
    })?;

    if collection.count != collection.items.len() {
        log::debug!(
            "[catalog] account reports {} tracks, listing returned {}",
            collection.count,
            collection.items.len()
        );
    }

    Ok(collection.items)
}

#[async_trait]
impl CatalogSource for CatalogFetcher {
    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<AudioTrack>, LoaderError> {
        let url = self.request_url(credentials)?;
        log::info!(
            "[catalog] requesting {} for owner {}",
            API_METHOD_GET_AUDIO,
            credentials.user_id
        );

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::Status {
                status,
                url: format!("{}/{}", self.endpoint, API_METHOD_GET_AUDIO),
            });
        }

        let body = response.bytes().await?;
        let tracks = parse_audio_response(&body)?;
        log::info!("[catalog] received {} tracks", tracks.len());

        Ok(tracks)
    }
}
