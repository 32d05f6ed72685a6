use reqwest::Url;
use uuid::Uuid;

use crate::types::types::LoaderError;

/// Page the user is redirected to after granting access. The token arrives in its fragment.
pub const REDIRECT_URI: &str = "https://oauth.vk.com/blank.html";

const OAUTH_URL: &str =
    "https://oauth.vk.com/authorize?display=page&response_type=token&scope=audio,offline";

/// Identity used for the catalog request. Both values are opaque to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Extracts `user_id` and `access_token` from the fragment of the URL the
    /// browser ends up on after the implicit-grant flow.
    pub fn from_redirect_url(redirect: &str) -> Result<Self, LoaderError> {
        let parsed = Url::parse(redirect.trim())
            .map_err(|e| LoaderError::InvalidAuthUrl(format!("{}: {}", redirect, e)))?;

        let fragment = parsed
            .fragment()
            .ok_or_else(|| LoaderError::InvalidAuthUrl("URL has no fragment".to_string()))?;

        // Reuse the query parser for the fragment's key=value pairs.
        let mut scratch = parsed.clone();
        scratch.set_fragment(None);
        scratch.set_query(Some(fragment));

        let mut user_id = None;
        let mut access_token = None;
        for (key, value) in scratch.query_pairs() {
            match key.as_ref() {
                "user_id" => user_id = Some(value.into_owned()),
                "access_token" => access_token = Some(value.into_owned()),
                _ => {}
            }
        }

        match (user_id, access_token) {
            (Some(user_id), Some(access_token))
                if !user_id.is_empty() && !access_token.is_empty() =>
            {
                Ok(Self::new(user_id, access_token))
            }
            _ => Err(LoaderError::InvalidAuthUrl(
                "fragment is missing user_id or access_token".to_string(),
            )),
        }
    }
}

/// Builds the authorization URL the user opens in a browser.
pub fn oauth_url(client_id: &str) -> Result<String, LoaderError> {
    let mut url = Url::parse(OAUTH_URL).map_err(|e| LoaderError::InvalidAuthUrl(e.to_string()))?;
    let state = Uuid::new_v4().simple().to_string();

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("state", &state);

    Ok(url.to_string())
}
