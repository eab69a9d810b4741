use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::FetchError;

/// Credential material for the authenticated feed, supplied out of band as
/// a JSON file and never inlined in code. Debug is not derived; secrets
/// must not reach logs.
#[derive(Clone, Deserialize)]
pub struct ApiCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl ApiCredentials {
    pub fn from_json_str(input: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let input = fs::read_to_string(path)?;
        Self::from_json_str(&input)
    }

    /// The request-signing step of the upstream SDK, rendered as a bearer
    /// header on the shared transport.
    #[must_use]
    pub fn authorization_header(&self) -> (String, String) {
        (
            "Authorization".to_owned(),
            format!("Bearer {}", self.access_token),
        )
    }
}
