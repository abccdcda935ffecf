use reqwest::{header::HeaderMap, StatusCode};

/// One fully-read HTTP response returned by [`crate::GitHubClient::dispatch`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the body as generic JSON.
    pub fn json(&self) -> crate::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
            .map_err(|err| crate::GitHubError::JsonParse(format!("{err}; body: {}", self.body)))
    }
}
