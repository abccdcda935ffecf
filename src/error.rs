/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// GitHub answered 404 for the requested resource. Never retried.
    #[error("resource not found: {url}")]
    NotFound { url: String },
    /// Every attempt failed with a retryable condition.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
    /// A successful response carried a body that is not valid JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
    /// Transport failure that is not a connection failure or timeout.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Missing or unusable client configuration, such as the API token.
    #[error("configuration error: {0}")]
    Config(String),
}
