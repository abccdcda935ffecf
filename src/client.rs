use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Method;
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    headers::{build_headers, ApiToken},
    retry::{AttemptOutcome, Decision, RetryState},
    ApiResponse, ClientOptions, GitHubError, Result,
};

/// Public GitHub REST API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Environment variable read by [`GitHubClient::from_env`].
pub const API_KEY_ENV: &str = "GITHUB_API_KEY";

/// HTTP client for the GitHub repository and release endpoints.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: ApiToken,
    options: ClientOptions,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for `api.github.com` with default options.
    pub fn new(token: ApiToken) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            token,
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from a raw personal access token.
    pub fn from_token(token: impl AsRef<str>) -> Result<Self> {
        Ok(Self::new(ApiToken::new(token)?))
    }

    /// Creates a client from the `GITHUB_API_KEY` environment variable.
    ///
    /// Returns [`GitHubError::Config`] if the variable is missing or empty.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use github_connector::GitHubClient;
    ///
    /// let github = GitHubClient::from_env().expect("missing GITHUB_API_KEY");
    /// ```
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(API_KEY_ENV).map_err(|_| {
            GitHubError::Config(format!("missing {API_KEY_ENV} environment variable"))
        })?;
        Self::from_token(token)
    }

    /// Points the client at another API root, e.g. a GitHub Enterprise host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// URL of the repository metadata endpoint.
    pub fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}", self.base_url)
    }

    /// URL of the latest-release endpoint.
    pub fn latest_release_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/releases/latest", self.repo_url(owner, repo))
    }

    /// Fetches repository metadata as generic JSON.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Value> {
        self.get_json(&self.repo_url(owner, repo)).await
    }

    /// Fetches the latest published release as generic JSON.
    pub async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<Value> {
        self.get_json(&self.latest_release_url(owner, repo)).await
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.dispatch(Method::GET, url).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(url, "decoding JSON response body");

        let decoded = response.json();

        #[cfg(feature = "tracing")]
        if let Err(err) = &decoded {
            tracing::error!(url, error = %err, "response body is not valid JSON");
        }

        decoded
    }

    /// Issues one logical request, retrying transient failures.
    ///
    /// - connection failures, timeouts, 5xx and other unexpected statuses
    ///   back off `backoff_base * 2^attempt`
    /// - 429/403 wait for `Retry-After`, else until `X-RateLimit-Reset`,
    ///   else retry at once
    /// - 404 fails immediately with [`GitHubError::NotFound`]
    ///
    /// Every retry consumes one attempt of [`ClientOptions::max_attempts`];
    /// when the budget is spent the call fails with
    /// [`GitHubError::MaxRetriesExceeded`] without a final wait.
    pub async fn dispatch(&self, method: Method, url: &str) -> Result<ApiResponse> {
        let mut state = RetryState::from_options(&self.options);

        #[cfg(feature = "tracing")]
        tracing::info!(%method, url, "commencing GitHub API call");

        loop {
            #[cfg(feature = "tracing")]
            tracing::info!(attempt = state.attempt(), url, "attempt initialized");

            let response = match self.send_once(method.clone(), url).await {
                Ok(response) => Some(response),
                Err(err) if is_connect_failure(&err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(url, error = %err, "could not connect to GitHub");
                    None
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(url, error = %err, "transport error");
                    return Err(GitHubError::Transport(err));
                }
            };

            let outcome = response.as_ref().map_or(AttemptOutcome::ConnectFailed, |resp| {
                AttemptOutcome::classify(resp.status, &resp.headers)
            });

            match (state.next(&outcome, unix_now()), response) {
                (Decision::Accept, Some(response)) => return Ok(response),
                (Decision::NotFound, _) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(url, "resource not found");
                    return Err(GitHubError::NotFound {
                        url: url.to_owned(),
                    });
                }
                (Decision::Retry { wait }, _) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        url,
                        ?outcome,
                        wait_secs = wait.as_secs_f64(),
                        "retryable failure, waiting before next attempt"
                    );
                    sleep(wait).await;
                }
                (Decision::Exhausted, _) | (Decision::Accept, None) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        url,
                        attempts = state.attempt(),
                        ?outcome,
                        "max retries exceeded"
                    );
                    return Err(GitHubError::MaxRetriesExceeded {
                        attempts: state.attempt(),
                    });
                }
            }
        }
    }

    async fn send_once(&self, method: Method, url: &str) -> reqwest::Result<ApiResponse> {
        let response = self
            .http
            .request(method, url)
            .headers(build_headers(&self.token))
            .timeout(self.options.timeout())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Failures where the connection was refused, dropped or timed out.
/// Builder errors (bad URL, bad header) stay terminal.
fn is_connect_failure(err: &reqwest::Error) -> bool {
    if err.is_builder() {
        return false;
    }
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
