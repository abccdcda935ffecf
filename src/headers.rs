use std::fmt;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{GitHubError, Result};

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("github-connector/", env!("CARGO_PKG_VERSION"));

/// A GitHub API token, validated once so every later request can use it.
#[derive(Clone)]
pub struct ApiToken {
    authorization: HeaderValue,
}

impl ApiToken {
    /// Wraps a raw personal access token as `Authorization: token <value>`.
    ///
    /// Fails when the token is empty or contains bytes that are not allowed
    /// in an HTTP header value.
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(GitHubError::Config("API token is empty".to_owned()));
        }
        let mut authorization = HeaderValue::from_str(&format!("token {token}")).map_err(|_| {
            GitHubError::Config("API token contains characters not allowed in a header".to_owned())
        })?;
        authorization.set_sensitive(true);
        Ok(Self { authorization })
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Builds the fixed header set sent with every GitHub request.
pub fn build_headers(token: &ApiToken) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(header::AUTHORIZATION, token.authorization.clone());
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}
