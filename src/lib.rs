//! `github-connector` is an async client for two read-only GitHub REST
//! endpoints with rate-limit aware retries:
//! - [`GitHubClient::get_repo`]
//! - [`GitHubClient::get_latest_release`]
//!
//! Both go through [`GitHubClient::dispatch`], which owns the retry and
//! backoff policy described in [`retry`].

mod client;
mod error;
mod headers;
mod options;
pub mod retry;
mod types;

pub use client::{GitHubClient, API_KEY_ENV, DEFAULT_BASE_URL};
pub use error::GitHubError;
pub use headers::{build_headers, ApiToken};
pub use options::ClientOptions;
pub use reqwest::Method;
pub use types::ApiResponse;

pub type Result<T> = std::result::Result<T, GitHubError>;
