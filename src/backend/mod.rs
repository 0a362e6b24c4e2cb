//! Collaborators the matching engine talks to: the posts API and the bearer
//! credential source.

use std::future::Future;

use thiserror::Error;

use crate::types::{HelpRequest, PostKind};

pub mod credentials;
pub mod http;

pub use credentials::{CredentialProvider, EnvCredential, StaticCredential};
pub use http::{HttpRequestFetcher, PostsApiConfig};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to posts API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("posts API returned HTTP {0}")]
    Status(u16),
    #[error("failed to decode posts payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fetch task did not complete: {0}")]
    Interrupted(String),
}

impl FetchError {
    /// Non-2xx responses are a silent "no update" rather than a failure.
    pub fn is_status(&self) -> bool {
        matches!(self, FetchError::Status(_))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of posts. The server applies the `kind` filter; everything else is
/// filtered locally.
pub trait RequestFetcher: Send + Sync + 'static {
    fn fetch_requests(
        &self,
        kind: PostKind,
    ) -> impl Future<Output = FetchResult<Vec<HelpRequest>>> + Send;
}
