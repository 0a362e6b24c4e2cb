use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{CredentialProvider, FetchError, FetchResult, RequestFetcher};
use crate::types::{HelpRequest, PostKind};

#[derive(Debug, Clone)]
pub struct PostsApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for PostsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// `GET {base_url}/api/posts?type=<kind>` with a bearer credential.
#[derive(Clone)]
pub struct HttpRequestFetcher {
    client: reqwest::Client,
    config: PostsApiConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRequestFetcher {
    pub fn new(
        config: PostsApiConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn posts_url(&self, kind: PostKind) -> String {
        format!(
            "{}/api/posts?type={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(kind.as_str())
        )
    }
}

impl RequestFetcher for HttpRequestFetcher {
    async fn fetch_requests(&self, kind: PostKind) -> FetchResult<Vec<HelpRequest>> {
        let url = self.posts_url(kind);
        let mut request = self.client.get(&url);
        match self.credentials.bearer_token() {
            Some(token) => request = request.bearer_auth(token),
            None => debug!(url = %url, "no bearer token available; sending unauthenticated"),
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let requests: Vec<HelpRequest> = serde_json::from_slice(&body)?;
        debug!(url = %url, count = requests.len(), "fetched posts");
        Ok(requests)
    }
}
