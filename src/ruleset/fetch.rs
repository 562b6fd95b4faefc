//! Fetch collaborator for remote and local content.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::ruleset::source::Origin;

/// Upper bound for a single remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Retrieves raw text from a URL or a file.
pub trait Fetcher: Send + Sync {
    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;

    fn fetch_local<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, FetchError>>;
}

/// Resolve any origin through `fetcher`. Inline rules need no I/O.
pub async fn fetch_origin(fetcher: &dyn Fetcher, origin: &Origin) -> Result<String, FetchError> {
    match origin {
        Origin::Remote(url) => fetcher.fetch_remote(url).await,
        Origin::Local(path) => fetcher.fetch_local(path).await,
        Origin::Inline(rule) => Ok(rule.clone()),
    }
}

/// Default fetcher: reqwest for URLs, tokio::fs for paths.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("subconverter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let http_err = |source| FetchError::Http {
                url: url.to_string(),
                source,
            };

            let response = self.client.get(url).send().await.map_err(http_err)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(http_err)?;
            tracing::debug!(url, bytes = body.len(), "Fetched remote content");
            Ok(body)
        })
    }

    fn fetch_local<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                })
        })
    }
}
