use async_trait::async_trait;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Uri};
use hyper_tls::HttpsConnector;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Performs a single upstream GET and returns the raw body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Shared hyper client for http and https origins. No retries; redirects are
/// returned as-is by hyper and therefore surface as upstream errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let https = HttpsConnector::new();
        Self {
            client: Client::builder().build::<_, Body>(https),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let uri: Uri = url
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| RelayError::upstream_transport(url, e))?;

        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .header(hyper::header::USER_AGENT, concat!("poke_cache_server/", env!("CARGO_PKG_VERSION")))
            .body(Body::empty())
            .map_err(|e| RelayError::upstream_transport(url, e))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| RelayError::upstream_transport(url, e))?;

        let status = resp.status();
        debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(RelayError::upstream_status(url, status));
        }

        hyper::body::to_bytes(resp.into_body())
            .await
            .map_err(|e| RelayError::upstream_transport(url, e))
    }
}
