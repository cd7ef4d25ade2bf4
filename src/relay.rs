use bytes::Bytes;
use tracing::debug;

use crate::error::Result;
use crate::loader::Loader;
use crate::url_mapper::{ImageReference, MediaType};

#[derive(Debug, Clone)]
pub struct RelayedImage {
    pub media_type: MediaType,
    pub body: Bytes,
}

impl RelayedImage {
    pub fn content_type(&self) -> &'static str {
        self.media_type.content_type()
    }
}

/// Serves upstream images through the local `/img/...` namespace.
#[derive(Clone)]
pub struct ImageRelay {
    loader: Loader,
}

impl ImageRelay {
    pub fn new(loader: Loader) -> Self {
        Self { loader }
    }

    /// Bytes for a decoded local path. The extension is checked before any
    /// fetch is attempted.
    pub async fn relay(&self, reference: &ImageReference) -> Result<RelayedImage> {
        let media_type = reference.media_type()?;
        let url = reference.to_url();
        debug!("Relaying image {} as {}", url, media_type.content_type());

        let body = self.loader.load(&url).await?;
        Ok(RelayedImage { media_type, body })
    }

    /// Warms the cache for an embedded image URL and returns the local path
    /// to emit in its place.
    pub async fn localize(&self, url: &str) -> Result<String> {
        let reference = ImageReference::parse(url)?;
        self.loader.load(&reference.to_url()).await?;
        Ok(reference.to_local_path())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::MemoryStore;
    use crate::error::RelayError;
    use crate::loader::testing::FakeFetcher;

    fn relay() -> (Arc<FakeFetcher>, ImageRelay) {
        let fetcher = Arc::new(FakeFetcher::new());
        let loader = Loader::new(Arc::new(MemoryStore::new()), fetcher.clone());
        (fetcher, ImageRelay::new(loader))
    }

    #[tokio::test]
    async fn test_relay_sets_content_type() {
        let (fetcher, relay) = relay();
        fetcher.serve("https://img.example.com/sprites/1.PNG", vec![0x89, 0x50, 0x4e, 0x47]);

        let reference =
            ImageReference::from_local_path("/img/https/img.example.com/sprites/1.PNG").unwrap();
        let image = relay.relay(&reference).await.unwrap();

        assert_eq!(image.content_type(), "image/png");
        assert_eq!(image.body.as_ref(), &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn test_unsupported_extension_never_fetches() {
        let (fetcher, relay) = relay();
        fetcher.serve("https://img.example.com/evil.html", "<script>");

        let reference = ImageReference::from_local_parts("https", "img.example.com", "evil.html").unwrap();
        let err = relay.relay(&reference).await.unwrap_err();

        assert!(matches!(err, RelayError::UnsupportedMediaType(_)));
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_localize_warms_cache() {
        let (fetcher, relay) = relay();
        let url = "https://img.example.com/sprites/25.png";
        fetcher.serve(url, "png-bytes");

        let local = relay.localize(url).await.unwrap();
        assert_eq!(local, "/img/https/img.example.com/sprites/25.png");

        let reference = ImageReference::from_local_path(&local).unwrap();
        relay.relay(&reference).await.unwrap();
        assert_eq!(fetcher.calls(url), 1);
    }

    #[tokio::test]
    async fn test_localize_propagates_upstream_failure() {
        let (_, relay) = relay();
        let err = relay.localize("https://img.example.com/missing.png").await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream { .. }));
    }
}
