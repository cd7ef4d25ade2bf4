use tracing::debug;

use crate::error::{RelayError, Result};
use crate::loader::Loader;
use crate::record::Record;

pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2/";

/// One path component of a catalog resource: a resource name or a numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Name(String),
    Id(u64),
    /// Rejected when the URL is built; kept so callers can pass signed ids.
    Negative(i64),
}

impl Segment {
    fn render(&self) -> Result<String> {
        match self {
            Segment::Id(id) => Ok(id.to_string()),
            Segment::Negative(id) => Err(RelayError::InvalidArgument(format!(
                "negative resource id: {}",
                id
            ))),
            Segment::Name(name) => {
                // Only URL-unreserved characters pass through unescaped.
                let unsafe_char = name
                    .chars()
                    .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')));
                if name.is_empty() || name == "." || name == ".." || unsafe_char {
                    return Err(RelayError::InvalidArgument(format!(
                        "unsafe path segment: {:?}",
                        name
                    )));
                }
                Ok(name.clone())
            }
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Name(name.to_string())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Segment::Name(name)
    }
}

impl From<u64> for Segment {
    fn from(id: u64) -> Self {
        Segment::Id(id)
    }
}

impl From<u32> for Segment {
    fn from(id: u32) -> Self {
        Segment::Id(id.into())
    }
}

impl From<i64> for Segment {
    fn from(id: i64) -> Self {
        u64::try_from(id).map(Segment::Id).unwrap_or(Segment::Negative(id))
    }
}

/// Read-only client for the catalog origin. Every document goes through the
/// cache-aside [`Loader`], keyed by its absolute URL.
#[derive(Clone)]
pub struct CatalogClient {
    base: String,
    loader: Loader,
}

impl CatalogClient {
    pub fn new(base: &str, loader: Loader) -> Result<Self> {
        let parsed = url::Url::parse(base)
            .map_err(|e| RelayError::Config(format!("invalid catalog url {}: {}", base, e)))?;
        if parsed.cannot_be_a_base() || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(RelayError::Config(format!("invalid catalog url: {}", base)));
        }

        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self { base, loader })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL for the given segments, e.g. `pokemon-species/25`.
    pub fn url_for(&self, segments: &[Segment]) -> Result<String> {
        let rendered = segments
            .iter()
            .map(Segment::render)
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}{}", self.base, rendered.join("/")))
    }

    pub async fn get(&self, segments: &[Segment]) -> Result<Record> {
        let url = self.url_for(segments)?;
        debug!("Catalog lookup: {}", url);
        let data = self.loader.load(&url).await?;
        let value = serde_json::from_slice(&data).map_err(|source| RelayError::Decode {
            url: url.clone(),
            source,
        })?;
        Ok(Record::new(value))
    }

    pub async fn species(&self, id: u64) -> Result<Record> {
        self.get(&["pokemon-species".into(), id.into()]).await
    }

    pub async fn pokemon(&self, id: u64) -> Result<Record> {
        self.get(&["pokemon".into(), id.into()]).await
    }

    pub async fn type_named(&self, name: &str) -> Result<Record> {
        self.get(&["type".into(), name.into()]).await
    }

    /// Number of species the catalog knows about.
    pub async fn species_count(&self) -> Result<u64> {
        let url = self.url_for(&["pokemon-species".into()])?;
        self.get(&["pokemon-species".into()])
            .await?
            .count()
            .ok_or_else(|| RelayError::Decode {
                url,
                source: serde::de::Error::missing_field("count"),
            })
    }
}
