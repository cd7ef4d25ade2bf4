pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod locale;
pub mod logger;
pub mod network;
pub mod proxy;
pub mod random;
pub mod record;
pub mod relay;
pub mod url_mapper;
pub mod view;

pub use config::Config;
pub use error::{RelayError, Result};

pub mod prelude {
    pub use crate::cache::{CacheStore, MemoryStore, RedisStore, CACHE_TTL};
    pub use crate::catalog::{CatalogClient, Segment};
    pub use crate::loader::{CacheFailurePolicy, Loader};
    pub use crate::locale::{select_all, select_one, LanguageTagged, LocalizedItem};
    pub use crate::network::{Fetcher, HttpFetcher};
    pub use crate::proxy::{AppState, ProxyServer};
    pub use crate::record::Record;
    pub use crate::relay::ImageRelay;
    pub use crate::url_mapper::{decode_to_absolute_url, encode_local_path, ImageReference, MediaType};
    pub use crate::view::Presenter;
}
