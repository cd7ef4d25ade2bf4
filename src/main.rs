use std::sync::Arc;
use std::time::Duration;

use poke_cache_server::cache::CacheCleaner;
use poke_cache_server::config::CacheBackend;
use poke_cache_server::logger::init_logger;
use poke_cache_server::prelude::*;
use poke_cache_server::random::ThreadRandom;
use poke_cache_server::Config;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("Starting poke cache server");

    let config = Config::load()?;
    let addr = config.listen_addr()?;

    let cache = create_cache(&config)?;
    let loader = Loader::new(cache, Arc::new(HttpFetcher::new()))
        .with_ttl(config.cache_ttl())
        .with_cache_failure_policy(config.cache.on_unavailable);

    let catalog = CatalogClient::new(&config.catalog.base_url, loader.clone())?;
    info!("Catalog origin: {}", catalog.base_url());

    let relay = ImageRelay::new(loader);
    let presenter = Presenter::new(
        catalog,
        relay.clone(),
        Arc::new(ThreadRandom),
        config.locale_preferences(),
    );

    let server = ProxyServer::new(addr, AppState { presenter, relay });
    if let Err(e) = server.run(wait_for_shutdown()).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

fn create_cache(config: &Config) -> Result<Arc<dyn CacheStore>, Box<dyn std::error::Error>> {
    match config.cache.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisStore::open(
            &config.cache.redis_url,
            config.cache.key_prefix.clone(),
        )?)),
        CacheBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            if config.cache.cleanup_interval_secs > 0 {
                let interval = Duration::from_secs(config.cache.cleanup_interval_secs);
                CacheCleaner::new(store.clone(), interval).start();
            }
            info!("Using in-memory cache store");
            Ok(store)
        }
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
