use std::time::Duration;

use hyper::{Method, StatusCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise this crate logs at info.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poke_cache_server=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

pub fn log_request(method: &Method, path: &str, status: StatusCode, duration: Duration) {
    info!(
        target: "request",
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );
}
