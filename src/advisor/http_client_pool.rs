//! HTTP Client Pool for maintaining persistent connections.
//!
//! The model client, the HTTP function handlers and the knowledge-base client all talk to
//! long-lived endpoints. Each base URL gets its own configured `reqwest::Client` so
//! connections (and TLS sessions) are reused across tool calls within a session.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

lazy_static! {
    /// Global cache of HTTP clients indexed by base URL.
    static ref CLIENT_POOL: Mutex<HashMap<String, reqwest::Client>> = Mutex::new(HashMap::new());
}

/// Creates or retrieves a shared HTTP client for the given base URL.
///
/// A poisoned pool lock degrades to a fresh, unpooled client.
pub fn get_or_create_client(base_url: &str) -> reqwest::Client {
    let mut pool = match CLIENT_POOL.lock() {
        Ok(pool) => pool,
        Err(_) => return create_pooled_client(),
    };

    pool.entry(base_url.to_string())
        .or_insert_with(create_pooled_client)
        .clone()
}

/// Creates a new reqwest client with connection pooling settings:
/// - `pool_max_idle_per_host(10)`
/// - `pool_idle_timeout(90s)`
/// - `tcp_keepalive(60s)`
/// - `connect_timeout(30s)`
fn create_pooled_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|err| {
            log::warn!("falling back to default HTTP client: {}", err);
            reqwest::Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_contains(url: &str) -> bool {
        CLIENT_POOL
            .lock()
            .map(|pool| pool.contains_key(url))
            .unwrap_or(false)
    }

    #[test]
    fn test_client_pool_registers_each_base_url() {
        let bedrock = "https://bedrock-runtime.us-east-1.amazonaws.com";
        let handler = "http://localhost:9000/sql";

        let _a = get_or_create_client(bedrock);
        let _b = get_or_create_client(bedrock);
        let _c = get_or_create_client(handler);

        assert!(pool_contains(bedrock));
        assert!(pool_contains(handler));
    }
}
