//! Async HTTP client pool with connection reuse and per-domain rate limiting.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::WalletError;

static GLOBAL_CLIENT: OnceLock<HttpClientPool> = OnceLock::new();

/// Pooled async client plus a per-domain token bucket.
pub struct HttpClientPool {
    client: Client,
    rate_limiter: Mutex<super::RateLimiter>,
}

impl HttpClientPool {
    fn new() -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(5)
            .tcp_nodelay(true)
            .user_agent(concat!("wayfinder-wallet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WalletError::from)?;

        Ok(Self {
            client,
            rate_limiter: Mutex::new(super::RateLimiter::new(10, 1)),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn check_rate_limit(&self, url: &str) -> WalletResult<()> {
        let domain = extract_domain(url);
        let mut limiter = self
            .rate_limiter
            .lock()
            .map_err(|_| WalletError::network_error("rate limiter lock poisoned"))?;

        if !limiter.check(&domain) {
            return Err(WalletError::network_error(format!("rate limit exceeded for {domain}")));
        }
        Ok(())
    }

    pub async fn get(&self, url: &str) -> WalletResult<reqwest::Response> {
        self.check_rate_limit(url)?;
        self.client.get(url).send().await.map_err(WalletError::from)
    }

    pub async fn post_json<T: Serialize + Sync>(&self, url: &str, body: &T) -> WalletResult<reqwest::Response> {
        self.check_rate_limit(url)?;
        self.client.post(url).json(body).send().await.map_err(WalletError::from)
    }

    pub async fn post_raw(&self, url: &str, body: String) -> WalletResult<reqwest::Response> {
        self.check_rate_limit(url)?;
        self.client.post(url).body(body).send().await.map_err(WalletError::from)
    }
}

use crate::error::WalletResult;

pub fn get_client_pool() -> &'static HttpClientPool {
    GLOBAL_CLIENT.get_or_init(|| HttpClientPool::new().expect("HTTP client pool initialization failed"))
}

pub fn get_client() -> &'static Client {
    get_client_pool().client()
}

pub async fn get(url: &str) -> WalletResult<reqwest::Response> {
    get_client_pool().get(url).await
}

pub async fn post_json<T: Serialize + Sync>(url: &str, body: &T) -> WalletResult<reqwest::Response> {
    get_client_pool().post_json(url, body).await
}

pub async fn post_raw(url: &str, body: String) -> WalletResult<reqwest::Response> {
    get_client_pool().post_raw(url, body).await
}

fn extract_domain(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
