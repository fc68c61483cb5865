//! HTTP fetch client with basic bot-detection avoidance.
//!
//! The tracked sites sit behind WAFs that block obvious scripted
//! traffic, so requests rotate desktop user agents, send browser-like
//! headers, and retry transient failures with exponential backoff and
//! jitter. Per-domain cookies (`EXTRA_COOKIES_JSON`) and an optional
//! proxy (`PROXY_URL`) come from the environment.

use rand::Rng;
use reqwest::{Client, ClientBuilder, StatusCode, Url};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Desktop user agents to rotate through.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_retry_delay_ms: 1500,
            max_retry_delay_ms: 8000,
        }
    }
}

pub struct FetchClient {
    client: Client,
    config: FetchConfig,
    /// host -> cookie name -> value, from EXTRA_COOKIES_JSON.
    extra_cookies: HashMap<String, HashMap<String, String>>,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert("Accept-Language", "es-ES,es;q=0.9,en;q=0.8".parse().unwrap());
        headers.insert("Cache-Control", "no-cache".parse().unwrap());
        headers.insert("Pragma", "no-cache".parse().unwrap());
        headers.insert("Upgrade-Insecure-Requests", "1".parse().unwrap());

        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers);

        if let Ok(proxy_url) = std::env::var("PROXY_URL") {
            let proxy_url = proxy_url.trim();
            if !proxy_url.is_empty() {
                if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
                    builder = builder.proxy(proxy);
                } else {
                    log::warn!("Ignoring unparseable PROXY_URL");
                }
            }
        }

        Ok(Self {
            client: builder.build()?,
            config,
            extra_cookies: load_extra_cookies(),
        })
    }

    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// Exponential backoff with jitter, capped at the configured max.
    fn retry_delay(&self, attempt: usize) -> Duration {
        let base = self.config.initial_retry_delay_ms;
        let ms = (base * 2u64.pow(attempt as u32)).min(self.config.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((ms as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status.as_u16(),
            // rate limiting, anti-bot, server errors, Cloudflare
            403 | 429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
        )
    }

    fn cookie_header_for(&self, url: &str) -> Option<String> {
        let host = Url::parse(url).ok()?.host_str()?.to_string();
        let cookies = self.extra_cookies.get(&host)?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Fetch a page body. Retries transient failures; a persistent
    /// non-2xx status or network error surfaces as `FetchError`.
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 0..=self.config.max_retries {
            let mut request = self
                .client
                .get(url)
                .header("User-Agent", Self::random_user_agent());
            if let Some(cookie) = self.cookie_header_for(url) {
                request = request.header("Cookie", cookie);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.text().await?);
                    }
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "Status {} for {}, retry {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries
                        );
                        sleep(self.retry_delay(attempt)).await;
                        last_err = Some(FetchError::Status(status));
                        continue;
                    }
                    return Err(FetchError::Status(status));
                }
                Err(e) => {
                    let retryable = e.is_timeout() || e.is_connect() || e.is_request();
                    if retryable && attempt < self.config.max_retries {
                        log::warn!(
                            "Request error for {}, retry {}/{}: {}",
                            url,
                            attempt + 1,
                            self.config.max_retries,
                            e
                        );
                        sleep(self.retry_delay(attempt)).await;
                        last_err = Some(FetchError::Network(e));
                        continue;
                    }
                    return Err(FetchError::Network(e));
                }
            }
        }

        Err(last_err.expect("retry loop exits with an error"))
    }
}

/// Parse EXTRA_COOKIES_JSON into host -> cookies. Accepts either bare
/// hosts or full URLs as keys. Malformed input is ignored with a warn.
///
/// ```json
/// {"m440.in": {"cf_clearance": "..."}, "https://zonatmo.com": {"cf_clearance": "..."}}
/// ```
fn load_extra_cookies() -> HashMap<String, HashMap<String, String>> {
    let raw = match std::env::var("EXTRA_COOKIES_JSON") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return HashMap::new(),
    };
    match serde_json::from_str::<HashMap<String, HashMap<String, String>>>(&raw) {
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| (normalize_host(&k), v))
            .collect(),
        Err(e) => {
            log::warn!("Ignoring malformed EXTRA_COOKIES_JSON: {}", e);
            HashMap::new()
        }
    }
}

fn normalize_host(key: &str) -> String {
    if let Ok(url) = Url::parse(key) {
        if let Some(host) = url.host_str() {
            return host.to_string();
        }
    }
    key.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_matches('/')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_random_user_agent() {
        let ua = FetchClient::random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn test_retry_delay_grows() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let d0 = client.retry_delay(0);
        let d2 = client.retry_delay(2);
        assert!(d0.as_millis() > 0);
        assert!(d2.as_millis() >= d0.as_millis());
    }

    #[test]
    fn test_retryable_status() {
        assert!(FetchClient::is_retryable_status(StatusCode::FORBIDDEN));
        assert!(FetchClient::is_retryable_status(
            StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(FetchClient::is_retryable_status(
            StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(!FetchClient::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!FetchClient::is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("m440.in"), "m440.in");
        assert_eq!(normalize_host("https://zonatmo.com/"), "zonatmo.com");
        assert_eq!(normalize_host("http://animebbg.net"), "animebbg.net");
    }
}
