//! Cached, conditional, retrying HTTP fetcher.
//!
//! A fresh cache entry is served without touching the network. A stale entry is
//! revalidated with `If-None-Match` / `If-Modified-Since`; a 304 restarts its
//! freshness window. Transport errors and transient statuses are retried with
//! backoff; anything else fails the fetch immediately.

pub mod cache;
pub mod retry;

pub use cache::{CacheEntry, CacheMeta, CacheStore};
pub use retry::{is_transient_status, RetryPolicy};

use crate::app::ports::{HttpClientPort, HttpGetResult, HttpRequest};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::infra::http_client::ReqwestHttp;
use crate::metrics::FetchMetrics;
use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub url: String,
    pub content: Vec<u8>,
    pub status_code: u16,
    pub from_cache: bool,
}

impl FetchOutcome {
    /// Body decoded as UTF-8 (lossy), without a leading byte-order mark.
    pub fn text(&self) -> String {
        let text = String::from_utf8_lossy(&self.content);
        text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
    }
}

pub struct CachedFetcher {
    http: Box<dyn HttpClientPort>,
    cache: CacheStore,
    max_age: Duration,
    retry: RetryPolicy,
}

impl CachedFetcher {
    pub fn new(
        http: Box<dyn HttpClientPort>,
        cache_dir: impl AsRef<Path>,
        max_age: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            cache: CacheStore::new(cache_dir.as_ref()),
            max_age,
            retry,
        }
    }

    /// Real network client configured from `[fetch]` and `[cache]`.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        let http = ReqwestHttp::new(&config.fetch.user_agent, config.timeout())?;
        Ok(Self::new(
            Box::new(http),
            &config.cache.dir,
            config.max_age(),
            RetryPolicy::from_config(&config.fetch),
        ))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        self.fetch_with_headers(url, &[])
    }

    /// Fetch with extra request headers (auth, Accept). Headers do not affect the cache key.
    pub fn fetch_with_headers(&self, url: &str, headers: &[(String, String)]) -> Result<FetchOutcome> {
        let now = Utc::now();
        let cached = self.cache.read(url);

        if let Some(entry) = &cached {
            if entry.is_fresh(now, self.max_age) {
                FetchMetrics::record_cache_hit();
                debug!(url, age_secs = entry.age(now).unwrap_or_default().as_secs(), "cache hit");
                return Ok(FetchOutcome {
                    url: url.to_string(),
                    content: entry.content.clone(),
                    status_code: 200,
                    from_cache: true,
                });
            }
        }

        let mut request = HttpRequest::new(url);
        request.headers.extend(headers.iter().cloned());
        if let Some(entry) = &cached {
            if let Some(etag) = &entry.meta.etag {
                request = request.header("If-None-Match", etag.clone());
            }
            if let Some(last_modified) = &entry.meta.last_modified {
                request = request.header("If-Modified-Since", last_modified.clone());
            }
        }

        let response = self.send_with_retry(&request)?;

        if response.status == 304 {
            if let Some(mut entry) = cached {
                FetchMetrics::record_not_modified();
                info!(url, "not modified, reusing cached body");
                entry.meta.fetched_at = Utc::now();
                // Servers may rotate validators on a 304
                if response.etag.is_some() {
                    entry.meta.etag = response.etag.clone();
                }
                if response.last_modified.is_some() {
                    entry.meta.last_modified = response.last_modified.clone();
                }
                if let Err(e) = self.cache.write_meta(&entry.meta) {
                    warn!(url, "failed to refresh cache metadata: {}", e);
                }
                return Ok(FetchOutcome {
                    url: url.to_string(),
                    content: entry.content,
                    status_code: 304,
                    from_cache: true,
                });
            }
            FetchMetrics::record_failure();
            return Err(IngestError::Fetch {
                url: url.to_string(),
                attempts: 1,
                status: Some(304),
                reason: "304 Not Modified without a cached body".to_string(),
            });
        }

        FetchMetrics::record_success(response.bytes.len());
        let meta = CacheMeta {
            url: url.to_string(),
            fetched_at: Utc::now(),
            etag: response.etag.clone(),
            last_modified: response.last_modified.clone(),
        };
        if let Err(e) = self.cache.write(&response.bytes, &meta) {
            warn!(url, "failed to write cache entry: {}", e);
        }
        info!(url, bytes = response.bytes.len(), "fetched");
        Ok(FetchOutcome {
            url: url.to_string(),
            content: response.bytes,
            status_code: response.status,
            from_cache: false,
        })
    }

    /// Returns a 2xx or 304 response, or a `Fetch` error once attempts run out.
    fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpGetResult> {
        let url = request.url.as_str();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let started = Instant::now();
            let result = self.http.get(request);
            FetchMetrics::record_request(started.elapsed().as_secs_f64());

            let (status, reason, retry_after) = match result {
                Ok(resp) if resp.is_success() || resp.status == 304 => return Ok(resp),
                Ok(resp) if is_transient_status(resp.status) => {
                    (Some(resp.status), format!("HTTP {}", resp.status), resp.retry_after)
                }
                Ok(resp) => {
                    FetchMetrics::record_failure();
                    return Err(IngestError::Fetch {
                        url: url.to_string(),
                        attempts: attempt,
                        status: Some(resp.status),
                        reason: format!("HTTP {}", resp.status),
                    });
                }
                Err(e) => (None, e, None),
            };

            if attempt >= self.retry.max_attempts {
                FetchMetrics::record_failure();
                warn!(url, attempts = attempt, "giving up: {}", reason);
                return Err(IngestError::Fetch {
                    url: url.to_string(),
                    attempts: attempt,
                    status,
                    reason,
                });
            }

            let delay = self.retry.delay_for(attempt, retry_after);
            FetchMetrics::record_retry();
            warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying: {}",
                reason
            );
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}
