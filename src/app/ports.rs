use std::time::Duration;

/// Outbound HTTP seen by the fetcher. Implementations must not follow conditional
/// semantics themselves; a 304 is returned as-is.
pub trait HttpClientPort: Send + Sync {
    fn get(&self, req: &HttpRequest) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug, Default)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub retry_after: Option<Duration>,
}

impl HttpGetResult {
    pub fn ok(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_status(200, bytes)
    }

    pub fn with_status(status: u16, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            bytes: bytes.into(),
            content_type: "application/octet-stream".to_string(),
            etag: None,
            last_modified: None,
            retry_after: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
