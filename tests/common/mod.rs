#![allow(dead_code)]

use compat_ingest::app::ports::{HttpClientPort, HttpGetResult, HttpRequest};
use compat_ingest::fetch::{CachedFetcher, RetryPolicy};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    responses: HashMap<String, VecDeque<Result<HttpGetResult, String>>>,
    requests: Vec<HttpRequest>,
}

/// Scripted HTTP port. Each URL serves its queued responses in order and keeps
/// repeating the last one; unknown URLs get a 404.
#[derive(Clone, Default)]
pub struct FakeHttp {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: HttpGetResult) -> &Self {
        self.push(url, Ok(response))
    }

    pub fn fail(&self, url: &str, reason: &str) -> &Self {
        self.push(url, Err(reason.to_string()))
    }

    fn push(&self, url: &str, response: Result<HttpGetResult, String>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.state.lock().unwrap().requests.iter().filter(|r| r.url == url).count()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }
}

impl HttpClientPort for FakeHttp {
    fn get(&self, req: &HttpRequest) -> Result<HttpGetResult, String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(req.clone());
        match state.responses.get_mut(&req.url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Ok(HttpGetResult::with_status(404, "not found")),
        }
    }
}

pub fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn fetcher(http: &FakeHttp, cache_dir: &Path, max_age: Duration, attempts: u32) -> CachedFetcher {
    CachedFetcher::new(Box::new(http.clone()), cache_dir, max_age, RetryPolicy::immediate(attempts))
}

pub fn html(body: &str) -> HttpGetResult {
    let mut resp = HttpGetResult::ok(body.as_bytes().to_vec());
    resp.content_type = "text/html; charset=utf-8".to_string();
    resp
}

pub fn compile_schema(schema: &str) -> jsonschema::JSONSchema {
    let schema_json: serde_json::Value = serde_json::from_str(schema).unwrap();
    let schema_static: &'static serde_json::Value = Box::leak(Box::new(schema_json));
    jsonschema::JSONSchema::options().compile(schema_static).unwrap()
}

/// In-memory zip built from `(name, body)` pairs.
pub fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in files {
        writer.start_file(*name, zip::write::FileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
