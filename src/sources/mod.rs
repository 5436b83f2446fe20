//! Source adapters and the registry the CLI and batch driver resolve them from.
//!
//! Each adapter knows where its upstream lives, how to pull candidate records out of it,
//! and which output document it produces. Shared run logic lives in `compat`,
//! `layer_c` and `settings`.

pub mod azahar;
pub mod cemu;
pub mod compat;
pub mod dolphin;
pub mod dolphin_gameini;
pub mod duckstation_gamedb;
pub mod emudeck;
pub mod layer_c;
pub mod pcsx2;
pub mod pcsx2_gameindex;
pub mod ppsspp;
pub mod redream;
pub mod rp4pro;
pub mod rpcs3;
pub mod rpcs3_wiki;
pub mod scummvm;
pub mod settings;
pub mod vita3k;
pub mod xemu;
pub mod xenia;

pub use compat::{run_compat, CompatAdapter, CompatSource};
pub use layer_c::{run_layer_c, LayerCAdapter, LayerCSource};

use crate::error::{IngestError, Result};
use crate::fetch::{CachedFetcher, FetchOutcome};
use crate::schema::OutputDocument;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub const GITHUB_API_HOST: &str = "https://api.github.com/";
pub const DEFAULT_MAX_PAGES: usize = 50;

/// A runnable upstream source producing one canonical document.
pub trait IngestSource: Send + Sync {
    /// Stable identifier used on the command line and in output file names
    fn source_id(&self) -> &'static str;

    fn schema_version(&self) -> &'static str;

    fn run(&self, ctx: &IngestContext<'_>) -> Result<OutputDocument>;
}

/// Per-invocation knobs that only some adapters honor.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Cap on emitted items (sampling runs)
    pub limit: Option<usize>,
    /// Local checkout to read instead of the network (dolphin-gameini)
    pub local_dir: Option<PathBuf>,
    pub github_token: Option<String>,
    /// Page cap for paginated APIs
    pub max_pages: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            local_dir: None,
            github_token: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl RunOptions {
    /// Headers for `api.github.com`; the token is only sent when configured.
    pub fn github_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/vnd.github+json".to_string())];
        if let Some(token) = self.github_token.as_deref().filter(|t| !t.trim().is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token.trim())));
        }
        headers
    }

    pub fn apply_limit<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

pub struct IngestContext<'a> {
    pub fetcher: &'a CachedFetcher,
    pub options: RunOptions,
    pub generated_at: DateTime<Utc>,
}

impl<'a> IngestContext<'a> {
    pub fn new(fetcher: &'a CachedFetcher, options: RunOptions) -> Self {
        Self {
            fetcher,
            options,
            generated_at: Utc::now(),
        }
    }

    /// GitHub API calls carry auth headers; everything else is a plain cached GET.
    pub fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        if url.starts_with(GITHUB_API_HOST) {
            self.fetcher.fetch_with_headers(url, &self.options.github_headers())
        } else {
            self.fetcher.fetch(url)
        }
    }

    pub fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.fetch(url)?.text())
    }

    /// Undecoded body, for archives.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.fetch(url)?.content)
    }

    /// Tries each URL in order; the first successful fetch wins.
    pub fn fetch_first(&self, urls: &[&str]) -> Result<(String, String)> {
        let mut last_err = None;
        for url in urls {
            match self.fetch_text(url) {
                Ok(text) => return Ok((url.to_string(), text)),
                Err(e) => {
                    tracing::warn!(url, "fetch failed, trying next mirror: {}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| IngestError::Config("no URLs to fetch".into())))
    }
}

/// Resolves a possibly relative link against a site base. Unparseable input is kept as written.
pub fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    match reqwest::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!(base, href, "link not resolvable: {}", e);
            href.to_string()
        }
    }
}

/// Registry of built-in sources in a stable run order.
pub struct SourceRegistry {
    sources: Vec<Box<dyn IngestSource>>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        let sources: Vec<Box<dyn IngestSource>> = vec![
            Box::new(CompatSource(rpcs3::Rpcs3)),
            Box::new(CompatSource(dolphin::Dolphin)),
            Box::new(CompatSource(cemu::Cemu)),
            Box::new(CompatSource(pcsx2::Pcsx2)),
            Box::new(CompatSource(scummvm::ScummVm)),
            Box::new(CompatSource(azahar::Azahar)),
            Box::new(CompatSource(xenia::Xenia)),
            Box::new(CompatSource(ppsspp::Ppsspp)),
            Box::new(CompatSource(redream::Redream)),
            Box::new(CompatSource(xemu::Xemu)),
            Box::new(CompatSource(vita3k::Vita3k)),
            Box::new(pcsx2_gameindex::Pcsx2GameIndex),
            Box::new(duckstation_gamedb::DuckStationGameDb),
            Box::new(dolphin_gameini::DolphinGameIni),
            Box::new(rpcs3_wiki::Rpcs3WikiSettings::default()),
            Box::new(LayerCSource(emudeck::EmuDeck)),
            Box::new(LayerCSource(rp4pro::Rp4Pro::official())),
            Box::new(LayerCSource(rp4pro::Rp4Pro::community())),
        ];
        Self { sources }
    }

    pub fn register(&mut self, source: Box<dyn IngestSource>) {
        self.sources.push(source);
    }

    pub fn get(&self, source_id: &str) -> Result<&dyn IngestSource> {
        self.sources
            .iter()
            .find(|s| s.source_id() == source_id)
            .map(|s| s.as_ref())
            .ok_or_else(|| IngestError::UnknownSource(source_id.to_string()))
    }

    pub fn list_sources(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.source_id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn IngestSource> {
        self.sources.iter().map(|s| s.as_ref())
    }
}
