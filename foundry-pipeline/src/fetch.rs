//! Source retrieval: URL validation, HTTP fetch and visible-text extraction.

use async_trait::async_trait;
use foundry_core::{ConfigError, FoundryConfig, FoundryError, FoundryResult};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;
use scraper::{ElementRef, Html, Node};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("foundry-pipeline/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;
/// Largest page body read from the network. Longer bodies are cut here,
/// bodies that declare a larger length are refused.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Subtrees that never contribute visible text.
const SKIPPED_ELEMENTS: [&str; 7] = [
    "script", "style", "nav", "footer", "head", "header", "noscript",
];

static WHITESPACE_RUN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\s{3,}"));

/// Parse a source reference. Only absolute `http`/`https` URLs are accepted.
pub fn parse_source_url(raw: &str) -> FoundryResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| FoundryError::invalid_input("url", format!("'{}' is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(FoundryError::invalid_input(
            "url",
            format!("unsupported scheme '{}'", scheme),
        )),
    }
}

/// Retrieves the visible text behind a source URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// # Errors
    /// `Fetch` if the source is unreachable, answers with an error status,
    /// or is not text.
    async fn fetch(&self, url: &Url) -> FoundryResult<String>;
}

// ============================================================================
// TEXT EXTRACTION
// ============================================================================

/// Visible text of an HTML document, cut to `max_chars` characters.
///
/// Text nodes are trimmed and joined with single spaces; any run of three or
/// more whitespace characters left inside a node becomes a paragraph break.
pub fn extract_visible_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);

    let joined = parts.join(" ");
    let text = match &*WHITESPACE_RUN {
        Ok(re) => re.replace_all(&joined, "\n\n").into_owned(),
        Err(_) => joined,
    };
    text.chars().take(max_chars).collect()
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, parts);
                }
            }
            _ => {}
        }
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/") || mime == "application/xhtml+xml" || mime == "application/xml"
}

fn check_declared_length(content_length: Option<u64>, limit: usize) -> Result<(), String> {
    match content_length {
        Some(length) if length > limit as u64 => Err(format!(
            "body of {} bytes exceeds the {} byte limit",
            length, limit
        )),
        _ => Ok(()),
    }
}

/// Append `chunk` without growing `body` past `limit`. Returns true once
/// the limit is reached.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= limit
}

// ============================================================================
// HTTP FETCHER
// ============================================================================

/// Fetches pages over HTTP(S), following redirects.
pub struct HttpContentFetcher {
    client: Client,
    max_chars: usize,
    max_body_bytes: usize,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration, max_chars: usize) -> FoundryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            max_chars,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn from_config(config: &FoundryConfig) -> FoundryResult<Self> {
        Self::new(config.request_timeout, config.fetch_max_chars)
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &Url) -> FoundryResult<String> {
        let fetch_error = |reason: String| FoundryError::Fetch {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_textual(content_type) {
                return Err(fetch_error(format!("unsupported content type '{}'", content_type)));
            }
        }

        check_declared_length(response.content_length(), self.max_body_bytes).map_err(fetch_error)?;

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?
        {
            if append_capped(&mut body, &chunk, self.max_body_bytes) {
                debug!(url = %url, limit = self.max_body_bytes, "Source page cut at body limit");
                break;
            }
        }
        let body = String::from_utf8_lossy(&body);
        debug!(url = %url, bytes = body.len(), "Fetched source page");
        Ok(extract_visible_text(&body, self.max_chars))
    }
}

impl std::fmt::Debug for HttpContentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentFetcher")
            .field("max_chars", &self.max_chars)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// Fetcher serving registered pages from memory. Unregistered URLs fail
/// with a `Fetch` error, as an unreachable host would.
#[derive(Debug, Default)]
pub struct MockContentFetcher {
    pages: Mutex<HashMap<String, FoundryResult<String>>>,
    fetches: AtomicUsize,
}

impl MockContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` for `url`.
    pub fn with_page(self, url: &str, text: impl Into<String>) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), Ok(text.into()));
        }
        self
    }

    /// Fail `url` with `error`.
    pub fn with_error(self, url: &str, error: FoundryError) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), Err(error));
        }
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockContentFetcher {
    async fn fetch(&self, url: &Url) -> FoundryResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let pages = self
            .pages
            .lock()
            .map_err(|_| FoundryError::transient("mock fetch", "page lock poisoned"))?;
        pages.get(url.as_str()).cloned().unwrap_or_else(|| {
            Err(FoundryError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
