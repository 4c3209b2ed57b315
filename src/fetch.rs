//! Document fetching
//!
//! Every extraction or search runs on its own isolated session obtained
//! through [`Fetch::isolated`]. A session shares static configuration with
//! the fetcher it came from, never cookies or other per-session state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scraper::Html;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};

/// A fetched response body together with the URL it was requested from.
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the body as an HTML document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Resolve a possibly relative reference against this page's URL.
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        self.url.join(href).ok().map(String::from)
    }
}

/// Blocking document transport.
pub trait Fetch: Send + Sync {
    /// GET `url` with the configured base headers plus `headers`.
    ///
    /// Transport errors and non-2xx statuses are [`ScrapeError::Fetch`].
    fn fetch(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Page>;

    /// A fresh session sharing this fetcher's configuration only.
    fn isolated(&self) -> Box<dyn Fetch>;
}

/// HTTP fetcher backed by a `ureq` agent.
pub struct HttpFetcher {
    config: Arc<ScraperConfig>,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        let config = Arc::new(config);
        let agent = build_agent(&config);
        Self { config, agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(ScraperConfig::default())
    }
}

fn build_agent(config: &ScraperConfig) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .user_agent(config.user_agent.as_str())
            .http_status_as_error(false)
            .build(),
    )
}

/// Non-2xx statuses become [`ScrapeError::Fetch`] carrying the status code.
fn ensure_success(url: &Url, status: ureq::http::StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ScrapeError::fetch(url, format!("HTTP {}", status.as_u16())))
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Page> {
        debug!(url = %url, "GET");

        let mut request = self.agent.get(url.as_str());
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let mut response = request.call().map_err(|e| ScrapeError::fetch(url, e))?;
        ensure_success(url, response.status())?;

        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ScrapeError::fetch(url, format!("failed to read body: {}", e)))?;

        Ok(Page::new(url.clone(), String::from_utf8_lossy(&body)))
    }

    fn isolated(&self) -> Box<dyn Fetch> {
        Box::new(Self {
            config: Arc::clone(&self.config),
            agent: build_agent(&self.config),
        })
    }
}

/// A request observed by a [`MemoryFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub url: String,
    /// Session that issued the request
    pub session: usize,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum Route {
    Body(String),
    Status(u16),
}

/// Offline fetcher serving canned responses.
///
/// Unknown URLs answer with HTTP 404. Each call to [`Fetch::isolated`]
/// yields a new session number, and all sessions share one request log so
/// callers can check which session made which request.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    routes: Arc<HashMap<String, Route>>,
    log: Arc<Mutex<Vec<FetchRecord>>>,
    sessions: Arc<AtomicUsize>,
    session: usize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.with_route(url, Route::Body(body.into()))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_route(url, Route::Status(status))
    }

    fn with_route(mut self, url: &str, route: Route) -> Self {
        let key = Url::parse(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        Arc::make_mut(&mut self.routes).insert(key, route);
        self
    }

    /// Session number of this handle; the root fetcher is session 0.
    pub fn session(&self) -> usize {
        self.session
    }

    /// Every request made through this fetcher or any session derived from it
    pub fn requests(&self) -> Vec<FetchRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, url: &Url, headers: &[(&str, &str)]) -> Result<Page> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FetchRecord {
                url: url.to_string(),
                session: self.session,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });

        match self.routes.get(url.as_str()) {
            Some(Route::Body(body)) => Ok(Page::new(url.clone(), body.as_str())),
            Some(Route::Status(status)) => Err(ScrapeError::fetch(url, format!("HTTP {}", status))),
            None => Err(ScrapeError::fetch(url, "HTTP 404")),
        }
    }

    fn isolated(&self) -> Box<dyn Fetch> {
        let session = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Box::new(Self {
            routes: Arc::clone(&self.routes),
            log: Arc::clone(&self.log),
            sessions: Arc::clone(&self.sessions),
            session,
        })
    }
}
