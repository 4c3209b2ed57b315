//! Movie metadata scraping
//!
//! Extracts structured metadata from public catalogue pages:
//! - Ordered, first-match-wins CSS selector rules filling a [`MovieInfo`]
//! - Label-dispatched info tables
//! - Nested HLS manifest resolution for preview videos
//! - Keyword search for providers with a listing page
//! - A provider registry built at startup

pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod model;
pub mod parse;
pub mod playlist;
pub mod providers;
pub mod registry;
pub mod rules;
pub mod translate;

pub use config::ScraperConfig;
pub use engine::{Engine, Extracted};
pub use error::{Result, ScrapeError};
pub use fetch::{Fetch, HttpFetcher, MemoryFetcher, Page};
pub use manifest::{ManifestLocator, ManifestResolver, Resolution};
pub use model::{Field, MovieInfo, Policy, SearchResult};
pub use providers::{Ave, Heyzo, MovieProvider};
pub use registry::{ProviderFactory, Registry};
pub use rules::{Matched, Rule, RuleSet};
pub use translate::{Translator, TranslatorConfig};
