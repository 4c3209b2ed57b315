//! Site providers
//!
//! Each module maps one site's page structure onto [`MovieInfo`].

mod aventertainments;
mod heyzo;

pub use aventertainments::*;
pub use heyzo::*;

use crate::error::{Result, ScrapeError};
use crate::model::{MovieInfo, SearchResult};

/// A source of movie metadata.
///
/// Implementations hold only immutable configuration, so one instance can
/// serve concurrent calls.
pub trait MovieProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Higher wins when several providers can answer.
    fn priority(&self) -> i32;

    /// Canonical form of a caller-supplied identifier. Idempotent.
    fn normalize_id(&self, id: &str) -> String;

    /// Build the canonical page URL for `id` and extract from it.
    fn get_by_id(&self, id: &str) -> Result<MovieInfo>;

    /// Extract from a page URL. The identifier is derived from `url` before
    /// any request is made.
    fn get_by_url(&self, url: &str) -> Result<MovieInfo>;

    fn supports_search(&self) -> bool {
        false
    }

    /// Canonical form of a search keyword. Idempotent.
    fn tidy_keyword(&self, keyword: &str) -> String {
        keyword.trim().to_string()
    }

    /// Keyword search.
    ///
    /// Providers without a listing page answer [`ScrapeError::Unsupported`],
    /// never an empty result.
    fn search(&self, _keyword: &str) -> Result<Vec<SearchResult>> {
        Err(ScrapeError::unsupported(self.name(), "search"))
    }
}
