//! Extraction engine
//!
//! Fetches a primary page on an isolated session, runs a provider's rules
//! over it and folds their outputs into a [`MovieInfo`]. A rule may hand
//! back a manifest reference instead of a value; the engine then resolves
//! it on a second isolated session before moving on to the next output.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::fetch::Fetch;
use crate::manifest::{ManifestResolver, Resolution};
use crate::model::{Field, MovieInfo, Policy};
use crate::rules::RuleSet;

/// Output of a metadata rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Raw value for a record field
    Field(Field, String),
    /// Streaming manifest whose best variant becomes the preview video
    PreviewManifest(Url),
}

impl Extracted {
    pub fn field(field: Field, value: impl Into<String>) -> Self {
        Extracted::Field(field, value.into())
    }
}

/// Parse an extraction target, failing with [`ScrapeError::InvalidIdentifier`].
pub fn parse_target(target: &str) -> Result<Url> {
    Url::parse(target.trim()).map_err(|e| ScrapeError::InvalidIdentifier(format!("{}: {}", target, e)))
}

/// Rule-driven extraction for a single provider.
pub struct Engine {
    provider: String,
    fetcher: Arc<dyn Fetch>,
    rules: RuleSet<Extracted>,
    resolver: Option<ManifestResolver>,
}

impl Engine {
    pub fn new(provider: &str, fetcher: Arc<dyn Fetch>, rules: RuleSet<Extracted>) -> Self {
        Self {
            provider: provider.to_string(),
            fetcher,
            rules,
            resolver: None,
        }
    }

    /// Resolve [`Extracted::PreviewManifest`] outputs with `resolver`.
    /// Without one they are ignored.
    pub fn with_resolver(mut self, resolver: ManifestResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Fill `info` from the page at `homepage`.
    ///
    /// `info` must already carry the identifier derived from `homepage`;
    /// the engine never fetches for a record without one. A failed primary
    /// fetch aborts the run and discards the record.
    pub fn extract(&self, homepage: &Url, mut info: MovieInfo) -> Result<MovieInfo> {
        if info.id.is_empty() {
            return Err(ScrapeError::InvalidIdentifier(homepage.to_string()));
        }

        let session = self.fetcher.isolated();
        let page = session.fetch(homepage, &[])?;
        let document = page.document();

        let mut applied = 0;
        let mut cleared = HashSet::new();
        self.rules.evaluate(&page, &document, |index, rule, output| match output {
            Extracted::Field(field, value) => {
                // A replacing rule resets a list once, then accumulates into it.
                if rule.policy() == Policy::Replace
                    && field.is_list()
                    && !value.trim().is_empty()
                    && cleared.insert((index, field))
                {
                    info.clear_list(field);
                }
                if info.apply(field, &value, rule.policy()) {
                    applied += 1;
                }
            }
            Extracted::PreviewManifest(manifest) => {
                let keep = rule.policy() == Policy::KeepExisting
                    && info.is_set(Field::PreviewVideoUrl);
                let Some(resolver) = self.resolver.as_ref().filter(|_| !keep) else {
                    return;
                };

                let nested = session.isolated();
                match resolver.resolve(nested.as_ref(), &manifest, page.url().as_str()) {
                    Resolution::Resolved(url) => {
                        if info.apply(Field::PreviewVideoUrl, &url, rule.policy()) {
                            applied += 1;
                        }
                    }
                    Resolution::Abandoned(reason) => {
                        debug!(provider = %self.provider, manifest = %manifest, %reason, "preview manifest abandoned");
                    }
                }
            }
        });

        debug!(
            provider = %self.provider,
            url = %homepage,
            rules = self.rules.len(),
            applied,
            "extracted"
        );
        Ok(info)
    }

    /// Fetch `url` on a fresh session and collect every output of `rules`.
    pub fn collect<T>(&self, url: &Url, rules: &RuleSet<T>) -> Result<Vec<T>> {
        let session = self.fetcher.isolated();
        let page = session.fetch(url, &[])?;
        let outputs = rules.collect(&page);
        debug!(provider = %self.provider, url = %url, results = outputs.len(), "collected");
        Ok(outputs)
    }
}
