//! Crate error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The URL or identifier could not be parsed, or no id could be derived from it.
    /// Always raised before any request is made.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Transport failure or non-success status on a primary document.
    #[error("fetch {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The provider structurally cannot perform the requested operation.
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("translation failed: {0}")]
    Translate(String),
}

impl ScrapeError {
    pub(crate) fn fetch(url: impl ToString, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(provider: &str, capability: &'static str) -> Self {
        Self::Unsupported {
            provider: provider.to_string(),
            capability,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
