//! Transport configuration shared by every fetch session

use serde::Deserialize;

/// Desktop browser user agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Static fetch configuration.
///
/// Isolated sessions derived from a fetcher share this configuration and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Global timeout for a single request, connect to last body byte
    pub timeout_secs: u64,
    /// Base headers sent with every request, in order
    pub headers: Vec<(String, String)>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: Vec::new(),
        }
    }
}

impl ScraperConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ScraperConfig::from_json(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_headers() {
        let config = ScraperConfig::from_json(
            r#"{"user_agent": "bot/1.0", "headers": [["Accept-Language", "ja"]]}"#,
        )
        .unwrap();
        assert_eq!(config.user_agent, "bot/1.0");
        assert_eq!(
            config.headers,
            vec![("Accept-Language".to_string(), "ja".to_string())]
        );
    }
}
