//! Nested manifest resolution
//!
//! Turns a streaming-manifest reference embedded in a page into a direct
//! preview-media URL: locate the manifest URL in script text, fetch it on
//! an isolated session, decode it, pick the best variant, and project the
//! variant's path into a media URL template.
//!
//! Every failure along the way is an [`Abandoned`] outcome rather than an
//! error. Preview media is optional; losing it never fails an extraction.

use std::fmt;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::fetch::{Fetch, Page};
use crate::playlist::{self, Playlist, PlaylistError, Variant};

/// Finds a manifest URL assembled by inline script from two tokens and a
/// three-part template: `prefix + first + middle + second + suffix`.
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    first_token: Regex,
    second_token: Regex,
    template: Regex,
}

impl ManifestLocator {
    /// `first_token` and `second_token` capture their token in group 1;
    /// `template` captures prefix, middle and suffix in groups 1 to 3.
    pub fn new(first_token: Regex, second_token: Regex, template: Regex) -> Self {
        Self {
            first_token,
            second_token,
            template,
        }
    }

    /// The manifest URL, resolved against `page`, or `None` if any piece is missing.
    pub fn locate(&self, script: &str, page: &Page) -> Option<Url> {
        let first = capture(&self.first_token, script)?;
        let second = capture(&self.second_token, script)?;
        let parts = self.template.captures(script)?;
        let (prefix, middle, suffix) = (parts.get(1)?, parts.get(2)?, parts.get(3)?);

        let reference = format!(
            "{}{}{}{}{}",
            prefix.as_str(),
            first,
            middle.as_str(),
            second,
            suffix.as_str()
        );
        page.url().join(&reference).ok()
    }
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)?.get(1).map(|m| m.as_str())
}

/// Pick the highest-bandwidth variant.
///
/// Variants are stably sorted by ascending bandwidth and the last one is
/// taken, so among equal bandwidths the one listed last wins.
pub fn select_variant(mut variants: Vec<Variant>) -> Option<Variant> {
    variants.sort_by_key(|v| v.bandwidth);
    variants.pop()
}

/// Why a resolution produced no URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abandoned {
    Fetch(String),
    Decode(PlaylistError),
    NotMaster,
    NoVariants,
    UnmatchedUri(String),
}

impl fmt::Display for Abandoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abandoned::Fetch(reason) => write!(f, "manifest fetch failed: {}", reason),
            Abandoned::Decode(e) => write!(f, "manifest undecodable: {}", e),
            Abandoned::NotMaster => f.write_str("not a master playlist"),
            Abandoned::NoVariants => f.write_str("master playlist lists no variants"),
            Abandoned::UnmatchedUri(uri) => write!(f, "variant uri `{}` has unexpected shape", uri),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Abandoned(Abandoned),
}

impl Resolution {
    pub fn url(self) -> Option<String> {
        match self {
            Resolution::Resolved(url) => Some(url),
            Resolution::Abandoned(_) => None,
        }
    }
}

/// Second half of the flow: fetch, decode, select, project.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    variant_path: Regex,
    media_template: String,
}

impl ManifestResolver {
    /// `media_template` references the capture groups of `variant_path`
    /// as `${1}`, `${2}`, ...
    pub fn new(variant_path: Regex, media_template: impl Into<String>) -> Self {
        Self {
            variant_path,
            media_template: media_template.into(),
        }
    }

    /// Resolve `manifest` on `session`, which must be isolated from the
    /// session that fetched the referring page.
    pub fn resolve(&self, session: &dyn Fetch, manifest: &Url, referer: &str) -> Resolution {
        let page = match session.fetch(manifest, &[("Referer", referer)]) {
            Ok(page) => page,
            Err(e) => return Resolution::Abandoned(Abandoned::Fetch(e.to_string())),
        };

        let variants = match playlist::decode(page.body()) {
            Ok(Playlist::Master(variants)) => variants,
            Ok(Playlist::Media { .. }) => return Resolution::Abandoned(Abandoned::NotMaster),
            Err(e) => return Resolution::Abandoned(Abandoned::Decode(e)),
        };
        debug!(url = %manifest, variants = variants.len(), "decoded master playlist");

        let Some(best) = select_variant(variants) else {
            return Resolution::Abandoned(Abandoned::NoVariants);
        };

        match self.project(&best.uri) {
            Some(url) => Resolution::Resolved(url),
            None => Resolution::Abandoned(Abandoned::UnmatchedUri(best.uri)),
        }
    }

    /// Substitute the tokens of a variant URI into the media template
    pub fn project(&self, uri: &str) -> Option<String> {
        let caps = self.variant_path.captures(uri)?;
        let mut url = String::new();
        caps.expand(&self.media_template, &mut url);
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    fn variant(bandwidth: u64, uri: &str) -> Variant {
        Variant {
            bandwidth,
            uri: uri.to_string(),
        }
    }

    fn resolver() -> ManifestResolver {
        ManifestResolver::new(
            Regex::new(r"/sample/(\d+)/(\d+)/ts\.(.+?)\.m3u8").unwrap(),
            "https://media.example.com/contents/${1}/${2}/${3}",
        )
    }

    const PAGE_URL: &str = "https://example.com/movies/1/";
    const MANIFEST_URL: &str = "https://example.com/hls/3/77/master.m3u8";

    #[test]
    fn test_select_highest_bandwidth() {
        let orders = [[500, 1200, 800], [1200, 800, 500], [800, 500, 1200]];
        for order in orders {
            let variants = order.iter().map(|b| variant(*b, &b.to_string())).collect();
            assert_eq!(select_variant(variants).unwrap().bandwidth, 1200);
        }
    }

    #[test]
    fn test_select_tie_takes_last_listed() {
        let variants = vec![variant(900, "a"), variant(400, "b"), variant(900, "c")];
        assert_eq!(select_variant(variants).unwrap().uri, "c");
    }

    #[test]
    fn test_select_empty() {
        assert_eq!(select_variant(vec![]), None);
    }

    #[test]
    fn test_locate() {
        let locator = ManifestLocator::new(
            Regex::new(r"siteID\s*=\s*'(\d+?)';").unwrap(),
            Regex::new(r"movieId\s*=\s*'(\d+?)';").unwrap(),
            Regex::new(r"stream\s*=\s*'(.+?)'\+siteID\+'(.+?)'\+movieId\+'(.+?)';").unwrap(),
        );
        let page = Page::new(Url::parse(PAGE_URL).unwrap(), "");
        let script = "var movieId = '77';\nvar siteID = '3';\n\
            var stream = '/hls/'+siteID+'/'+movieId+'/master.m3u8';";

        assert_eq!(locator.locate(script, &page).unwrap().as_str(), MANIFEST_URL);
        assert_eq!(locator.locate("var movieId = '77';", &page), None);
    }

    #[test]
    fn test_resolve_best_variant() {
        let fetcher = MemoryFetcher::new().with_page(
            MANIFEST_URL,
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=400\n/sample/77/3/ts.sd.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=900\n/sample/77/3/ts.hd.m3u8\n",
        );
        let url = Url::parse(MANIFEST_URL).unwrap();

        assert_eq!(
            resolver().resolve(&fetcher, &url, PAGE_URL),
            Resolution::Resolved("https://media.example.com/contents/77/3/hd".to_string())
        );
        assert_eq!(fetcher.requests()[0].headers[0].1, PAGE_URL);
    }

    #[test]
    fn test_resolve_abandons_silently() {
        let url = Url::parse(MANIFEST_URL).unwrap();
        let cases = [
            ("#EXTM3U\n#EXT-X-MEDIA:TYPE=AUDIO,URI=\"a.m3u8\"\n", Abandoned::NoVariants),
            ("#EXTM3U\n#EXTINF:4,\nseg.ts\n", Abandoned::NotMaster),
            (
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n/other/path.m3u8\n",
                Abandoned::UnmatchedUri("/other/path.m3u8".to_string()),
            ),
            ("not a playlist", Abandoned::Decode(PlaylistError::MissingHeader)),
        ];

        for (body, expected) in cases {
            let fetcher = MemoryFetcher::new().with_page(MANIFEST_URL, body);
            assert_eq!(
                resolver().resolve(&fetcher, &url, PAGE_URL),
                Resolution::Abandoned(expected)
            );
        }

        let resolution = resolver().resolve(&MemoryFetcher::new(), &url, PAGE_URL);
        assert!(matches!(resolution, Resolution::Abandoned(Abandoned::Fetch(_))));
        assert_eq!(resolution.url(), None);
    }
}
