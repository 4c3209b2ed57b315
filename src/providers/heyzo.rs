//! HEYZO (heyzo.com)
//!
//! JSON-LD is the primary source; page markup fills whatever it leaves
//! empty. The info table is authoritative for release date and score.
//! The preview video comes from the HLS sample manifest when one resolves,
//! otherwise from the inline `emvideo` clip.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::engine::{parse_target, Engine, Extracted};
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetch;
use crate::manifest::{ManifestLocator, ManifestResolver};
use crate::model::{Field, MovieInfo, Policy};
use crate::providers::MovieProvider;
use crate::rules::{Matched, Rule, RuleSet};

const MOVIE_PAGE: &str = "https://www.heyzo.com/moviepages/";
const SAMPLE_URL: &str = "https://www.heyzo.com/contents/${1}/${2}/${3}";

static MOVIE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/moviepages/(\d+)(?:/|$)").unwrap());
static EMVIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"emvideo\s*=\s*"(.+?)";"#).unwrap());
static DURATION_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bo\s*=\s*(\{.+?\});").unwrap());
static SAMPLE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(/contents/[^"]+/\d+\.\w+)""#).unwrap());

// player script: stream = '<prefix>'+siteID+'<middle>'+movieId+'<suffix>';
static SITE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"siteID\s*=\s*'(\d+?)';").unwrap());
static PLAYER_MOVIE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"movieId\s*=\s*'(\d+?)';").unwrap());
static STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"stream\s*=\s*'(.+?)'\+siteID\+'(.+?)'\+movieId\+'(.+?)';").unwrap()
});
static SAMPLE_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/sample/(\d+)/(\d+)/ts\.(.+?)\.m3u8").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LinkedData {
    name: String,
    image: String,
    description: String,
    released_event: ReleasedEvent,
    video: Video,
    aggregate_rating: AggregateRating,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReleasedEvent {
    start_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Video {
    duration: String,
    actor: String,
    provider: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AggregateRating {
    rating_value: Value,
}

/// Inline player object carrying the full running time
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Durations {
    full: String,
}

impl LinkedData {
    fn extract(self, m: &Matched<'_>) -> Vec<Extracted> {
        let mut out = vec![
            Extracted::field(Field::Title, self.name),
            Extracted::field(Field::Summary, self.description),
            Extracted::field(Field::Publisher, self.video.provider),
            Extracted::field(Field::ReleaseDate, self.released_event.start_date),
            Extracted::field(Field::Runtime, self.video.duration),
            Extracted::field(Field::Actors, self.video.actor),
        ];
        if let Some(image) = m.absolute_url(&self.image) {
            out.push(Extracted::field(Field::CoverUrl, image.clone()));
            out.push(Extracted::field(Field::ThumbUrl, image));
        }
        match self.aggregate_rating.rating_value {
            Value::String(score) => out.push(Extracted::field(Field::Score, score)),
            Value::Number(score) => out.push(Extracted::field(Field::Score, score.to_string())),
            _ => {}
        }
        out
    }
}

/// Labels of the `movieInfo` table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    ReleaseDate,
    Actors,
    Series,
    Score,
}

impl Label {
    /// `None` for rows we do not map; those rows are skipped.
    fn from_text(text: &str) -> Option<Self> {
        match text {
            "公開日" => Some(Label::ReleaseDate),
            "出演" => Some(Label::Actors),
            "シリーズ" => Some(Label::Series),
            "評価" => Some(Label::Score),
            _ => None,
        }
    }

    fn extract(self, value: &Matched<'_>) -> Vec<Extracted> {
        match self {
            Label::ReleaseDate => vec![Extracted::field(Field::ReleaseDate, value.text())],
            Label::Actors => value
                .child_texts("a span")
                .into_iter()
                .map(|name| Extracted::field(Field::Actors, name))
                .collect(),
            Label::Series => {
                let series = value.text();
                vec![Extracted::field(Field::Series, series.trim_matches('-'))]
            }
            Label::Score => value
                .child_text(r#"span[itemprop="ratingValue"]"#)
                .map(|score| Extracted::field(Field::Score, score))
                .into_iter()
                .collect(),
        }
    }
}

pub struct Heyzo {
    engine: Engine,
}

impl Heyzo {
    pub const NAME: &'static str = "HEYZO";
    pub const PRIORITY: i32 = 1000;

    pub fn new(fetcher: Arc<dyn Fetch>) -> Result<Self> {
        let resolver = ManifestResolver::new(SAMPLE_VARIANT.clone(), SAMPLE_URL);
        Ok(Self {
            engine: Engine::new(Self::NAME, fetcher, movie_rules()?).with_resolver(resolver),
        })
    }

    /// Canonical page of a (normalized) movie id
    pub fn movie_url(id: &str) -> Result<Url> {
        let url = format!("{}{:0>4}/index.html", MOVIE_PAGE, id);
        Url::parse(&url).map_err(|e| ScrapeError::InvalidIdentifier(format!("{}: {}", id, e)))
    }
}

fn parse_id(url: &Url) -> Option<String> {
    MOVIE_ID.captures(url.path()).map(|caps| caps[1].to_string())
}

fn movie_rules() -> Result<RuleSet<Extracted>> {
    let locator = ManifestLocator::new(SITE_ID.clone(), PLAYER_MOVIE_ID.clone(), STREAM.clone());

    Ok(RuleSet::new(vec![
        Rule::new(r#"script[type="application/ld+json"]"#, |m| {
            match serde_json::from_str::<LinkedData>(&m.text()) {
                Ok(data) => data.extract(m),
                Err(_) => vec![],
            }
        })?,
        // fallbacks
        Rule::new("#movie h1", |m| {
            let text = m.text();
            let title = text.split_whitespace().next().map(String::from);
            title
                .map(|title| Extracted::field(Field::Title, title))
                .into_iter()
                .collect()
        })?,
        Rule::new("p.memo", |m| vec![Extracted::field(Field::Summary, m.text())])?,
        Rule::new(r#"meta[property="og:image"]"#, |m| {
            let Some(image) = m.attr("content").and_then(|src| m.absolute_url(src)) else {
                return vec![];
            };
            vec![
                Extracted::field(Field::CoverUrl, image.clone()),
                Extracted::field(Field::ThumbUrl, image),
            ]
        })?,
        Rule::new("table.movieInfo tr", |m| {
            let cells = m.child_elements("td");
            let (Some(label), Some(value)) = (cells.first(), cells.get(1)) else {
                return vec![];
            };
            match Label::from_text(&label.text()) {
                Some(label) => label.extract(value),
                None => vec![],
            }
        })?
        .with_policy(Policy::Replace),
        Rule::new("ul.tag-keyword-list", |m| {
            m.child_texts("li a")
                .into_iter()
                .map(|tag| Extracted::field(Field::Tags, tag))
                .collect()
        })?,
        Rule::new(r#"script[type="text/javascript"]"#, |m| {
            let script = m.text();
            let video = EMVIDEO
                .captures(&script)
                .and_then(|caps| m.absolute_url(&caps[1]));
            video
                .map(|video| Extracted::field(Field::PreviewVideoUrl, video))
                .into_iter()
                .collect()
        })?,
        // The player's own duration beats the linked-data one.
        Rule::new(r#"script[type="text/javascript"]"#, |m| {
            let script = m.text();
            let durations = DURATION_OBJECT
                .captures(&script)
                .and_then(|caps| serde_json::from_str::<Durations>(&caps[1]).ok());
            durations
                .map(|durations| Extracted::field(Field::Runtime, durations.full))
                .into_iter()
                .collect()
        })?
        .with_policy(Policy::Replace),
        Rule::new("#playerContainer > script", move |m| {
            locator
                .locate(&m.text(), m.page())
                .map(Extracted::PreviewManifest)
                .into_iter()
                .collect()
        })?
        .with_policy(Policy::Replace),
        Rule::new("div.sample-images.yoxview > script", |m| {
            let script = m.text();
            let images: Vec<Extracted> = SAMPLE_IMAGE
                .captures_iter(&script)
                .filter_map(|caps| m.absolute_url(&caps[1]))
                .map(|url| Extracted::field(Field::PreviewImages, url))
                .collect();
            images
        })?,
    ]))
}

impl MovieProvider for Heyzo {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    /// `HEYZO-77`, `heyzo-0077` and `77` all become `0077`.
    fn normalize_id(&self, id: &str) -> String {
        let id = id.trim();
        let id = match id.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("HEYZO-") => &id[6..],
            _ => id,
        };
        format!("{:0>4}", id.to_uppercase())
    }

    fn get_by_id(&self, id: &str) -> Result<MovieInfo> {
        let url = Self::movie_url(&self.normalize_id(id))?;
        self.get_by_url(url.as_str())
    }

    fn get_by_url(&self, url: &str) -> Result<MovieInfo> {
        let homepage = parse_target(url)?;
        let id = parse_id(&homepage).ok_or_else(|| ScrapeError::InvalidIdentifier(url.to_string()))?;

        let mut info = MovieInfo::new(Self::NAME, id, homepage.as_str());
        info.number = format!("HEYZO-{}", info.id);
        info.maker = Some("HEYZO".to_string());
        self.engine.extract(&homepage, info)
    }
}
