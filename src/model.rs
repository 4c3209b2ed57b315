//! Output records

use chrono::NaiveDate;
use serde::Serialize;

use crate::parse::{parse_date, parse_runtime, parse_score};

/// Metadata for a single catalogued movie, built by one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieInfo {
    pub provider: String,
    pub id: String,
    pub number: String,
    pub title: String,
    pub summary: String,
    pub homepage: String,
    pub cover_url: Option<String>,
    pub thumb_url: Option<String>,
    pub preview_video_url: Option<String>,
    pub preview_images: Vec<String>,
    pub actors: Vec<String>,
    pub maker: Option<String>,
    pub publisher: Option<String>,
    pub series: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<u32>,
    /// Normalized into `0.0..=5.0`
    pub score: Option<f64>,
    pub tags: Vec<String>,
}

/// One hit from a keyword search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub number: String,
    pub title: String,
    pub provider: String,
    pub homepage: String,
    pub thumb_url: String,
    pub cover_url: String,
}

/// A field of [`MovieInfo`] that rules can target.
///
/// `PreviewImages`, `Actors` and `Tags` are lists and accumulate values in
/// order; `Actors` skips names already present. All other fields hold one
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Number,
    Title,
    Summary,
    CoverUrl,
    ThumbUrl,
    PreviewVideoUrl,
    PreviewImages,
    Actors,
    Maker,
    Publisher,
    Series,
    ReleaseDate,
    Runtime,
    Score,
    Tags,
}

impl Field {
    pub fn is_list(self) -> bool {
        matches!(self, Field::PreviewImages | Field::Actors | Field::Tags)
    }
}

/// What a rule does when its target scalar field already holds a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// First successful match wins
    #[default]
    KeepExisting,
    Replace,
}

impl MovieInfo {
    /// Start a record whose identity is already known.
    pub fn new(provider: &str, id: impl Into<String>, homepage: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            id: id.into(),
            homepage: homepage.into(),
            ..Default::default()
        }
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Number => !self.number.is_empty(),
            Field::Title => !self.title.is_empty(),
            Field::Summary => !self.summary.is_empty(),
            Field::CoverUrl => self.cover_url.is_some(),
            Field::ThumbUrl => self.thumb_url.is_some(),
            Field::PreviewVideoUrl => self.preview_video_url.is_some(),
            Field::PreviewImages => !self.preview_images.is_empty(),
            Field::Actors => !self.actors.is_empty(),
            Field::Maker => self.maker.is_some(),
            Field::Publisher => self.publisher.is_some(),
            Field::Series => self.series.is_some(),
            Field::ReleaseDate => self.release_date.is_some(),
            Field::Runtime => self.runtime_minutes.is_some(),
            Field::Score => self.score.is_some(),
            Field::Tags => !self.tags.is_empty(),
        }
    }

    /// Empty a list field. Scalar fields are left alone.
    pub fn clear_list(&mut self, field: Field) {
        match field {
            Field::PreviewImages => self.preview_images.clear(),
            Field::Actors => self.actors.clear(),
            Field::Tags => self.tags.clear(),
            _ => {}
        }
    }

    /// Write a raw scraped value into `field`.
    ///
    /// The value is trimmed and parsed for the field's type. Empty or
    /// unparseable values leave the record untouched. List fields append
    /// (actors only when the name is new); scalar fields honour `policy`.
    /// Returns whether the record changed.
    pub fn apply(&mut self, field: Field, raw: &str, policy: Policy) -> bool {
        let value = raw.trim();
        if value.is_empty() {
            return false;
        }

        let keep = policy == Policy::KeepExisting && self.is_set(field);
        match field {
            Field::PreviewImages => push(&mut self.preview_images, value),
            Field::Actors => push_unique(&mut self.actors, value),
            Field::Tags => push(&mut self.tags, value),
            _ if keep => false,
            Field::Number => set_text(&mut self.number, value),
            Field::Title => set_text(&mut self.title, value),
            Field::Summary => set_text(&mut self.summary, value),
            Field::CoverUrl => set_opt(&mut self.cover_url, value),
            Field::ThumbUrl => set_opt(&mut self.thumb_url, value),
            Field::PreviewVideoUrl => set_opt(&mut self.preview_video_url, value),
            Field::Maker => set_opt(&mut self.maker, value),
            Field::Publisher => set_opt(&mut self.publisher, value),
            Field::Series => set_opt(&mut self.series, value),
            Field::ReleaseDate => parse_date(value)
                .map(|date| self.release_date = Some(date))
                .is_some(),
            Field::Runtime => parse_runtime(value)
                .map(|minutes| self.runtime_minutes = Some(minutes))
                .is_some(),
            Field::Score => parse_score(value)
                .map(|score| self.score = Some(score))
                .is_some(),
        }
    }
}

fn set_text(slot: &mut String, value: &str) -> bool {
    *slot = value.to_string();
    true
}

fn set_opt(slot: &mut Option<String>, value: &str) -> bool {
    *slot = Some(value.to_string());
    true
}

fn push(list: &mut Vec<String>, value: &str) -> bool {
    list.push(value.to_string());
    true
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}
