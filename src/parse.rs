//! Lenient parsers turning scraped text into typed field values
//!
//! Every parser returns `None` for input it does not understand. A field
//! that fails to parse stays unset, so a later rule may still fill it.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日", "%m/%d/%Y"];

static RE_ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

static RE_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{1,2})(?::(\d{1,2}))?$").unwrap());

static RE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Characters that only ever separate names inside a list cell.
const SEPARATORS: &[char] = &[',', '，', '/', '／', '、', '・', '|', '｜'];

/// Parse a calendar date.
///
/// Accepts the common site formats, a trailing annotation after whitespace
/// (`2022/05/06 (Fri)`) and ISO timestamps (date part only).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut candidates = vec![s];
    if let Some(first) = s.split_whitespace().next() {
        candidates.push(first);
    }
    if let Some((date, _)) = s.split_once('T') {
        candidates.push(date);
    }

    candidates.into_iter().find_map(|candidate| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    })
}

/// Parse a running time into whole minutes, rounding to the nearest minute.
///
/// Understands ISO-8601 durations (`PT1H59M20S`), clock strings
/// (`01:59:20`, `59:20`) and free text whose first number is the minute
/// count (`Apx. 120 Min.`, `約120分`). Zero is treated as absent.
pub fn parse_runtime(s: &str) -> Option<u32> {
    let s = s.trim();

    let seconds = if let Some(caps) = RE_ISO_DURATION.captures(s) {
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        part(1) * 86_400.0 + part(2) * 3_600.0 + part(3) * 60.0 + part(4)
    } else if let Some(caps) = RE_CLOCK.captures(s) {
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        if caps.get(3).is_some() {
            part(1) * 3_600.0 + part(2) * 60.0 + part(3)
        } else {
            part(1) * 60.0 + part(2)
        }
    } else {
        let minutes: f64 = RE_NUMBER.find(s)?.as_str().parse().ok()?;
        minutes * 60.0
    };

    let minutes = (seconds / 60.0).round();
    if minutes >= 1.0 && minutes <= u32::MAX as f64 {
        Some(minutes as u32)
    } else {
        None
    }
}

/// Parse a rating, normalized into `0.0..=5.0`.
pub fn parse_score(s: &str) -> Option<f64> {
    let score: f64 = RE_NUMBER.find(s)?.as_str().parse().ok()?;
    Some(score.clamp(0.0, 5.0))
}

/// Trim text fragments and drop the empty and separator-only ones.
pub fn clean_texts<'a, I>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.chars().all(|c| SEPARATORS.contains(&c)))
        .map(String::from)
        .collect()
}
