//! Query parsing module
//!
//! Turns raw query-string values into typed record filters:
//! - Lot lists: `lotId=L1, L2` (trimmed, empty entries dropped)
//! - Shift ranges: `startDate=2024-01-01&endDate=2024-01-31` (inclusive day bounds)
//! - Article lists: `articles=AB 12,cd34` (normalized)
//!
//! Anything that does not parse is treated as "no filter" rather than an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date format accepted for `startDate` / `endDate`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `ShiftStartTime` bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ShiftRange {
    /// Expand two calendar dates to `[start 00:00:00, end 23:59:59]`
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(end_of_day()),
        }
    }

    /// Parse two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT).ok()?;
        Some(Self::from_dates(start, end))
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts >= self.start && *ts <= self.end
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Filter applied to the records table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// `LotID IN (...)`
    Lots(Vec<String>),
    /// `ShiftStartTime BETWEEN start AND end`
    ShiftRange(ShiftRange),
    /// No usable filter; callers answer with an empty list
    None,
}

impl RecordFilter {
    /// Build a filter from raw parameters. A lot list wins over a date range.
    pub fn from_params(lot_id: Option<&str>, start: Option<&str>, end: Option<&str>) -> Self {
        if let Some(raw) = lot_id {
            let lots = split_list(raw);
            if !lots.is_empty() {
                return RecordFilter::Lots(lots);
            }
        }

        match (start, end) {
            (Some(s), Some(e)) => ShiftRange::parse(s, e)
                .map(RecordFilter::ShiftRange)
                .unwrap_or(RecordFilter::None),
            _ => RecordFilter::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, RecordFilter::None)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Characters stripped from article numbers. SQL backends remove the same set.
pub const ARTICLE_WHITESPACE: [char; 7] = [
    ' ', '\t', '\n', '\r', '\u{0b}', '\u{0c}', '\u{a0}',
];

/// Canonical article-number key: lowercase with whitespace removed
pub fn normalize_article(raw: &str) -> String {
    raw.chars()
        .filter(|c| !ARTICLE_WHITESPACE.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized article numbers requested by `/api/data-by-article`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    keys: Vec<String>,
}

impl ArticleQuery {
    /// Parse a comma-separated list. Duplicate keys collapse to one.
    pub fn parse(raw: &str) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for key in raw.split(',').map(normalize_article) {
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether a stored article number matches one of the requested keys
    pub fn matches(&self, article: &str) -> bool {
        let key = normalize_article(article);
        self.keys.iter().any(|k| *k == key)
    }
}
