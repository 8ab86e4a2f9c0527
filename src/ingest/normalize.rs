// src/ingest/normalize.rs
//! Per-row normalization: turns a [`RawRow`] into a [`Record`], substituting
//! defaults for anything malformed and reporting every repair.
//!
//! Nothing in here fails. A bad field becomes a default plus a diagnostic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::types::{Diagnostic, DiagnosticKind, RawRow, Record};

pub const DEFAULT_USER: &str = "unknown";
pub const DEFAULT_NAME: &str = "Unknown User";
pub const ID_LEN: usize = 12;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static RE_HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)#(\w+)").expect("hashtag regex"));

/// Naive layouts tried after RFC 3339; interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts that RFC 3339 rejects (space separator, `+0000`,
/// Twitter `created_at`).
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%a %b %d %H:%M:%S %z %Y",
];

/// Date-only layouts; midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"];

/// How a hashtag cell was understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashtagDecode {
    /// Cell held a JSON-style array (single or double quoted).
    Decoded(Vec<String>),
    /// Array decoding failed; tags were scraped from `#word` tokens.
    FellBackToPatternMatch(Vec<String>),
    /// Nothing usable.
    Empty,
}

impl HashtagDecode {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            Self::Decoded(v) | Self::FellBackToPatternMatch(v) => v,
            Self::Empty => Vec::new(),
        }
    }
}

/// Decode a hashtag cell. Tags come back without the leading `#`.
pub fn decode_hashtags(raw: Option<&str>) -> HashtagDecode {
    let Some(raw) = raw else {
        return HashtagDecode::Empty;
    };

    // Typographic quotes show up in spreadsheet exports.
    let ascii = raw
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    if let Some(tags) = decode_array(&ascii).or_else(|| decode_array(&ascii.replace('\'', "\"")))
    {
        return HashtagDecode::Decoded(tags);
    }

    let scraped: Vec<String> = RE_HASHTAG
        .captures_iter(&ascii)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    if scraped.is_empty() {
        HashtagDecode::Empty
    } else {
        HashtagDecode::FellBackToPatternMatch(scraped)
    }
}

fn decode_array(s: &str) -> Option<Vec<String>> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s.trim()) else {
        return None;
    };
    let tags = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(t) => Some(t),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Some(tags)
}

/// Parse a posted-at cell. Stray quote characters are ignored.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    parse_rfc2822(s)
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

/// Lenient count parsing: leading integer prefix, negatives clamp to zero.
/// Returns the value and, when the cell needed repair, what was done.
pub fn coerce_count(field: &'static str, raw: Option<&str>) -> (u64, Option<DiagnosticKind>) {
    let Some(raw) = raw else {
        return (0, None);
    };
    let t = raw.trim();
    let (negative, unsigned) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let digits_len = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    let coerced = |value| DiagnosticKind::NumberCoerced {
        field,
        raw: raw.to_string(),
        value,
    };

    if digits_len == 0 {
        return (0, Some(coerced(0)));
    }
    let digits = &unsigned[..digits_len];
    let exact = digits_len == unsigned.len();

    if negative && digits.bytes().any(|b| b != b'0') {
        return (
            0,
            Some(DiagnosticKind::NegativeClamped {
                field,
                raw: raw.to_string(),
            }),
        );
    }

    match digits.parse::<u64>() {
        Ok(v) if exact => (v, None),
        Ok(v) => (v, Some(coerced(v))),
        Err(_) => (u64::MAX, Some(coerced(u64::MAX))),
    }
}

/// Opaque random id for rows that don't carry one.
pub fn random_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Normalize one admitted row. `row` is the 1-based data row number.
pub fn normalize_row(row: usize, raw: &RawRow, now: DateTime<Utc>) -> (Record, Vec<Diagnostic>) {
    let mut kinds: Vec<DiagnosticKind> = Vec::new();

    let id = raw.get("id").map(str::to_string).unwrap_or_else(random_id);

    let raw_tags = raw.get("hashtags");
    let hashtags = match decode_hashtags(raw_tags) {
        HashtagDecode::Decoded(v) => v,
        HashtagDecode::FellBackToPatternMatch(v) => {
            kinds.push(DiagnosticKind::HashtagFallback {
                raw: raw_tags.unwrap_or_default().to_string(),
            });
            v
        }
        HashtagDecode::Empty => {
            if let Some(r) = raw_tags {
                kinds.push(DiagnosticKind::HashtagUnrecognized { raw: r.to_string() });
            }
            Vec::new()
        }
    };

    let raw_date = raw.get("date_posted");
    let date = match raw_date.and_then(parse_date) {
        Some(d) => d,
        None => {
            kinds.push(DiagnosticKind::DateDefaulted {
                raw: raw_date.map(str::to_string),
            });
            now
        }
    };

    let mut count = |field: &'static str| {
        let (v, repair) = coerce_count(field, raw.get(field));
        kinds.extend(repair);
        v
    };
    let likes = count("likes");
    let reposts = count("reposts");
    let replies = count("replies");
    let views = count("views");
    let followers = count("followers");

    let record = Record {
        user: raw.get("user_posted").unwrap_or(DEFAULT_USER).to_string(),
        name: raw.get("name").unwrap_or(DEFAULT_NAME).to_string(),
        text: raw.get("description").unwrap_or_default().to_string(),
        profile_image: raw.get("profile_image_link").map(str::to_string),
        id,
        date,
        likes,
        reposts,
        replies,
        views,
        hashtags,
        followers,
    };

    let diagnostics = kinds
        .into_iter()
        .map(|kind| {
            tracing::warn!(target: "ingest", row, id = %record.id, ?kind, "field repaired");
            let mut d = Diagnostic::for_row(row, kind);
            d.record_id = Some(record.id.clone());
            d
        })
        .collect();

    (record, diagnostics)
}
