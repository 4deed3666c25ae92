//! Recency filter and output bound.

use std::borrow::Cow;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::feed::Candidate;

/// Items older than this are not eligible.
pub const RECENCY_WINDOW_HOURS: i64 = 48;

/// Maximum number of URLs in one news sitemap.
pub const MAX_URLS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub date: DateTime<Utc>,
}

/// RFC 2822 as feeds actually write it: a `UTC` zone is accepted and a
/// weekday that disagrees with the date is ignored.
fn parse_rfc2822_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = match raw.strip_suffix(" UTC") {
        Some(head) => Cow::Owned(format!("{} +0000", head)),
        None => Cow::Borrowed(raw),
    };
    let parse = |s: &str| DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.with_timezone(&Utc));

    parse(normalized.as_ref()).or_else(|| {
        let (weekday, rest) = normalized.split_once(", ")?;
        if weekday.len() == 3 && weekday.chars().all(|c| c.is_ascii_alphabetic()) {
            parse(rest)
        } else {
            None
        }
    })
}

/// Parse a feed date. Tries RFC 3339 first, then ISO-8601 with a colon-less
/// offset, then RFC 2822, then offset-less ISO forms which are read as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822_lenient(raw) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Keep candidates with a title, a url and a date inside the recency window
/// ending at `now`, in source order, at most [`MAX_URLS`] of them.
pub fn select_recent(candidates: Vec<Candidate>, now: DateTime<Utc>) -> Vec<FeedItem> {
    let cutoff = now - Duration::hours(RECENCY_WINDOW_HOURS);
    let total = candidates.len();

    let items: Vec<FeedItem> = candidates
        .into_iter()
        .filter_map(|c| {
            let title = c.title.as_deref().unwrap_or_default().trim().to_string();
            let url = c.url.as_deref().unwrap_or_default().trim().to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            let date = parse_date(c.date.as_deref()?)?;
            (date >= cutoff).then_some(FeedItem { title, url, date })
        })
        .take(MAX_URLS)
        .collect();

    debug!("kept {} of {} candidates (cutoff {})", items.len(), total, cutoff);
    items
}
