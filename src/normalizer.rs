//! Turns model output into storable items.
//!
//! Normalization does three things to every [`ExtractedItem`]:
//!
//! 1. Assigns `source_link` from the URL the page was loaded from, replacing
//!    whatever the model may have claimed.
//! 2. Repairs a `YYYY-MM` publish date to the first of that month, then parses
//!    strictly as `YYYY-MM-DD`. A date that still fails becomes `None`.
//! 3. Reads `importance` from integers, integral floats or numeric strings and
//!    discards anything outside `1..=5`.
//!
//! Failures here are local to one field of one item; they are logged and never
//! returned to the caller.

use crate::error::PipelineError;
use crate::models::{ExtractedItem, NewsItem};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());
static FULL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Parse a publish date, treating a bare year-month as day one.
///
/// Only the `YYYY-MM` form is repaired. Year-only and every other partial
/// form are rejected.
///
/// ```ignore
/// assert_eq!(parse_publish_date("2024-05")?, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
/// ```
pub fn parse_publish_date(raw: &str) -> Result<NaiveDate, PipelineError> {
    let candidate = if YEAR_MONTH.is_match(raw) {
        format!("{raw}-01")
    } else {
        raw.to_string()
    };

    if !FULL_DATE.is_match(&candidate) {
        return Err(PipelineError::DateParse {
            input: raw.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        });
    }

    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").map_err(|e| PipelineError::DateParse {
        input: raw.to_string(),
        reason: e.to_string(),
    })
}

fn normalize_date(raw: Option<Value>, source_url: &str) -> Option<NaiveDate> {
    let result = match raw? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => parse_publish_date(&s),
        other => Err(PipelineError::DateParse {
            input: other.to_string(),
            reason: "expected a string".to_string(),
        }),
    };

    match result {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(url = %source_url, field = "publish_date", error = %e, "Discarding unparseable date");
            None
        }
    }
}

/// Read an importance rank, accepting `4`, `4.0` and `"4"` alike.
fn importance_rank(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn normalize_importance(raw: Option<Value>, source_url: &str) -> Option<u8> {
    let raw = raw?;
    if raw.is_null() {
        return None;
    }
    match importance_rank(&raw).map(u8::try_from) {
        Some(Ok(v @ 1..=5)) => Some(v),
        _ => {
            warn!(url = %source_url, field = "importance", value = %raw, "Discarding importance that is not an integer in 1..=5");
            None
        }
    }
}

/// Normalize one extracted item against the page it came from.
pub fn normalize(item: ExtractedItem, source_url: &str) -> NewsItem {
    if let Some(claimed) = item.source_link.as_deref() {
        if claimed != source_url {
            debug!(claimed, url = %source_url, "Overriding model-supplied source_link");
        }
    }

    NewsItem {
        publish_date: normalize_date(item.publish_date, source_url),
        importance: normalize_importance(item.importance, source_url),
        title: item.title,
        category: item.category,
        summary: item.summary,
        full_text: item.full_text,
        author: item.author,
        image_links: item.image_links,
        source_link: source_url.to_string(),
    }
}
