//! Data models for extracted news items.
//!
//! This module defines the structures that flow through the pipeline:
//! - [`SourcePage`]: Page text loaded for one source URL
//! - [`ExtractedItem`]: One item as returned by the model, before normalization
//! - [`NewsItem`]: A normalized item with provenance, ready for the snapshot
//! - [`NewsItemCollection`]: The items produced by one extraction call
//!
//! Both schema variants share these types. Fields a variant does not carry are
//! simply `None`; see [`crate::schema`] for which keys each variant declares.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Readable text of one source page.
#[derive(Debug, Clone)]
pub struct SourcePage {
    /// The URL the text was loaded from.
    pub url: String,
    /// The page text after markup has been stripped.
    pub text: String,
}

/// A news item exactly as the model produced it.
///
/// `title` is the only required key, so an object without one fails to
/// deserialize and never becomes an item. `importance` and `publish_date`
/// stay untyped JSON values until the normalizer has looked at them, so a
/// badly typed value cannot take the rest of the item down with it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedItem {
    pub title: String,
    pub category: Option<String>,
    pub importance: Option<serde_json::Value>,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub author: Option<String>,
    pub publish_date: Option<serde_json::Value>,
    pub image_links: Option<Vec<String>>,
    /// Ignored: provenance is always assigned by the pipeline.
    pub source_link: Option<String>,
}

/// A normalized news item.
///
/// Serialized field names are the schema field names; dates render as
/// `YYYY-MM-DD` and absent values as `null`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    /// Self-contained headline.
    pub title: String,
    /// Free-text label such as "agents" or "open source".
    pub category: Option<String>,
    /// 1 (low) to 5 (high).
    pub importance: Option<u8>,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub author: Option<String>,
    pub publish_date: Option<NaiveDate>,
    /// Image URLs in the order they were found; duplicates are kept.
    pub image_links: Option<Vec<String>>,
    /// URL of the page this item was extracted from.
    pub source_link: String,
}

/// The items extracted from a single page, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NewsItemCollection {
    pub news_items: Vec<NewsItem>,
}

impl NewsItemCollection {
    pub fn len(&self) -> usize {
        self.news_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.news_items.is_empty()
    }
}
