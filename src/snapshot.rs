//! Snapshot persistence for an aggregated run.
//!
//! A snapshot is one JSON file holding an array of item objects. Each object
//! has exactly the keys of the schema variant the run used; absent values are
//! written as `null` and dates as `YYYY-MM-DD`. Every run overwrites the
//! previous snapshot in full.
//!
//! # Output Structure
//!
//! ```text
//! output_directory/
//! ├── events.json       # snapshot of the last extraction run
//! └── newsletter.md     # written from the sorted snapshot
//! ```

use crate::error::PipelineError;
use crate::models::NewsItem;
use crate::schema::SchemaVariant;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

fn persistence_error(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Persistence {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Write `items` to `path`, replacing any previous snapshot.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = items.len()))]
pub async fn write_snapshot(
    items: &[NewsItem],
    variant: SchemaVariant,
    path: &Path,
) -> Result<(), PipelineError> {
    let objects = items
        .iter()
        .map(|item| variant.project(item))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| persistence_error(path, e))?;
    let json = serde_json::to_string_pretty(&objects).map_err(|e| persistence_error(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| persistence_error(path, e))?;
    }

    info!("Writing snapshot");
    fs::write(path, json)
        .await
        .map_err(|e| persistence_error(path, e))?;
    info!("Wrote snapshot");
    Ok(())
}

/// Read a snapshot back into items, in stored order.
///
/// Snapshots from either schema variant load; keys a variant lacks come back
/// as `None`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_snapshot(path: &Path) -> Result<Vec<NewsItem>, PipelineError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| persistence_error(path, e))?;
    let items: Vec<NewsItem> = serde_json::from_str(&raw).map_err(|e| persistence_error(path, e))?;
    info!(count = items.len(), "Loaded snapshot");
    Ok(items)
}

/// Sort items by publish date, oldest first, with undated items before all
/// dated ones. The sort is stable.
pub fn sort_by_publish_date(items: &mut [NewsItem]) {
    // `None < Some(_)` for `Option`, which puts undated items first.
    items.sort_by_key(|item| item.publish_date);
}
