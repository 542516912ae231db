//! Runs extraction over every configured source and persists the result.
//!
//! Sources are processed in list order. Each source is loaded, extracted and
//! normalized; its items are appended to one accumulator in extraction order.
//! A source that fails to load or extract contributes nothing and is recorded
//! in the run's failure list; the remaining sources still run.
//!
//! With `max_concurrent_sources > 1` sources are in flight concurrently, but
//! results are still consumed in source order, so the aggregated collection is
//! the same as a sequential run would produce.

use crate::api::AskAsync;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::extractor::Extractor;
use crate::loader::LoadPage;
use crate::models::{NewsItem, NewsItemCollection, SourcePage};
use crate::snapshot::write_snapshot;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument};

/// A source that contributed no items because loading or extraction failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of one aggregation run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// All items, in source order then extraction order.
    pub items: Vec<NewsItem>,
    pub failures: Vec<SourceFailure>,
    pub sources_processed: usize,
}

pub struct Aggregator<L, A> {
    settings: Settings,
    loader: L,
    extractor: Extractor<A>,
}

impl<L, A> Aggregator<L, A>
where
    L: LoadPage,
    A: AskAsync<Response = String>,
{
    /// Wire an aggregator from its parts.
    ///
    /// # Arguments
    ///
    /// * `settings` - Supplies the source list, concurrency and snapshot path
    /// * `loader` - Turns each source URL into page text
    /// * `extractor` - Turns page text into normalized items
    ///
    /// # Returns
    ///
    /// An aggregator ready for [`Aggregator::run`] or [`Aggregator::aggregate`].
    pub fn new(settings: Settings, loader: L, extractor: Extractor<A>) -> Self {
        Self {
            settings,
            loader,
            extractor,
        }
    }

    async fn load_page(&self, url: &str) -> Result<SourcePage, PipelineError> {
        let text = self
            .loader
            .load(url)
            .await
            .map_err(|e| PipelineError::SourceFetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(SourcePage {
            url: url.to_string(),
            text,
        })
    }

    async fn process_source(&self, url: &str) -> Result<NewsItemCollection, PipelineError> {
        let page = self.load_page(url).await?;
        self.extractor.extract(&page.text, &page.url).await
    }

    /// Extract items from `sources` without persisting anything.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn aggregate(&self, sources: &[String]) -> RunReport {
        let concurrency = self.settings.max_concurrent_sources.max(1);

        // `buffered` yields in input order regardless of completion order.
        let results: Vec<(&str, Result<NewsItemCollection, PipelineError>)> =
            stream::iter(sources.iter())
                .map(move |url| async move { (url.as_str(), self.process_source(url).await) })
                .buffered(concurrency)
                .collect()
                .await;

        let mut report = RunReport::default();
        for (url, result) in results {
            report.sources_processed += 1;
            match result {
                Ok(collection) => {
                    info!(%url, count = collection.len(), "Source processed");
                    report.items.extend(collection.news_items);
                }
                Err(e) => {
                    error!(%url, error = %e, "Source failed; continuing with remaining sources");
                    report.failures.push(SourceFailure {
                        url: url.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Extract every configured source and overwrite the snapshot.
    ///
    /// Only a snapshot write failure is returned as an error; source failures
    /// are reported in [`RunReport::failures`].
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let report = self.aggregate(&self.settings.sources).await;

        let path = self.settings.snapshot_path();
        info!(count = report.items.len(), path = %path.display(), "Storing news items");
        write_snapshot(&report.items, self.extractor.variant(), &path).await?;
        info!(count = report.items.len(), path = %path.display(), "Stored news items");

        let by_category = report
            .items
            .iter()
            .counts_by(|item| item.category.clone().unwrap_or_else(|| "uncategorized".to_string()));
        for (category, count) in by_category.iter().sorted() {
            info!(%category, count, "Items per category");
        }
        if !report.failures.is_empty() {
            error!(
                failed = report.failures.len(),
                urls = %report.failures.iter().map(|f| f.url.as_str()).join(", "),
                "Some sources failed"
            );
        }
        for item in &report.items {
            debug!(?item, "Stored item");
        }

        Ok(report)
    }
}
