//! Newsletter assembly from a stored snapshot.
//!
//! The snapshot is reloaded, sorted by publish date (undated items first,
//! stable otherwise), rendered as one JSON block and handed to the model
//! together with the style instructions. The model's reply is written to the
//! newsletter file unchanged.

use crate::api::AskAsync;
use crate::error::PipelineError;
use crate::models::NewsItem;
use crate::schema::SchemaVariant;
use crate::snapshot::{load_snapshot, sort_by_publish_date};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Reload a snapshot and order it for the newsletter.
pub async fn prepare_items(snapshot_path: &Path) -> Result<Vec<NewsItem>, PipelineError> {
    let mut items = load_snapshot(snapshot_path).await?;
    sort_by_publish_date(&mut items);
    Ok(items)
}

/// Render sorted items as the single JSON block the writer model reads.
pub fn render_items(items: &[NewsItem], variant: SchemaVariant) -> serde_json::Result<String> {
    let objects = items
        .iter()
        .map(|item| variant.project(item))
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_string(&objects)
}

pub struct NewsletterWriter<A> {
    model: A,
    variant: SchemaVariant,
    instructions: String,
}

impl<A> NewsletterWriter<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(model: A, variant: SchemaVariant, instructions: impl Into<String>) -> Self {
        Self {
            model,
            variant,
            instructions: instructions.into(),
        }
    }

    pub fn prompt(&self, rendered_items: &str) -> String {
        format!("{}\n\nNews items:\n{}", self.instructions, rendered_items)
    }

    /// Produce newsletter text for `items`, which should already be sorted.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn compose(&self, items: &[NewsItem]) -> Result<String, PipelineError> {
        let rendered =
            render_items(items, self.variant).map_err(|e| PipelineError::Narrative(e.to_string()))?;
        let newsletter = self
            .model
            .ask(&self.prompt(&rendered))
            .await
            .map_err(|e| PipelineError::Narrative(e.to_string()))?;
        info!(bytes = newsletter.len(), "Newsletter composed");
        Ok(newsletter)
    }

    /// Reload `snapshot_path`, compose the newsletter and write it to `output_path`.
    #[instrument(level = "info", skip_all, fields(snapshot = %snapshot_path.display(), output = %output_path.display()))]
    pub async fn write(&self, snapshot_path: &Path, output_path: &Path) -> Result<(), PipelineError> {
        info!("Generating newsletter markdown");
        let items = prepare_items(snapshot_path).await?;
        let newsletter = self.compose(&items).await?;

        fs::write(output_path, newsletter)
            .await
            .map_err(|e| PipelineError::Persistence {
                path: output_path.display().to_string(),
                message: e.to_string(),
            })?;
        info!("Wrote newsletter");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::write_snapshot;
    use chrono::NaiveDate;
    use std::error::Error;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recording {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl AskAsync for &Recording {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.prompts.lock().unwrap().push(text.to_string());
            if self.fail {
                Err("rate limited".into())
            } else {
                Ok("# This week in Gen AI\n".to_string())
            }
        }
    }

    fn item(title: &str, date: Option<NaiveDate>) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            category: None,
            importance: None,
            summary: None,
            full_text: None,
            author: None,
            publish_date: date,
            image_links: None,
            source_link: "https://example.com/issue".to_string(),
        }
    }

    #[tokio::test]
    async fn test_prepare_items_sorts_reloaded_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let items = vec![
            item("A", None),
            item("B", NaiveDate::from_ymd_opt(2024, 1, 1)),
            item("C", None),
            item("D", NaiveDate::from_ymd_opt(2023, 1, 1)),
        ];
        write_snapshot(&items, SchemaVariant::Full, &path).await.unwrap();

        let sorted = prepare_items(&path).await.unwrap();
        let titles: Vec<_> = sorted.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C", "D", "B"]);
    }

    #[tokio::test]
    async fn test_write_produces_newsletter_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("events.json");
        let output = dir.path().join("newsletter.md");
        let items = vec![
            item("Later", NaiveDate::from_ymd_opt(2024, 6, 1)),
            item("Earlier", NaiveDate::from_ymd_opt(2024, 5, 1)),
        ];
        write_snapshot(&items, SchemaVariant::Full, &snapshot).await.unwrap();

        let model = Recording::default();
        let writer = NewsletterWriter::new(&model, SchemaVariant::Full, "Write like a consultant.");
        writer.write(&snapshot, &output).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "# This week in Gen AI\n"
        );
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Write like a consultant."));
        let earlier = prompts[0].find("Earlier").unwrap();
        let later = prompts[0].find("Later").unwrap();
        assert!(earlier < later);
        assert!(prompts[0].contains("\"2024-05-01\""));
    }

    #[tokio::test]
    async fn test_model_failure_is_narrative_error() {
        let model = Recording {
            fail: true,
            ..Default::default()
        };
        let writer = NewsletterWriter::new(&model, SchemaVariant::Full, "Write.");
        let err = writer.compose(&[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Narrative(_)));
    }

    #[test]
    fn test_render_items_uses_variant_keys() {
        let rendered = render_items(&[item("T", None)], SchemaVariant::Minimal).unwrap();
        assert!(rendered.contains("\"source_link\""));
        assert!(!rendered.contains("\"importance\""));
    }
}
