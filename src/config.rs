//! Run settings.
//!
//! Settings come from a YAML file and are passed by reference to every stage
//! that needs them. Prompt text lives here too, so prompt variants can change
//! without touching pipeline code.
//!
//! ```yaml
//! output_directory: ./output
//! schema_variant: full
//! sources:
//!   - https://www.deeplearning.ai/the-batch/issue-277/
//!   - https://www.deeplearning.ai/the-batch/issue-276/
//! ```

use crate::error::PipelineError;
use crate::schema::SchemaVariant;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_EXTRACTION_INSTRUCTIONS: &str = "You are an expert extraction algorithm. \
Extract multiple news items from the text. \
If you do not know the value of an attribute asked to extract return null for the attribute's value.\n\
Example: If the text is 'AI Daily: Meta releases Llama 3.1...', you should extract the following news item: \
title: 'First open weights model competitive with OpenAI! Llama 3.1 released by Meta, new 405b model evals even with closed models', ...";

pub const DEFAULT_NEWSLETTER_INSTRUCTIONS: &str = "You are a newsletter writer for Gen AI engineers and consultants.
Generate a newsletter for the following news items I provide.
The newsletter should be written like a 30 year old technical consultant from a bespoke technical consultancy.
Create a subtitle for the newsletter, maximum 10 words, that describes the news items. The title will be applied later.
The news items should be related to AI, machine learning, and data science, with a focus on tooling like the OpenAI and Claude APIs, LangChain, and LlamaIndex.
Keep the newsletter exciting and engaging, but don't make up any news items.
Group the news items into sections with a short introductory paragraph for each section.
When discussing models, cite evals/benchmarks/etc., compare to other popular models as much as possible so people can easily understand the relative performance of the models.
Create a short executive summary at the top, maximum 4 sentences. In the executive summary, create an open loop, exciting readers, and giving a short hint at the most important topics. Someone should be able to read the executive summary get the most important headlines.
Be sure to cite sources for all news items by linking to the original source.";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub output_directory: PathBuf,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub schema_variant: SchemaVariant,
    #[serde(default = "default_extraction_instructions")]
    pub extraction_instructions: String,
    #[serde(default = "default_newsletter_instructions")]
    pub newsletter_instructions: String,
    #[serde(default = "default_extraction_template")]
    pub extraction_template: String,
    #[serde(default = "default_newsletter_template")]
    pub newsletter_template: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default = "default_newsletter_file")]
    pub newsletter_file: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
}

fn default_extraction_instructions() -> String {
    DEFAULT_EXTRACTION_INSTRUCTIONS.to_string()
}

fn default_newsletter_instructions() -> String {
    DEFAULT_NEWSLETTER_INSTRUCTIONS.to_string()
}

fn default_extraction_template() -> String {
    "news_extractor".to_string()
}

fn default_newsletter_template() -> String {
    "newsletter_writer".to_string()
}

fn default_snapshot_file() -> String {
    "events.json".to_string()
}

fn default_newsletter_file() -> String {
    "newsletter.md".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_sources() -> usize {
    1
}

impl Settings {
    /// Read and validate settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, PipelineError> {
        let settings: Settings =
            serde_yaml::from_str(raw).map_err(|e| PipelineError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.output_directory.as_os_str().is_empty() {
            return Err(PipelineError::Config("output_directory is empty".to_string()));
        }
        if self.max_concurrent_sources == 0 {
            return Err(PipelineError::Config(
                "max_concurrent_sources must be at least 1".to_string(),
            ));
        }
        for source in &self.sources {
            Url::parse(source)
                .map_err(|e| PipelineError::Config(format!("invalid source URL {source:?}: {e}")))?;
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_directory.join(&self.snapshot_file)
    }

    pub fn newsletter_path(&self) -> PathBuf {
        self.output_directory.join(&self.newsletter_file)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_yaml(
            "output_directory: ./out\nsources:\n  - https://www.deeplearning.ai/the-batch/issue-277/\n",
        )
        .unwrap();
        assert_eq!(settings.schema_variant, SchemaVariant::Full);
        assert_eq!(settings.snapshot_path(), PathBuf::from("./out/events.json"));
        assert_eq!(settings.newsletter_path(), PathBuf::from("./out/newsletter.md"));
        assert_eq!(settings.max_concurrent_sources, 1);
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(30));
        assert!(settings.extraction_instructions.contains("return null"));
    }

    #[test]
    fn test_minimal_variant() {
        let settings =
            Settings::from_yaml("output_directory: ./out\nschema_variant: minimal\n").unwrap();
        assert_eq!(settings.schema_variant, SchemaVariant::Minimal);
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_invalid_source_rejected() {
        let err = Settings::from_yaml("output_directory: ./out\nsources:\n  - not a url\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Settings::from_yaml("output_directory: ./out\nmax_concurrent_sources: 0\n").is_err());
    }

    #[test]
    fn test_missing_output_directory_rejected() {
        assert!(Settings::from_yaml("sources: []\n").is_err());
    }

    #[test]
    fn test_overridden_output_directory_revalidated() {
        let mut settings = Settings::from_yaml("output_directory: ./out\n").unwrap();
        settings.output_directory = PathBuf::new();
        assert!(matches!(settings.validate(), Err(PipelineError::Config(_))));

        settings.output_directory = PathBuf::from("./elsewhere");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.snapshot_path(), PathBuf::from("./elsewhere/events.json"));
    }
}
