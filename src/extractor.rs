//! Schema-constrained extraction of news items from one page.
//!
//! [`Extractor`] sends the whole page text to the model in a single call,
//! together with the instruction text and the JSON schema of the active
//! variant. The reply is coerced to the schema and every surviving item is
//! normalized against the page URL, in order.

use crate::api::AskAsync;
use crate::error::PipelineError;
use crate::models::NewsItemCollection;
use crate::normalizer::normalize;
use crate::schema::SchemaVariant;
use crate::utils::{looks_truncated, strip_code_fence, truncate_for_log};
use serde_json::Value;
use tracing::{info, instrument, warn};

pub struct Extractor<A> {
    model: A,
    variant: SchemaVariant,
    instructions: String,
}

impl<A> Extractor<A>
where
    A: AskAsync<Response = String>,
{
    /// Create an extractor for one schema variant.
    ///
    /// # Arguments
    ///
    /// * `model` - The model client every page is sent to
    /// * `variant` - Which field set the reply is coerced to
    /// * `instructions` - Text placed ahead of the schema in every prompt
    ///
    /// # Returns
    ///
    /// An extractor that makes one model call per page, plus at most one
    /// re-ask when the reply is cut off.
    pub fn new(model: A, variant: SchemaVariant, instructions: impl Into<String>) -> Self {
        Self {
            model,
            variant,
            instructions: instructions.into(),
        }
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Build the prompt for one page: instructions, schema, then the text.
    pub fn prompt(&self, text: &str) -> String {
        let schema = serde_json::to_string_pretty(&self.variant.json_schema())
            .unwrap_or_else(|_| self.variant.json_schema().to_string());
        format!(
            "{instructions}\n\n\
             Respond with a single JSON object that conforms to this JSON schema and nothing else:\n\
             {schema}\n\n\
             Text:\n{text}",
            instructions = self.instructions,
        )
    }

    /// Extract the news items contained in `text`, attributing them to `source_url`.
    ///
    /// No size limit is applied to `text`. A failed model call, or a reply that
    /// cannot be read as a news item collection, is returned as
    /// [`PipelineError::ExtractionCall`]. Items that individually fail the
    /// schema are dropped without failing the call.
    #[instrument(level = "info", skip_all, fields(url = %source_url, text_bytes = text.len()))]
    pub async fn extract(
        &self,
        text: &str,
        source_url: &str,
    ) -> Result<NewsItemCollection, PipelineError> {
        info!("Extracting news items from text");
        let prompt = self.prompt(text);

        let mut response = self.ask(&prompt, source_url).await?;
        let mut parsed = parse_response(&response);

        // A reply cut off by the token limit usually succeeds on a second try.
        if let Err(ref e) = parsed {
            if looks_truncated(e) {
                warn!(error = %e, "EOF while parsing; re-asking once");
                response = self.ask(&prompt, source_url).await?;
                parsed = parse_response(&response);
            }
        }

        let value = parsed.map_err(|e| {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&response, 300),
                "Model returned non-conforming JSON"
            );
            PipelineError::ExtractionCall {
                url: source_url.to_string(),
                message: format!("unparseable model response: {e}"),
            }
        })?;

        let extracted =
            self.variant
                .coerce_items(value)
                .map_err(|e| PipelineError::ExtractionCall {
                    url: source_url.to_string(),
                    message: e.to_string(),
                })?;

        let collection = NewsItemCollection {
            news_items: extracted
                .into_iter()
                .map(|item| normalize(item, source_url))
                .collect(),
        };
        info!(count = collection.len(), "Extracted news items");
        Ok(collection)
    }

    async fn ask(&self, prompt: &str, source_url: &str) -> Result<String, PipelineError> {
        self.model
            .ask(prompt)
            .await
            .map_err(|e| PipelineError::ExtractionCall {
                url: source_url.to_string(),
                message: e.to_string(),
            })
    }
}

fn parse_response(raw: &str) -> serde_json::Result<Value> {
    serde_json::from_str(strip_code_fence(raw))
}
