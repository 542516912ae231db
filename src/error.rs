//! Error taxonomy for the extraction pipeline.
//!
//! Errors fall into three scopes, and the scope decides what happens next:
//!
//! | Scope | Variants | Handling |
//! |-------|----------|----------|
//! | Item | [`PipelineError::SchemaValidation`], [`PipelineError::DateParse`] | logged, item dropped or field nulled |
//! | Source | [`PipelineError::SourceFetch`], [`PipelineError::ExtractionCall`] | logged, source contributes nothing, run continues |
//! | Run | [`PipelineError::Persistence`], [`PipelineError::Config`], [`PipelineError::Narrative`] | propagated to `main` |

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("item does not match the schema: {0}")]
    SchemaValidation(String),

    #[error("could not parse date {input:?}: {reason}")]
    DateParse { input: String, reason: String },

    #[error("failed to load page {url}: {message}")]
    SourceFetch { url: String, message: String },

    #[error("extraction failed for {url}: {message}")]
    ExtractionCall { url: String, message: String },

    #[error("snapshot {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("newsletter generation failed: {0}")]
    Narrative(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_names_path() {
        let e = PipelineError::Persistence {
            path: "/tmp/events.json".to_string(),
            message: "read-only file system".to_string(),
        };
        assert_eq!(e.to_string(), "snapshot /tmp/events.json: read-only file system");
    }

    #[test]
    fn test_display_includes_context() {
        let e = PipelineError::DateParse {
            input: "sometime in May".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        assert!(e.to_string().contains("sometime in May"));

        let e = PipelineError::ExtractionCall {
            url: "https://example.com/issue-1".to_string(),
            message: "EOF".to_string(),
        };
        assert!(e.to_string().contains("https://example.com/issue-1"));
    }
}
