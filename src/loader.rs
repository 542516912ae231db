//! Page loading for source URLs.
//!
//! The pipeline only needs "given a URL, return page text", expressed as the
//! [`LoadPage`] trait. [`HttpPageLoader`] is the production implementation:
//! it downloads the page with `reqwest` and keeps the readable parts with
//! `scraper`, then lists the page's images as absolute URLs so the model can
//! attribute them to items.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Turns a source URL into the text handed to the extractor.
pub trait LoadPage {
    /// Load the readable text of one page.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the source page
    ///
    /// # Returns
    ///
    /// The page text, or an error if the page could not be fetched. The
    /// aggregator reports such errors as a source failure.
    async fn load(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

#[derive(Debug, Clone)]
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    /// Build a loader with its own HTTP client.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound on each whole request, body included
    ///
    /// # Returns
    ///
    /// The loader, or the `reqwest` error if the client could not be built
    /// (for example when no TLS backend is available).
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl LoadPage for HttpPageLoader {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn load(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let base = Url::parse(url)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let text = page_text(&body, &base)?;
        info!(html_bytes = body.len(), text_bytes = text.len(), "Loaded page");
        Ok(text)
    }
}

/// Render the readable text of an HTML document.
///
/// Headings, paragraphs, list items, quotes and captions are kept in document
/// order, one per line. A block nested inside another kept block (a paragraph
/// inside a list item, say) is already part of its ancestor's text and is not
/// repeated. Image sources are resolved against `base` and listed after the
/// text.
pub fn page_text(html: &str, base: &Url) -> Result<String, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let text_selector = Selector::parse("h1, h2, h3, h4, h5, h6, p, li, blockquote, figcaption")?;
    let image_selector = Selector::parse("img[src]")?;

    let mut content = String::new();
    for element in document.select(&text_selector) {
        let nested = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| text_selector.matches(&ancestor));
        if nested {
            continue;
        }
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            content.push_str(&text);
            content.push('\n');
        }
    }

    let mut images = Vec::new();
    for element in document.select(&image_selector) {
        if let Some(src) = element.value().attr("src") {
            match base.join(src) {
                Ok(resolved) => images.push(resolved.to_string()),
                Err(e) => debug!(src, error = %e, "Skipping unresolvable image"),
            }
        }
    }

    if !images.is_empty() {
        content.push_str("\nImages:\n");
        for image in images {
            content.push_str(&image);
            content.push('\n');
        }
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>The Batch</title><script>var x = 1;</script></head>
          <body>
            <h1>Issue 277</h1>
            <p>OpenAI   released
               o1 to all users.</p>
            <ul><li>Item one</li><li></li></ul>
            <img src="/images/o1.png">
            <img src="https://cdn.example.com/llama.jpg">
          </body>
        </html>
    "#;

    #[test]
    fn test_page_text_keeps_readable_blocks() {
        let base = Url::parse("https://www.deeplearning.ai/the-batch/issue-277/").unwrap();
        let text = page_text(PAGE, &base).unwrap();
        assert!(text.starts_with("Issue 277\nOpenAI released o1 to all users.\nItem one\n"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn test_page_text_nested_blocks_appear_once() {
        let base = Url::parse("https://example.com/").unwrap();
        let html = r#"
            <ul><li><p>Gemini 2.0 Flash is out</p></li></ul>
            <blockquote><p>Open weights matter.</p><p>So do evals.</p></blockquote>
            <p>Standalone paragraph</p>
        "#;
        let text = page_text(html, &base).unwrap();
        assert_eq!(text.matches("Gemini 2.0 Flash is out").count(), 1);
        assert_eq!(text.matches("Open weights matter.").count(), 1);
        assert_eq!(
            text,
            "Gemini 2.0 Flash is out\nOpen weights matter. So do evals.\nStandalone paragraph\n"
        );
    }

    #[test]
    fn test_page_text_resolves_images() {
        let base = Url::parse("https://www.deeplearning.ai/the-batch/issue-277/").unwrap();
        let text = page_text(PAGE, &base).unwrap();
        assert!(text.contains("https://www.deeplearning.ai/images/o1.png\n"));
        assert!(text.contains("https://cdn.example.com/llama.jpg\n"));
    }

    #[test]
    fn test_page_text_empty_document() {
        let base = Url::parse("https://example.com").unwrap();
        assert_eq!(page_text("", &base).unwrap(), "");
    }
}
