//! LLM API interaction with exponential backoff retry logic.
//!
//! Both model passes in the pipeline, item extraction and newsletter writing,
//! go through the same [`AskAsync`] seam:
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`AwfulClient`]: Owns an `awful_aj` configuration and chat template and
//!   forwards prompts to `awful_aj::api::ask`
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its reply. Tests swap in
/// scripted implementations; production code uses [`AwfulClient`] wrapped in
/// [`RetryAsk`].
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// The retry policy used for every production model call.
    pub fn with_default_backoff(inner: T) -> Self {
        Self::new(inner, 5, StdDuration::from_secs(1))
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.delay_for(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// An `awful_aj` model endpoint bound to one chat template.
pub struct AwfulClient {
    config: AwfulJadeConfig,
    template: ChatTemplate,
    template_name: String,
}

impl AwfulClient {
    /// Load the model configuration from `config_path` and the named template
    /// from the `awful_aj` template directory.
    #[instrument(level = "info", skip_all, fields(config_path = %config_path.display(), template_name = %template_name))]
    pub async fn load(config_path: &Path, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let path = config_path
            .to_str()
            .ok_or_else(|| format!("not a valid config filename: {}", config_path.display()))?;
        let config = config::load_config(path)?;
        let template = template::load_template(template_name).await?;
        info!("Loaded model configuration and template");
        Ok(Self {
            config,
            template,
            template_name: template_name.to_string(),
        })
    }
}

impl fmt::Debug for AwfulClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwfulClient")
            .field("template_name", &self.template_name)
            .finish()
    }
}

impl AskAsync for AwfulClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(template = %self.template_name))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => info!(elapsed_ms = dt.as_millis() as u64, "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed"),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Flaky {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err("transient".into())
            } else {
                Ok(format!("echo: {text}"))
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = Flaky {
            failures_before_success: 2,
            calls: AtomicUsize::new(0),
        };
        let api = RetryAsk::new(flaky, 3, StdDuration::from_millis(1));
        let resp = api.ask("hi").await.unwrap();
        assert_eq!(resp, "echo: hi");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let flaky = Flaky {
            failures_before_success: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let api = RetryAsk::new(flaky, 2, StdDuration::from_millis(1));
        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let flaky = Flaky {
            failures_before_success: 0,
            calls: AtomicUsize::new(0),
        };
        let api = RetryAsk::with_default_backoff(flaky);
        assert_eq!(api.delay_for(1), StdDuration::from_secs(1));
        assert_eq!(api.delay_for(3), StdDuration::from_secs(4));
        assert_eq!(api.delay_for(10), StdDuration::from_secs(30));
    }
}
