//! Command-line interface definitions.
//!
//! Every option can also be supplied through an environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract Gen-AI news items from web pages and write a newsletter from them.
///
/// # Examples
///
/// ```sh
/// # Extract items from the configured sources into ./output/events.json
/// genai_newsletter --settings newsletter.yaml extract
///
/// # Write ./output/newsletter.md from the stored items
/// genai_newsletter --settings newsletter.yaml write
///
/// # Put output somewhere else for one run
/// genai_newsletter -o /tmp/newsletter extract
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the settings YAML file
    #[arg(
        short,
        long,
        env = "NEWSLETTER_SETTINGS",
        default_value = "newsletter.yaml",
        global = true
    )]
    pub settings: PathBuf,

    /// Output directory, overriding `output_directory` from the settings file
    #[arg(short, long, env = "NEWSLETTER_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Path to the awful_aj config.yaml (defaults to the awful_aj config directory)
    #[arg(long, env = "AWFUL_AJ_CONFIG", global = true)]
    pub aj_config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Extract news items from every configured source and store the snapshot
    Extract,
    /// Reload the snapshot, sort it and write the newsletter
    Write,
}
