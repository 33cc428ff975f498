use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use migrator_core::SourceMode;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILENAME};

#[derive(Debug, Parser)]
#[command(
    name = "wiki-migrator",
    version,
    about = "Migrate a legacy wiki into standalone HTML pages, one resumable batch at a time"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,
    #[arg(long, global = true, value_name = "PATH", help = "Directory holding the progress record")]
    pub state_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Directory receiving migrated pages")]
    pub output_dir: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Start a migration (or resume the stored one) and run its first batch
    Start(SourceArgs),
    /// Process the next batch of the current migration
    Batch,
    /// Pause the current migration
    Stop,
    /// Delete all migration progress
    Reset,
    /// Show the current migration progress
    Status(StatusArgs),
    /// Start, then keep processing batches until the migration settles
    Run(SourceArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct SourceArgs {
    #[arg(long, value_name = "MODE", help = "Source mode: http or files")]
    pub mode: Option<SourceMode>,
    #[arg(long, value_name = "URL", help = "Wiki script URL, e.g. https://host/wiki.php")]
    pub base_url: Option<String>,
    #[arg(long, value_name = "PATH", help = "Page file directory (files mode)")]
    pub source_dir: Option<PathBuf>,
    #[arg(long, value_name = "ID", help = "Element ID of the page content container")]
    pub selector: Option<String>,
    #[arg(long, value_name = "SECONDS", help = "Pause before each page (min 0.5)")]
    pub delay: Option<f64>,
    #[arg(long, value_name = "N", help = "Pages per batch (1-20)")]
    pub batch_size: Option<usize>,
    #[arg(long, value_name = "URL", help = "Public URL prefix for re-hosted images")]
    pub asset_base_url: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct StatusArgs {
    #[arg(long, help = "Print the progress as JSON")]
    pub json: bool,
}

impl Cli {
    /// Applies the global directory overrides.
    pub fn apply_paths(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}

impl SourceArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        let settings = &mut config.migration;
        if let Some(mode) = self.mode {
            settings.source_mode = mode;
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(dir) = &self.source_dir {
            settings.source_directory = dir.clone();
        }
        if let Some(selector) = &self.selector {
            settings.content_selector = selector.clone();
        }
        if let Some(delay) = self.delay {
            settings.request_delay_seconds = delay;
        }
        if let Some(size) = self.batch_size {
            settings.batch_size = size;
        }
        if let Some(url) = &self.asset_base_url {
            config.asset_base_url = url.clone();
        }
    }
}
