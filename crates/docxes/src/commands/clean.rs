//! `docxes clean` command implementation.

use std::path::PathBuf;

use clap::Args;
use docxes_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clean command.
#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Path to configuration file (default: auto-discover docxes.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory to delete (overrides config).
    #[arg(long, env = "DOCXES_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

impl CleanArgs {
    /// Execute the clean command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the directory cannot be
    /// removed.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            cache_dir: self.cache_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let cache_dir = &config.docs_resolved.cache_dir;

        docxes_cache::clean(cache_dir).await?;
        output.success(&format!("Removed {}", cache_dir.display()));

        Ok(())
    }
}
