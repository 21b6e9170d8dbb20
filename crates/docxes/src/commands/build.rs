//! `docxes build` command implementation.

use std::path::PathBuf;

use clap::Args;
use docxes_config::{BuildMode, CliSettings, Config};
use docxes_engine::{Collaborators, Engine, PluginPipeline};

use super::engine_settings;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover docxes.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content root with one directory per version (overrides config).
    #[arg(long, env = "DOCXES_CONTENT_DIR")]
    content_dir: Option<PathBuf>,

    /// Cache directory (overrides config).
    #[arg(long, env = "DOCXES_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Reprocess every document, ignoring stored hashes.
    #[arg(long)]
    full: bool,

    /// Bypass the content cache (development mode).
    #[arg(long)]
    dev: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a plugin name is unknown, or
    /// the build cannot write its shared outputs.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            content_dir: self.content_dir,
            cache_dir: self.cache_dir,
            mode: self.dev.then_some(BuildMode::Development),
            incremental: self.full.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let plugins = PluginPipeline::from_names(&config.build.plugins)?;
        let settings = engine_settings(&config);

        output.info(&format!(
            "Content directory: {}",
            settings.content_dir.display()
        ));
        output.info(&format!("Cache directory: {}", settings.cache_dir.display()));

        let engine = Engine::open(settings, Collaborators::default(), plugins).await;
        let outcome = engine.build(config.build.incremental).await?;
        let report = outcome.report;

        for failure in &report.failures {
            output.warning(&format!("Failed: {}", failure.key));
            output.detail(&failure.message);
        }
        output.success(&format!(
            "Built {} version(s): {} processed, {} unchanged, {} failed",
            report.versions,
            report.processed,
            report.skipped,
            report.failures.len()
        ));

        Ok(())
    }
}
