//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod clean;

pub(crate) use build::BuildArgs;
pub(crate) use clean::CleanArgs;

use docxes_config::{BuildMode as ConfigMode, Config, SlugMode};
use docxes_engine::{BuildMode, CompileOptions, EngineSettings, SlugStrategy};

/// Engine settings for a loaded configuration.
pub(crate) fn engine_settings(config: &Config) -> EngineSettings {
    let docs = &config.docs_resolved;
    let mut settings = EngineSettings::new(docs.content_dir.clone(), docs.cache_dir.clone());
    settings.public_dir.clone_from(&docs.public_dir);
    settings.base_path.clone_from(&docs.base_path);
    settings.mode = match config.build.mode {
        ConfigMode::Production => BuildMode::Production,
        ConfigMode::Development => BuildMode::Development,
    };
    settings.slug_strategy = match docs.slugify {
        SlugMode::Slugify => SlugStrategy::Slugify,
        SlugMode::Preserve => SlugStrategy::Preserve,
    };
    settings.compile = CompileOptions {
        highlighter: config.compiler.highlighter.clone(),
        theme: config.compiler.theme.clone(),
        keep_background: config.compiler.keep_background,
        highlight_code: config.compiler.highlight_code,
    };
    settings.site_url = config.sitemap.active_site_url().map(str::to_owned);
    settings
}
