//! `docxes.toml` loading.
//!
//! ```toml
//! [docs]
//! content_dir = "content/docs"   # one directory per version
//! cache_dir = ".docxes"
//! public_dir = "public"
//! base_path = "/docs"
//! slugify = "slugify"            # or "preserve"
//!
//! [build]
//! mode = "production"            # or "development"
//! incremental = true
//! plugins = ["normalize-line-endings"]
//!
//! [compiler]
//! theme = "github-dark"
//!
//! [sitemap]
//! enabled = true
//! site_url = "${SITE_URL:-https://docs.example.com}"
//! ```
//!
//! Without an explicit path the file is looked up in the working directory
//! and then each parent. Relative paths resolve against the directory holding
//! the file; with no file at all they resolve against the working directory.
//! [`CliSettings`] overrides are applied last.

mod error;
mod expand;
mod sections;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use error::ConfigError;
pub use sections::{BuildConfig, BuildMode, CompilerConfig, DocsConfig, SitemapConfig, SlugMode};

use sections::DocsSection;

const CONFIG_FILENAME: &str = "docxes.toml";

/// Command-line overrides. `None` keeps the configured value.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub content_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub mode: Option<BuildMode>,
    pub incremental: Option<bool>,
}

/// Parsed and resolved configuration.
#[derive(Debug)]
pub struct Config {
    pub build: BuildConfig,
    pub compiler: CompilerConfig,
    pub sitemap: SitemapConfig,
    pub docs_resolved: DocsConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    docs: DocsSection,
    build: BuildConfig,
    compiler: CompilerConfig,
    sitemap: SitemapConfig,
}

impl Config {
    /// Load `config_path`, or the nearest `docxes.toml`, or defaults.
    ///
    /// # Errors
    ///
    /// Fails when an explicit `config_path` is missing, or when the file
    /// cannot be read, parsed, expanded or validated.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_owned())),
            Some(path) => Self::from_file(path)?,
            None => match find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => Self::with_root(&std::env::current_dir().unwrap_or_default()),
            },
        };

        if let Some(overrides) = cli_settings {
            config.apply(overrides);
        }
        Ok(config)
    }

    /// Defaults with every path under `root`.
    #[must_use]
    pub fn with_root(root: &Path) -> Self {
        Self::from_parts(ConfigFile::default(), root, None)
    }

    /// Parse TOML text as if it were read from a file in `root`.
    ///
    /// # Errors
    ///
    /// Fails when the text is not valid configuration.
    pub fn from_toml(text: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut file: ConfigFile = toml::from_str(text)?;
        if file.sitemap.enabled
            && let Some(url) = &file.sitemap.site_url
        {
            file.sitemap.site_url = Some(expand::expand_env(url, "sitemap.site_url")?);
        }
        let config = Self::from_parts(file, root, None);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let root = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&text, root)?;
        config.config_path = Some(path.to_owned());
        Ok(config)
    }

    fn from_parts(file: ConfigFile, root: &Path, config_path: Option<PathBuf>) -> Self {
        Self {
            docs_resolved: file.docs.resolve(root),
            build: file.build,
            compiler: file.compiler,
            sitemap: file.sitemap,
            config_path,
        }
    }

    fn apply(&mut self, overrides: &CliSettings) {
        let docs = &mut self.docs_resolved;
        if let Some(dir) = &overrides.content_dir {
            docs.content_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.cache_dir {
            docs.cache_dir.clone_from(dir);
        }
        if let Some(mode) = overrides.mode {
            self.build.mode = mode;
        }
        if let Some(incremental) = overrides.incremental {
            self.build.incremental = incremental;
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.docs_resolved.base_path.starts_with('/') {
            return Err(ConfigError::invalid("docs.base_path", "must start with /"));
        }
        if self.sitemap.enabled {
            match self.sitemap.site_url.as_deref() {
                None => {
                    return Err(ConfigError::invalid(
                        "sitemap.site_url",
                        "required when the sitemap is enabled",
                    ));
                }
                Some(url) if !is_http_url(url) => {
                    return Err(ConfigError::invalid(
                        "sitemap.site_url",
                        "must be an http:// or https:// URL",
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Nearest `docxes.toml` in the working directory or its ancestors.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::from_toml(text, Path::new("/project"))
    }

    #[test]
    fn test_defaults() {
        let config = Config::with_root(Path::new("/test"));

        assert_eq!(
            config.docs_resolved,
            DocsConfig {
                content_dir: PathBuf::from("/test/content/docs"),
                cache_dir: PathBuf::from("/test/.docxes"),
                public_dir: PathBuf::from("/test/public"),
                base_path: "/docs".to_owned(),
                slugify: SlugMode::Slugify,
            }
        );
        assert_eq!(config.build, BuildConfig::default());
        assert!(config.build.incremental);
        assert!(config.compiler.highlight_code);
        assert_eq!(config.sitemap.active_site_url(), None);
        assert_eq!(config.config_path, None);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.build, BuildConfig::default());
        assert_eq!(config.compiler, CompilerConfig::default());
    }

    #[test]
    fn test_sections() {
        let config = parse(
            r#"
[docs]
content_dir = "documentation"
cache_dir = "build/cache"
base_path = "/guide/"
slugify = "preserve"

[build]
mode = "development"
incremental = false
plugins = ["normalize-line-endings", "strip-html-comments"]

[compiler]
highlighter = "rehype-pretty-code"
theme = "github-dark"
keep_background = true
"#,
        )
        .unwrap();

        assert_eq!(config.docs_resolved.content_dir, PathBuf::from("/project/documentation"));
        assert_eq!(config.docs_resolved.cache_dir, PathBuf::from("/project/build/cache"));
        assert_eq!(config.docs_resolved.public_dir, PathBuf::from("/project/public"));
        assert_eq!(config.docs_resolved.base_path, "/guide");
        assert_eq!(config.docs_resolved.slugify, SlugMode::Preserve);
        assert_eq!(
            config.build,
            BuildConfig {
                mode: BuildMode::Development,
                incremental: false,
                plugins: vec![
                    "normalize-line-endings".to_owned(),
                    "strip-html-comments".to_owned()
                ],
            }
        );
        assert_eq!(config.compiler.theme.as_deref(), Some("github-dark"));
        assert!(config.compiler.keep_background);
        assert!(config.compiler.highlight_code);
    }

    #[test]
    fn test_root_base_path() {
        let config = parse("[docs]\nbase_path = \"/\"\n").unwrap();
        assert_eq!(config.docs_resolved.base_path, "/");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            parse("[build]\nmode = \"staging\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            parse("[build]\nwatch = true\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            parse("[docs]\nbase_path = \"docs\"\n"),
            Err(ConfigError::Invalid {
                field: "docs.base_path",
                ..
            })
        ));
    }

    #[test]
    fn test_sitemap_validation() {
        let missing = parse("[sitemap]\nenabled = true\n").unwrap_err();
        assert_eq!(
            missing.to_string(),
            "invalid value for sitemap.site_url: required when the sitemap is enabled"
        );

        assert!(parse("[sitemap]\nenabled = true\nsite_url = \"docs.example.com\"\n").is_err());

        // A URL without `enabled` is kept but inactive.
        let config = parse("[sitemap]\nsite_url = \"https://docs.example.com\"\n").unwrap();
        assert_eq!(config.sitemap.active_site_url(), None);
    }

    #[test]
    fn test_site_url_not_expanded_when_sitemap_disabled() {
        let text = "[sitemap]\nsite_url = \"${DOCXES_TEST_SURELY_UNSET_VAR}\"\n";

        let config = parse(text).unwrap();
        assert_eq!(
            config.sitemap.site_url.as_deref(),
            Some("${DOCXES_TEST_SURELY_UNSET_VAR}")
        );
        assert_eq!(config.sitemap.active_site_url(), None);

        let enabled = parse(&format!("{text}enabled = true\n"));
        assert!(matches!(enabled, Err(ConfigError::UnsetVar { .. })));
    }

    #[test]
    fn test_cli_settings_override() {
        let overrides = CliSettings {
            content_dir: Some(PathBuf::from("/custom/docs")),
            incremental: Some(false),
            ..CliSettings::default()
        };
        let mut config = Config::with_root(Path::new("/test"));

        config.apply(&overrides);

        assert_eq!(config.docs_resolved.content_dir, PathBuf::from("/custom/docs"));
        assert!(!config.build.incremental);
        assert_eq!(config.docs_resolved.cache_dir, PathBuf::from("/test/.docxes"));
        assert_eq!(config.build.mode, BuildMode::Production);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/docxes.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_file_resolves_relative_to_its_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("docxes.toml");
        std::fs::write(
            &path,
            "[docs]\ncontent_dir = \"docs\"\n\n[sitemap]\nenabled = true\nsite_url = \"${DOCXES_TEST_SURELY_UNSET_VAR:-https://docs.example.com}\"\n",
        )
        .unwrap();

        let config = Config::load(
            Some(&path),
            Some(&CliSettings {
                mode: Some(BuildMode::Development),
                ..CliSettings::default()
            }),
        )
        .unwrap();

        assert_eq!(config.docs_resolved.content_dir, tmp.path().join("docs"));
        assert_eq!(config.sitemap.active_site_url(), Some("https://docs.example.com"));
        assert_eq!(config.build.mode, BuildMode::Development);
        assert_eq!(config.config_path, Some(path));
    }
}
