use std::path::PathBuf;

/// Failure to load or validate `docxes.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but is not acceptable.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    /// `${VAR}` referenced an unset variable and gave no default.
    #[error("{field}: environment variable {var} is not set")]
    UnsetVar { field: &'static str, var: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
