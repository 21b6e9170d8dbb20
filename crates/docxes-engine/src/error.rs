//! Engine error types.
//!
//! Not-found conditions are never errors: missing versions, directories and
//! documents surface as empty or `None` values. Everything here is either
//! document-scoped (a build records it and moves on) or builder-scoped (the
//! build aborts).

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Line/column position inside a source document (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Collaborator stage that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Compile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => f.write_str("parse"),
            Self::Compile => f.write_str("compile"),
        }
    }
}

fn location_suffix(location: Option<&SourceLocation>) -> String {
    location.map(|loc| format!(" at {loc}")).unwrap_or_default()
}

/// Engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required file or directory could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Output could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Parser or compiler rejected a document.
    #[error("Failed to {stage} {key}{}: {message}", location_suffix(.location.as_ref()))]
    Compile {
        /// Document key (`version/slug`).
        key: String,
        stage: Stage,
        location: Option<SourceLocation>,
        message: String,
    },

    /// Configuration names a plugin that does not exist.
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    /// Build output could not be serialized.
    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
