// Export Errors
// Every failure that can abort an export, tagged with the stage or pass it came from

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("{pass}: required marker '{marker}' not found in {file}")]
    MissingMarker {
        pass: &'static str,
        file: String,
        marker: String,
    },

    #[error("Invalid settings file: {0}")]
    InvalidSettingsFile(String),

    #[error("Dependency installation failed: {0}")]
    DependencyInstall(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Scope tag of the stage that raised the error, used in log lines
    pub fn scope(&self) -> &'static str {
        match self {
            ExportError::InvalidDocument(_) => "Validation",
            ExportError::Io { .. } | ExportError::Workspace(_) => "Workspace",
            ExportError::MissingMarker { pass, .. } => pass,
            ExportError::InvalidSettingsFile(_) => "SettingsFile",
            ExportError::DependencyInstall(_) => "Dependencies",
            ExportError::Packaging(_) => "Packager",
        }
    }

    /// True for errors that should be reported to the caller verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ExportError::InvalidDocument(_)
                | ExportError::MissingMarker { .. }
                | ExportError::InvalidSettingsFile(_)
        )
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
