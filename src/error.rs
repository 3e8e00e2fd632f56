use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of a single pipeline load. Both variants are terminal for the
/// attempt; no partial table is ever returned alongside them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn not_found(path: &Path) -> Self {
        Self::SourceNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::SourceNotFound { path } | Self::MalformedSource { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedSource { .. })
    }
}
