//! Fatal error taxonomy for an audit run.
//!
//! Only two things can stop a run: a usage problem detected before any
//! indexing, or a dataset path that cannot be read. Everything that goes
//! wrong for a single image or label becomes a finding instead, and a check
//! that fails on its own is recorded in the summary as `error`.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit code when gating findings are present.
pub const EXIT_GATE_FAILED: i32 = 1;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Bad configuration, arguments or prior-run artifacts.
    #[error("usage error: {0}")]
    Usage(String),

    /// Dataset root or a split directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output artifact could not be written.
    #[error("cannot write artifact {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },
}

impl AuditError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn data_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DataAccess {
            path: path.into(),
            source,
        }
    }

    /// CI exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            AuditError::Usage(_) => 2,
            AuditError::DataAccess { .. } | AuditError::Artifact { .. } => 3,
        }
    }
}

/// Non-fatal failure of a single check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    /// A capability the check depends on is not present in this build/run.
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The check could not produce a result for this dataset.
    #[error("check failed: {0}")]
    Failed(String),
}
