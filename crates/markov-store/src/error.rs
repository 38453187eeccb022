use std::path::PathBuf;

use markov_core::DagError;
use thiserror::Error;

use crate::schema::SchemaIssue;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not a markov project ({0}/.markov not found). Run `markov init` first.")]
    NotInitialized(PathBuf),

    #[error("Branch '{0}' already exists")]
    BranchExists(String),

    #[error("Branch '{0}' does not exist")]
    BranchNotFound(String),

    #[error("Cannot delete current branch '{0}'")]
    CannotDeleteCurrentBranch(String),

    #[error("branch file '{name}' failed schema validation: {}", join_issues(.issues))]
    Validation {
        name: String,
        issues: Vec<SchemaIssue>,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dag(#[from] DagError),
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
