use thiserror::Error;

/// Structural violations raised by [`crate::dag::CommitDag`].
///
/// These are never retried; the message is meant to be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    #[error("DAG already initialized")]
    AlreadyInitialized,

    #[error("No parent commit found")]
    NoParentCommit,

    #[error("Branch '{0}' already exists")]
    BranchExists(String),

    #[error("Branch '{0}' does not exist")]
    BranchNotFound(String),

    #[error("Cannot delete current branch '{0}'")]
    CannotDeleteCurrentBranch(String),

    #[error("Branch '{0}' has already been merged")]
    AlreadyMerged(String),

    #[error("Cannot merge branch '{0}' into itself")]
    SelfMerge(String),

    #[error("Commit '{0}' not found")]
    CommitNotFound(String),

    #[error("corrupt DAG snapshot: {0}")]
    CorruptSnapshot(String),
}
