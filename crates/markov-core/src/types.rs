use serde::{Deserialize, Serialize};

use crate::hash::{commit_hash, CommitFields};

/// Commit hash: first 16 hex characters of a SHA-256 digest.
pub type CommitHash = String;

/// Branch name (e.g. "main", "feature-x")
pub type BranchName = String;

/// 4-byte function selector, `0x` + 8 hex characters.
pub type Selector = String;

/// Message used for the root commit of every DAG.
pub const ROOT_MESSAGE: &str = "Initialize Diamond project";

/// Author recorded on the root commit.
pub const ROOT_AUTHOR: &str = "system";

/// Facet cut action. Serialized as its integer discriminant, matching the
/// `IDiamondCut.FacetCutAction` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FacetCutAction {
    Add = 0,
    Replace = 1,
    Remove = 2,
}

impl FacetCutAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetCutAction::Add => "Add",
            FacetCutAction::Replace => "Replace",
            FacetCutAction::Remove => "Remove",
        }
    }
}

impl From<FacetCutAction> for u8 {
    fn from(action: FacetCutAction) -> Self {
        action as u8
    }
}

impl TryFrom<u8> for FacetCutAction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FacetCutAction::Add),
            1 => Ok(FacetCutAction::Replace),
            2 => Ok(FacetCutAction::Remove),
            other => Err(format!("invalid facet cut action {other}, expected 0, 1 or 2")),
        }
    }
}

impl std::fmt::Display for FacetCutAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upgrade operation on one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCut {
    pub facet_address: String,
    pub action: FacetCutAction,
    pub function_selectors: Vec<Selector>,
}

impl FacetCut {
    pub fn new(
        facet_address: impl Into<String>,
        action: FacetCutAction,
        selectors: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            facet_address: facet_address.into(),
            action,
            function_selectors: selectors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Fields of a commit before its hash is known.
#[derive(Debug, Clone)]
pub struct NewCommit {
    pub timestamp: i64,
    pub author: String,
    pub message: String,
    pub diamond_address: String,
    pub cut: Vec<FacetCut>,
    pub parent_hash: Option<CommitHash>,
    pub parent_hashes: Option<Vec<CommitHash>>,
    pub branch: BranchName,
}

impl NewCommit {
    fn fields(&self) -> CommitFields<'_> {
        CommitFields {
            timestamp: self.timestamp,
            author: &self.author,
            message: &self.message,
            diamond_address: &self.diamond_address,
            cut: &self.cut,
            parent_hash: self.parent_hash.as_deref(),
            branch: &self.branch,
            parent_hashes: self.parent_hashes.as_deref(),
        }
    }

    /// Hash the fields and freeze them into an immutable [`Commit`].
    pub fn seal(self) -> Commit {
        let hash = commit_hash(&self.fields());
        Commit {
            hash,
            timestamp: self.timestamp,
            author: self.author,
            message: self.message,
            diamond_address: self.diamond_address,
            cut: self.cut,
            parent_hash: self.parent_hash,
            parent_hashes: self.parent_hashes,
            branch: self.branch,
        }
    }
}

/// An immutable, content-hashed record of one set of facet cuts.
///
/// The only way to build one is [`NewCommit::seal`] (or deserialization),
/// so parents can never be rewired after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    hash: CommitHash,
    timestamp: i64,
    author: String,
    message: String,
    diamond_address: String,
    cut: Vec<FacetCut>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_hash: Option<CommitHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_hashes: Option<Vec<CommitHash>>,
    branch: BranchName,
}

impl Commit {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diamond_address(&self) -> &str {
        &self.diamond_address
    }

    pub fn cut(&self) -> &[FacetCut] {
        &self.cut
    }

    pub fn parent_hash(&self) -> Option<&str> {
        self.parent_hash.as_deref()
    }

    pub fn parent_hashes(&self) -> Option<&[CommitHash]> {
        self.parent_hashes.as_deref()
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn is_merge(&self) -> bool {
        self.parent_hashes.as_ref().is_some_and(|p| p.len() >= 2)
    }

    /// All parent hashes, first parent first, without duplicates.
    pub fn parents(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(hashes) = &self.parent_hashes {
            for h in hashes {
                if !out.contains(&h.as_str()) {
                    out.push(h);
                }
            }
        }
        if let Some(p) = &self.parent_hash {
            if !out.contains(&p.as_str()) {
                out.insert(0, p);
            }
        }
        out
    }

    /// Recompute the content hash and compare it with the stored one.
    pub fn verify_hash(&self) -> bool {
        let fields = CommitFields {
            timestamp: self.timestamp,
            author: &self.author,
            message: &self.message,
            diamond_address: &self.diamond_address,
            cut: &self.cut,
            parent_hash: self.parent_hash.as_deref(),
            branch: &self.branch,
            parent_hashes: self.parent_hashes.as_deref(),
        };
        commit_hash(&fields) == self.hash
    }
}

/// A selector touched differently by two branches since their merge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub selector: Selector,
    pub source_action: FacetCutAction,
    pub target_action: FacetCutAction,
}
