//! In-memory commit graph: commits, parent edges and branch HEAD pointers.
//!
//! The graph is a plain value owned by one caller. Nothing is cached between
//! calls; every query re-walks the parent edges.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conflict;
use crate::error::DagError;
use crate::types::{
    BranchName, Commit, CommitHash, Conflict, FacetCut, NewCommit, ROOT_AUTHOR, ROOT_MESSAGE,
};

/// Diamond address recorded on the root commit.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Serializable form of a [`CommitDag`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagSnapshot {
    pub commits: BTreeMap<CommitHash, Commit>,
    pub branches: BTreeMap<BranchName, CommitHash>,
    #[serde(default)]
    pub current_branch: Option<BranchName>,
    #[serde(default)]
    pub merged_into: Vec<BranchName>,
}

#[derive(Debug, Clone, Default)]
pub struct CommitDag {
    commits: HashMap<CommitHash, Commit>,
    branches: BTreeMap<BranchName, CommitHash>,
    current_branch: Option<BranchName>,
    merged_into: BTreeSet<BranchName>,
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl CommitDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the root commit and point `branch` at it.
    pub fn initialize(&mut self, branch: &str) -> Result<CommitHash, DagError> {
        if self.current_branch.is_some() || !self.commits.is_empty() {
            return Err(DagError::AlreadyInitialized);
        }
        let root = NewCommit {
            timestamp: now_millis(),
            author: ROOT_AUTHOR.to_string(),
            message: ROOT_MESSAGE.to_string(),
            diamond_address: ZERO_ADDRESS.to_string(),
            cut: Vec::new(),
            parent_hash: None,
            parent_hashes: None,
            branch: branch.to_string(),
        }
        .seal();
        let hash = self.advance(branch.to_string(), root);
        self.current_branch = Some(branch.to_string());
        debug!(branch, hash = %hash, "initialized commit graph");
        Ok(hash)
    }

    /// Append a commit on the current branch and advance its HEAD.
    pub fn add_commit(
        &mut self,
        message: &str,
        author: &str,
        diamond_address: &str,
        cut: Vec<FacetCut>,
    ) -> Result<CommitHash, DagError> {
        let (branch, parent) = self.current_tip().ok_or(DagError::NoParentCommit)?;
        let commit = NewCommit {
            timestamp: now_millis(),
            author: author.to_string(),
            message: message.to_string(),
            diamond_address: diamond_address.to_string(),
            cut,
            parent_hash: Some(parent),
            parent_hashes: None,
            branch: branch.clone(),
        }
        .seal();
        let hash = self.advance(branch, commit);
        debug!(hash = %hash, "added commit");
        Ok(hash)
    }

    /// Create a branch at `from_commit`, or at the current HEAD when omitted.
    pub fn create_branch(&mut self, name: &str, from_commit: Option<&str>) -> Result<(), DagError> {
        if self.branches.contains_key(name) {
            return Err(DagError::BranchExists(name.to_string()));
        }
        let head = match from_commit {
            Some(hash) if self.commits.contains_key(hash) => hash.to_string(),
            Some(hash) => return Err(DagError::CommitNotFound(hash.to_string())),
            None => self.current_tip().ok_or(DagError::NoParentCommit)?.1,
        };
        debug!(branch = name, head = %head, "created branch");
        self.branches.insert(name.to_string(), head);
        Ok(())
    }

    pub fn switch_branch(&mut self, name: &str) -> Result<(), DagError> {
        if !self.branches.contains_key(name) {
            return Err(DagError::BranchNotFound(name.to_string()));
        }
        self.current_branch = Some(name.to_string());
        Ok(())
    }

    /// Remove a branch pointer. Its commits stay in the graph.
    pub fn delete_branch(&mut self, name: &str) -> Result<(), DagError> {
        if self.current_branch.as_deref() == Some(name) {
            return Err(DagError::CannotDeleteCurrentBranch(name.to_string()));
        }
        if self.branches.remove(name).is_none() {
            return Err(DagError::BranchNotFound(name.to_string()));
        }
        debug!(branch = name, "deleted branch");
        Ok(())
    }

    /// Record a merge of `source` into the current branch.
    ///
    /// Parents are `[HEAD(current), HEAD(source)]`, target first.
    pub fn merge_commit(
        &mut self,
        message: &str,
        author: &str,
        diamond_address: &str,
        cut: Vec<FacetCut>,
        source: &str,
    ) -> Result<CommitHash, DagError> {
        let (target, target_head) = self.current_tip().ok_or(DagError::NoParentCommit)?;
        if self.merged_into.contains(source) {
            return Err(DagError::AlreadyMerged(source.to_string()));
        }
        let source_head = self
            .branches
            .get(source)
            .cloned()
            .ok_or_else(|| DagError::BranchNotFound(source.to_string()))?;
        if source == target {
            return Err(DagError::SelfMerge(source.to_string()));
        }
        let commit = NewCommit {
            timestamp: now_millis(),
            author: author.to_string(),
            message: message.to_string(),
            diamond_address: diamond_address.to_string(),
            cut,
            parent_hash: Some(target_head.clone()),
            parent_hashes: Some(vec![target_head, source_head]),
            branch: target.clone(),
        }
        .seal();
        let hash = self.advance(target, commit);
        self.merged_into.insert(source.to_string());
        debug!(source, hash = %hash, "recorded merge commit");
        Ok(hash)
    }

    /// Commits reachable from the branch HEAD, newest first.
    ///
    /// Both parents of a merge are followed and every commit appears once.
    /// Unknown branches yield an empty history.
    pub fn get_history(&self, branch: &str, limit: Option<usize>) -> Vec<&Commit> {
        match self.branches.get(branch) {
            Some(head) => self.walk(head, &HashSet::new(), limit),
            None => Vec::new(),
        }
    }

    pub fn get_commit(&self, hash: &str) -> Option<&Commit> {
        self.commits.get(hash)
    }

    pub fn get_head(&self, branch: &str) -> Option<&str> {
        self.branches.get(branch).map(String::as_str)
    }

    pub fn get_current_branch(&self) -> Option<&str> {
        self.current_branch.as_deref()
    }

    /// Branch names, sorted.
    pub fn get_branches(&self) -> Vec<BranchName> {
        self.branches.keys().cloned().collect()
    }

    pub fn get_commit_count(&self) -> usize {
        self.commits.len()
    }

    pub fn is_merged(&self, branch: &str) -> bool {
        self.merged_into.contains(branch)
    }

    /// True when `candidate` is reachable from `descendant` through parent
    /// edges. A commit is its own ancestor.
    pub fn is_ancestor(&self, candidate: &str, descendant: &str) -> bool {
        if !self.commits.contains_key(candidate) {
            return false;
        }
        self.distances(descendant).contains_key(candidate)
    }

    /// Best common ancestor of two commits.
    ///
    /// Candidates are common ancestors that no other common ancestor descends
    /// from. Ties go to the smallest total hop count from both inputs, then
    /// the newest timestamp, then the smallest hash.
    pub fn find_common_ancestor(&self, a: &str, b: &str) -> Option<CommitHash> {
        let from_a = self.distances(a);
        let from_b = self.distances(b);
        let common: HashSet<&str> = from_a
            .keys()
            .filter(|h| from_b.contains_key(*h))
            .copied()
            .collect();

        // A common ancestor with a common child is never the best one.
        let mut superseded: HashSet<&str> = HashSet::new();
        for hash in &common {
            for parent in self.commits[*hash].parents() {
                superseded.insert(parent);
            }
        }

        common
            .iter()
            .copied()
            .filter(|h| !superseded.contains(h))
            .min_by(|x, y| {
                let hops_x = from_a[x] + from_b[x];
                let hops_y = from_a[y] + from_b[y];
                hops_x
                    .cmp(&hops_y)
                    .then_with(|| {
                        let tx = self.commits[*x].timestamp();
                        let ty = self.commits[*y].timestamp();
                        ty.cmp(&tx)
                    })
                    .then_with(|| x.cmp(y))
            })
            .map(String::from)
    }

    /// Commits after `from` up to and including `to`, newest first.
    ///
    /// Everything reachable from `from` (including `from`) is excluded.
    pub fn get_commit_range(&self, from: &str, to: &str) -> Vec<&Commit> {
        let exclude: HashSet<&str> = self.distances(from).into_keys().collect();
        self.walk(to, &exclude, None)
    }

    /// Selector-level conflicts between two branches since their merge base.
    ///
    /// `source_action` comes from `branch_a`, `target_action` from `branch_b`.
    pub fn detect_conflicts(&self, branch_a: &str, branch_b: &str) -> Result<Vec<Conflict>, DagError> {
        let head_a = self
            .branches
            .get(branch_a)
            .ok_or_else(|| DagError::BranchNotFound(branch_a.to_string()))?;
        let head_b = self
            .branches
            .get(branch_b)
            .ok_or_else(|| DagError::BranchNotFound(branch_b.to_string()))?;
        let base = self.find_common_ancestor(head_a, head_b);
        Ok(conflict::detect(
            self.cuts_since(base.as_deref(), head_a),
            self.cuts_since(base.as_deref(), head_b),
        ))
    }

    pub fn to_snapshot(&self) -> DagSnapshot {
        DagSnapshot {
            commits: self
                .commits
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            branches: self.branches.clone(),
            current_branch: self.current_branch.clone(),
            merged_into: self.merged_into.iter().cloned().collect(),
        }
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// Commit keys must match their hashes, every branch HEAD must exist and
    /// the current branch must be a known branch. Dangling parents are logged.
    pub fn from_snapshot(snapshot: DagSnapshot) -> Result<Self, DagError> {
        for (key, commit) in &snapshot.commits {
            if key != commit.hash() {
                return Err(DagError::CorruptSnapshot(format!(
                    "commit stored under {key} has hash {}",
                    commit.hash()
                )));
            }
        }
        for (branch, head) in &snapshot.branches {
            if !snapshot.commits.contains_key(head) {
                return Err(DagError::CorruptSnapshot(format!(
                    "branch {branch} points at unknown commit {head}"
                )));
            }
        }
        if let Some(current) = &snapshot.current_branch {
            if !snapshot.branches.contains_key(current) {
                return Err(DagError::CorruptSnapshot(format!(
                    "current branch {current} does not exist"
                )));
            }
        }
        for commit in snapshot.commits.values() {
            for parent in commit.parents() {
                if !snapshot.commits.contains_key(parent) {
                    warn!(commit = commit.hash(), parent, "commit references unknown parent");
                }
            }
        }

        Ok(Self {
            commits: snapshot.commits.into_iter().collect(),
            branches: snapshot.branches,
            current_branch: snapshot.current_branch,
            merged_into: snapshot.merged_into.into_iter().collect(),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_snapshot())
            .expect("DAG snapshot serialization should not fail")
    }

    pub fn from_json(json: &str) -> Result<Self, DagError> {
        let snapshot: DagSnapshot = serde_json::from_str(json)
            .map_err(|e| DagError::CorruptSnapshot(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// Cuts applied after `base` up to `head`, in application order (oldest first).
    fn cuts_since(&self, base: Option<&str>, head: &str) -> Vec<&FacetCut> {
        let mut commits = match base {
            Some(base) => self.get_commit_range(base, head),
            None => self.walk(head, &HashSet::new(), None),
        };
        commits.reverse();
        commits.into_iter().flat_map(|c| c.cut()).collect()
    }

    fn current_tip(&self) -> Option<(BranchName, CommitHash)> {
        let branch = self.current_branch.as_ref()?;
        let head = self.branches.get(branch)?;
        Some((branch.clone(), head.clone()))
    }

    fn advance(&mut self, branch: BranchName, commit: Commit) -> CommitHash {
        let hash = commit.hash().to_string();
        self.commits.entry(hash.clone()).or_insert(commit);
        self.branches.insert(branch, hash.clone());
        hash
    }

    /// Hop distance from `start` to each of its ancestors (BFS).
    fn distances(&self, start: &str) -> HashMap<&str, usize> {
        let mut dist = HashMap::new();
        let Some(head) = self.commits.get(start) else {
            return dist;
        };
        dist.insert(head.hash(), 0);
        let mut queue = VecDeque::from([(head, 0usize)]);
        while let Some((commit, d)) = queue.pop_front() {
            for parent in commit.parents() {
                let Some(parent) = self.commits.get(parent) else {
                    continue;
                };
                if !dist.contains_key(parent.hash()) {
                    dist.insert(parent.hash(), d + 1);
                    queue.push_back((parent, d + 1));
                }
            }
        }
        dist
    }

    /// Date-order walk from `start`: newest timestamp first, ties in discovery
    /// order, and never a parent before any of its children inside the walk.
    /// Commits in `exclude` are neither emitted nor traversed.
    fn walk(&self, start: &str, exclude: &HashSet<&str>, limit: Option<usize>) -> Vec<&Commit> {
        let mut out = Vec::new();
        let Some(head) = self.commits.get(start) else {
            return out;
        };
        if exclude.contains(head.hash()) {
            return out;
        }

        // children inside the walk that are still waiting to be emitted
        let mut pending: HashMap<&str, usize> = HashMap::from([(head.hash(), 0)]);
        let mut stack = vec![head];
        while let Some(commit) = stack.pop() {
            for parent in commit.parents() {
                if exclude.contains(parent) {
                    continue;
                }
                let Some(p) = self.commits.get(parent) else {
                    continue;
                };
                match pending.get_mut(p.hash()) {
                    Some(count) => *count += 1,
                    None => {
                        pending.insert(p.hash(), 1);
                        stack.push(p);
                    }
                }
            }
        }

        let mut heap: BinaryHeap<(i64, Reverse<usize>, &str)> = BinaryHeap::new();
        heap.push((head.timestamp(), Reverse(0), head.hash()));
        let mut seq = 1;

        while let Some((_, _, hash)) = heap.pop() {
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
            let commit = &self.commits[hash];
            out.push(commit);
            for parent in commit.parents() {
                let Some(count) = pending.get_mut(parent) else {
                    continue;
                };
                *count -= 1;
                if *count == 0 {
                    let p = &self.commits[parent];
                    heap.push((p.timestamp(), Reverse(seq), p.hash()));
                    seq += 1;
                }
            }
        }
        out
    }
}
