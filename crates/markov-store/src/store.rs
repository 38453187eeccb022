//! Per-branch JSON file store under `.markov/branches/`.
//!
//! Every write rewrites a whole branch file after schema validation; a file
//! that fails validation is never written. Reads are lenient: schema issues
//! are logged and the decoded file is still returned. There is no locking
//! here, so concurrent writers to the same branch file race and the last
//! write wins.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use markov_core::{BranchName, Commit, CommitDag, DagSnapshot};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::branch_file::{BranchConfig, BranchFile, CurrentBranchPointer};
use crate::error::{Result, StoreError};
use crate::fs::{FileSystem, LocalFs};
use crate::paths::MarkovPaths;
use crate::schema::{is_valid_branch_name, validate_branch_file};

/// Branch selected when no pointer file exists yet.
pub const DEFAULT_BRANCH: &str = "main";

pub struct BranchFileStore<F = LocalFs> {
    paths: MarkovPaths,
    fs: F,
}

impl BranchFileStore<LocalFs> {
    /// A store rooted at `project_root` on the local disk. No I/O.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_fs(project_root, LocalFs)
    }

    /// Open an existing project. Fails if `.markov/` does not exist.
    pub fn open(project_root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(project_root);
        store.ensure_initialized()?;
        Ok(store)
    }
}

impl<F: FileSystem> BranchFileStore<F> {
    pub fn with_fs(project_root: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            paths: MarkovPaths::discover(project_root),
            fs,
        }
    }

    pub fn paths(&self) -> &MarkovPaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.fs.exists(&self.paths.branches_dir)
    }

    /// Create `.markov/` and `.markov/branches/`, and the current-branch
    /// pointer if it is missing. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        for dir in [&self.paths.markov_dir, &self.paths.branches_dir] {
            self.fs
                .create_dir_all(dir)
                .map_err(|e| StoreError::io(dir, e))?;
        }
        if !self.fs.exists(&self.paths.config_json) {
            self.write_pointer(DEFAULT_BRANCH)?;
        }
        debug!(root = %self.paths.root.display(), "initialized markov project");
        Ok(())
    }

    /// Whether a branch file exists for `name`.
    pub fn exists(&self, name: &str) -> bool {
        is_valid_branch_name(name) && self.fs.exists(&self.paths.branch_file(name))
    }

    /// Write a new, empty branch file.
    pub fn create_branch(&self, name: &str, config: BranchConfig) -> Result<BranchFile> {
        self.ensure_initialized()?;
        if self.exists(name) {
            return Err(StoreError::BranchExists(name.to_string()));
        }
        let file = BranchFile::new(name, config);
        self.write_branch_file(&file)?;
        debug!(branch = name, "created branch file");
        Ok(file)
    }

    /// Read a branch file. Schema issues are logged, not returned.
    pub fn get_branch_file(&self, name: &str) -> Result<Option<BranchFile>> {
        if !self.exists(name) {
            return Ok(None);
        }
        let path = self.paths.branch_file(name);
        let value: serde_json::Value = self.read_json(&path)?;
        for issue in validate_branch_file(&value, name) {
            warn!(branch = name, %issue, "branch file does not match schema");
        }
        match serde_json::from_value::<BranchFile>(value.clone()) {
            Ok(file) => Ok(Some(file)),
            Err(source) => match BranchFile::from_value_lenient(&value, name) {
                Some(file) => {
                    warn!(branch = name, error = %source, "branch file decoded leniently");
                    Ok(Some(file))
                }
                None => Err(StoreError::Parse { path, source }),
            },
        }
    }

    pub fn get_all_branch_files(&self) -> Result<Vec<BranchFile>> {
        let mut files = Vec::new();
        for name in self.list_branches()? {
            if let Some(file) = self.get_branch_file(&name)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    /// Names of all branch files, sorted.
    pub fn list_branches(&self) -> Result<Vec<BranchName>> {
        self.ensure_initialized()?;
        let dir = &self.paths.branches_dir;
        let entries = self.fs.list_dir(dir).map_err(|e| StoreError::io(dir, e))?;
        let mut names: Vec<BranchName> = entries
            .iter()
            .filter_map(|p| MarkovPaths::branch_name_of(p))
            .filter(|n| is_valid_branch_name(n))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Remove a branch file. The active branch cannot be deleted.
    ///
    /// Commits of the deleted file that another branch still reaches (through
    /// a merge parent or its fork point) are copied into that branch's file
    /// first, so no surviving branch is left with a dangling parent.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        if self.get_current_branch_name()? == name {
            return Err(StoreError::CannotDeleteCurrentBranch(name.to_string()));
        }
        let doomed = self.require_branch_file(name)?;
        if !doomed.commits.is_empty() {
            for mut file in self.get_all_branch_files()? {
                if file.name == name {
                    continue;
                }
                let adopted = adopt_commits(&mut file, &doomed.commits);
                if adopted > 0 {
                    debug!(from = name, into = %file.name, adopted, "preserving commits of deleted branch");
                    self.write_branch_file(&file)?;
                }
            }
        }
        let path = self.paths.branch_file(name);
        self.fs
            .remove_file(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        debug!(branch = name, "deleted branch file");
        Ok(())
    }

    /// Validate and overwrite an existing branch file.
    pub fn update_branch_file(&self, file: &BranchFile) -> Result<()> {
        if !self.exists(&file.name) {
            return Err(StoreError::BranchNotFound(file.name.clone()));
        }
        self.write_branch_file(file)
    }

    /// Append a commit to a branch file (whole-file read-modify-write).
    pub fn add_commit(&self, branch: &str, commit: Commit) -> Result<()> {
        let mut file = self.require_branch_file(branch)?;
        debug!(branch, hash = commit.hash(), "appending commit");
        file.commits.push(commit);
        self.write_branch_file(&file)
    }

    /// Append a merge commit to `target` and mark `source` as merged into it.
    ///
    /// The source is marked first; if the append then fails the source stays
    /// marked, which only blocks a repeat of a merge that was attempted.
    pub fn add_merge_commit(&self, target: &str, source: &str, commit: Commit) -> Result<()> {
        let mut target_file = self.require_branch_file(target)?;
        let mut source_file = self.require_branch_file(source)?;
        source_file.config.merged_into = Some(target.to_string());
        self.write_branch_file(&source_file)?;
        debug!(target, source, hash = commit.hash(), "recording merge commit");
        target_file.commits.push(commit);
        self.write_branch_file(&target_file)
    }

    /// Find a commit by hash in any branch file.
    pub fn get_commit(&self, hash: &str) -> Result<Option<Commit>> {
        for file in self.get_all_branch_files()? {
            if let Some(commit) = file.commits.into_iter().find(|c| c.hash() == hash) {
                return Ok(Some(commit));
            }
        }
        Ok(None)
    }

    /// Commits recorded on a branch, newest first, optionally the newest `limit`.
    pub fn get_commits_for_branch(&self, name: &str, limit: Option<usize>) -> Result<Vec<Commit>> {
        let file = self.require_branch_file(name)?;
        let mut commits = file.commits;
        commits.reverse();
        if let Some(n) = limit {
            commits.truncate(n);
        }
        Ok(commits)
    }

    /// Active branch from `.markov/config.json`, or [`DEFAULT_BRANCH`] when
    /// the pointer has not been written yet.
    pub fn get_current_branch_name(&self) -> Result<BranchName> {
        if !self.fs.exists(&self.paths.config_json) {
            return Ok(DEFAULT_BRANCH.to_string());
        }
        let pointer: CurrentBranchPointer = self.read_json(&self.paths.config_json)?;
        Ok(pointer.current_branch)
    }

    /// Point `.markov/config.json` at `name`, which must have a branch file.
    pub fn set_current_branch_name(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(StoreError::BranchNotFound(name.to_string()));
        }
        self.write_pointer(name)
    }

    pub fn get_branch_config(&self, name: &str) -> Result<Option<BranchConfig>> {
        Ok(self.get_branch_file(name)?.map(|f| f.config))
    }

    /// Edit a branch's config in place. The result is validated before it is
    /// written.
    pub fn update_branch_config(
        &self,
        name: &str,
        update: impl FnOnce(&mut BranchConfig),
    ) -> Result<BranchConfig> {
        let mut file = self.require_branch_file(name)?;
        update(&mut file.config);
        self.write_branch_file(&file)?;
        Ok(file.config)
    }

    /// Rebuild the commit graph from every branch file.
    ///
    /// Commits are merged by hash. A branch's HEAD is its last commit, or
    /// the commit it was created from while it has none. Merged branches are
    /// the ones whose config records `mergedInto`.
    pub fn load_dag(&self) -> Result<CommitDag> {
        let files = self.get_all_branch_files()?;
        let mut snapshot = DagSnapshot::default();

        for file in &files {
            for commit in &file.commits {
                if !commit.verify_hash() {
                    warn!(branch = %file.name, hash = commit.hash(), "commit hash does not match its content");
                }
                snapshot
                    .commits
                    .entry(commit.hash().to_string())
                    .or_insert_with(|| commit.clone());
            }
        }

        for file in &files {
            let head = file
                .last_commit()
                .map(|c| c.hash().to_string())
                .or_else(|| file.config.created_from_commit.clone());
            match head {
                Some(head) if snapshot.commits.contains_key(&head) => {
                    snapshot.branches.insert(file.name.clone(), head);
                }
                Some(head) => {
                    warn!(branch = %file.name, head = %head, "branch head not found, skipping branch")
                }
                None => warn!(branch = %file.name, "branch has no commits, skipping branch"),
            }
        }

        let merged: BTreeSet<BranchName> = files
            .iter()
            .filter(|f| f.config.merged_into.is_some())
            .map(|f| f.name.clone())
            .collect();
        snapshot.merged_into = merged.into_iter().collect();

        let current = self.get_current_branch_name()?;
        if snapshot.branches.contains_key(&current) {
            snapshot.current_branch = Some(current);
        } else if !snapshot.branches.is_empty() {
            warn!(branch = %current, "current branch has no commits in the store");
        }

        Ok(CommitDag::from_snapshot(snapshot)?)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(StoreError::NotInitialized(self.paths.root.clone()));
        }
        Ok(())
    }

    fn require_branch_file(&self, name: &str) -> Result<BranchFile> {
        self.get_branch_file(name)?
            .ok_or_else(|| StoreError::BranchNotFound(name.to_string()))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &std::path::Path) -> Result<T> {
        let text = self
            .fs
            .read_to_string(path)
            .map_err(|e| StoreError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate, then replace the branch file in one write.
    fn write_branch_file(&self, file: &BranchFile) -> Result<()> {
        let value = serde_json::to_value(file)?;
        let issues = validate_branch_file(&value, &file.name);
        if !issues.is_empty() {
            return Err(StoreError::Validation {
                name: file.name.clone(),
                issues,
            });
        }
        let data = serde_json::to_string_pretty(file)?;
        let path = self.paths.branch_file(&file.name);
        self.fs
            .write(&path, data.as_bytes())
            .map_err(|e| StoreError::io(&path, e))
    }

    fn write_pointer(&self, name: &str) -> Result<()> {
        let pointer = CurrentBranchPointer {
            current_branch: name.to_string(),
        };
        let data = serde_json::to_string_pretty(&pointer)?;
        let path = &self.paths.config_json;
        self.fs
            .write(path, data.as_bytes())
            .map_err(|e| StoreError::io(path, e))
    }
}

/// Copy into `file` the commits of `doomed` that `file` reaches but does not
/// store, keeping `doomed`'s order. They are inserted before the first commit
/// of `file` that references one of them, so the file stays oldest-first and
/// its last commit (its HEAD) is unchanged. Returns how many were copied.
fn adopt_commits(file: &mut BranchFile, doomed: &[Commit]) -> usize {
    let by_hash: HashMap<&str, &Commit> = doomed.iter().map(|c| (c.hash(), c)).collect();
    let stored: HashSet<&str> = file.commits.iter().map(|c| c.hash()).collect();

    let mut stack: Vec<&str> = file
        .commits
        .iter()
        .flat_map(|c| c.parents())
        .chain(file.config.created_from_commit.as_deref())
        .collect();
    let mut needed: HashSet<&str> = HashSet::new();
    while let Some(hash) = stack.pop() {
        if stored.contains(hash) || needed.contains(hash) {
            continue;
        }
        if let Some(commit) = by_hash.get(hash) {
            needed.insert(commit.hash());
            stack.extend(commit.parents());
        }
    }
    if needed.is_empty() {
        return 0;
    }

    let adopted: Vec<Commit> = doomed
        .iter()
        .filter(|c| needed.contains(c.hash()))
        .cloned()
        .collect();
    let at = file
        .commits
        .iter()
        .position(|c| c.parents().iter().any(|p| needed.contains(p)))
        .unwrap_or(file.commits.len());
    let count = adopted.len();
    file.commits.splice(at..at, adopted);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use markov_core::{FacetCut, FacetCutAction};
    use std::path::Path;

    const DIAMOND: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
    const FACET: &str = "0x1111111111111111111111111111111111111111";

    fn config(name: &str) -> BranchConfig {
        BranchConfig {
            name: name.to_string(),
            chain: "sepolia".to_string(),
            chain_id: Some(11155111),
            rpc_url: "https://rpc.sepolia.org".to_string(),
            diamond_address: DIAMOND.to_string(),
            explorer_api_key: None,
            explorer_url: None,
            created_at: 1_700_000_000_000,
            created_from: None,
            created_from_commit: None,
            merged_into: None,
        }
    }

    fn store() -> BranchFileStore<MemoryFs> {
        let store = BranchFileStore::with_fs("/project", MemoryFs::new());
        store.initialize().unwrap();
        store
    }

    /// Store with `main` holding the root commit and `dag` tracking it.
    fn seeded() -> (BranchFileStore<MemoryFs>, CommitDag) {
        let store = store();
        store.create_branch("main", config("main")).unwrap();
        let mut dag = CommitDag::new();
        let root = dag.initialize("main").unwrap();
        store
            .add_commit("main", dag.get_commit(&root).unwrap().clone())
            .unwrap();
        (store, dag)
    }

    fn commit_on(store: &BranchFileStore<MemoryFs>, dag: &mut CommitDag, msg: &str) -> String {
        let cut = vec![FacetCut::new(FACET, FacetCutAction::Add, ["0x11111111"])];
        let hash = dag.add_commit(msg, "dev", DIAMOND, cut).unwrap();
        let branch = dag.get_current_branch().unwrap().to_string();
        store
            .add_commit(&branch, dag.get_commit(&hash).unwrap().clone())
            .unwrap();
        hash
    }

    #[test]
    fn initialize_writes_pointer_once() {
        let store = store();
        assert!(store.is_initialized());
        assert_eq!(store.get_current_branch_name().unwrap(), "main");
        store.create_branch("dev", config("dev")).unwrap();
        store.set_current_branch_name("dev").unwrap();
        store.initialize().unwrap();
        assert_eq!(store.get_current_branch_name().unwrap(), "dev");
    }

    #[test]
    fn uninitialized_store_rejects_branch_ops() {
        let store = BranchFileStore::with_fs("/nowhere", MemoryFs::new());
        assert!(!store.is_initialized());
        assert!(matches!(
            store.create_branch("main", config("main")),
            Err(StoreError::NotInitialized(_))
        ));
        assert!(matches!(store.list_branches(), Err(StoreError::NotInitialized(_))));
    }

    #[test]
    fn create_and_read_branch() {
        let store = store();
        let created = store.create_branch("main", config("main")).unwrap();
        assert!(created.commits.is_empty());
        assert!(store.exists("main"));
        assert_eq!(store.get_branch_file("main").unwrap(), Some(created));
        assert_eq!(store.get_branch_file("ghost").unwrap(), None);
        assert!(matches!(
            store.create_branch("main", config("main")),
            Err(StoreError::BranchExists(_))
        ));
    }

    #[test]
    fn invalid_config_is_never_written() {
        let store = store();
        let mut bad = config("main");
        bad.diamond_address = "0x1234".into();
        let err = store.create_branch("main", bad).unwrap_err();
        match err {
            StoreError::Validation { issues, .. } => {
                assert_eq!(issues[0].path, "/config/diamondAddress")
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(!store.exists("main"));
    }

    #[test]
    fn invalid_branch_name_is_never_written() {
        let store = store();
        assert!(matches!(
            store.create_branch("../escape", config("x")),
            Err(StoreError::Validation { .. })
        ));
        assert!(store.list_branches().unwrap().is_empty());
    }

    #[test]
    fn lenient_read_returns_nonconforming_file() {
        let fs = MemoryFs::new();
        let path = Path::new("/project/.markov/branches/legacy.json");
        fs.write(
            path,
            br#"{"name":"legacy","config":{"name":"legacy","chain":"local","rpcUrl":"http://localhost:8545","diamondAddress":"0xnotanaddress","createdAt":1},"commits":[]}"#,
        )
        .unwrap();
        let store = BranchFileStore::with_fs("/project", fs);
        let file = store.get_branch_file("legacy").unwrap().unwrap();
        assert_eq!(file.config.diamond_address, "0xnotanaddress");

        // writing it back is refused
        assert!(matches!(
            store.update_branch_file(&file),
            Err(StoreError::Validation { .. })
        ));
    }

    #[test]
    fn undecodable_file_is_a_parse_error() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/project/.markov/branches/broken.json"), b"{ not json")
            .unwrap();
        let store = BranchFileStore::with_fs("/project", fs);
        assert!(matches!(
            store.get_branch_file("broken"),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn file_with_undecodable_values_is_still_read() {
        let fs = MemoryFs::new();
        fs.write(
            Path::new("/project/.markov/branches/legacy.json"),
            br#"{"name":"legacy",
                "config":{"name":"legacy","chain":"local","chainId":"eleven",
                          "diamondAddress":"0xabcdefabcdefabcdefabcdefabcdefabcdefabcd","createdAt":1},
                "commits":[
                  {"hash":"aaaaaaaaaaaaaaaa","timestamp":1,"author":"a","message":"kept",
                   "diamondAddress":"0x0000000000000000000000000000000000000000",
                   "branch":"legacy","cut":[]},
                  {"hash":"bbbbbbbbbbbbbbbb","timestamp":2,"author":"a","message":"dropped",
                   "diamondAddress":"0x0000000000000000000000000000000000000000","branch":"legacy",
                   "cut":[{"facetAddress":"0x0000000000000000000000000000000000000000",
                           "action":3,"functionSelectors":[]}]}
                ]}"#,
        )
        .unwrap();
        fs.write(
            Path::new("/project/.markov/config.json"),
            br#"{"currentBranch":"legacy"}"#,
        )
        .unwrap();
        let store = BranchFileStore::with_fs("/project", fs);

        let file = store.get_branch_file("legacy").unwrap().unwrap();
        assert_eq!(file.config.chain_id, None);
        assert_eq!(file.config.rpc_url, "");
        assert_eq!(file.commits.len(), 1);
        assert_eq!(store.get_all_branch_files().unwrap().len(), 1);

        let dag = store.load_dag().unwrap();
        assert_eq!(dag.get_head("legacy"), Some("aaaaaaaaaaaaaaaa"));
        assert_eq!(dag.get_current_branch(), Some("legacy"));
    }

    #[test]
    fn list_and_delete_branches() {
        let store = store();
        for name in ["main", "zeta", "alpha"] {
            store.create_branch(name, config(name)).unwrap();
        }
        assert_eq!(store.list_branches().unwrap(), vec!["alpha", "main", "zeta"]);
        assert_eq!(store.get_all_branch_files().unwrap().len(), 3);

        assert!(matches!(
            store.delete_branch("main"),
            Err(StoreError::CannotDeleteCurrentBranch(_))
        ));
        store.delete_branch("zeta").unwrap();
        assert_eq!(store.list_branches().unwrap(), vec!["alpha", "main"]);
        assert!(matches!(
            store.delete_branch("zeta"),
            Err(StoreError::BranchNotFound(_))
        ));
    }

    #[test]
    fn commits_append_and_read_newest_first() {
        let (store, mut dag) = seeded();
        let h1 = commit_on(&store, &mut dag, "c1");
        let h2 = commit_on(&store, &mut dag, "c2");

        let commits = store.get_commits_for_branch("main", None).unwrap();
        let hashes: Vec<&str> = commits.iter().map(|c| c.hash()).collect();
        assert_eq!(hashes.len(), 3);
        assert_eq!(&hashes[..2], &[h2.as_str(), h1.as_str()]);

        let newest = store.get_commits_for_branch("main", Some(1)).unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].hash(), h2);

        assert_eq!(store.get_commit(&h1).unwrap().unwrap().message(), "c1");
        assert!(store.get_commit("ffffffffffffffff").unwrap().is_none());
        assert!(matches!(
            store.add_commit("ghost", commits[0].clone()),
            Err(StoreError::BranchNotFound(_))
        ));
    }

    #[test]
    fn commit_with_bad_selector_is_rejected() {
        let (store, mut dag) = seeded();
        let cut = vec![FacetCut::new(FACET, FacetCutAction::Add, ["transfer()"])];
        let hash = dag.add_commit("bad", "dev", DIAMOND, cut).unwrap();
        let err = store
            .add_commit("main", dag.get_commit(&hash).unwrap().clone())
            .unwrap_err();
        assert!(err.to_string().contains("functionSelectors"));
        assert_eq!(store.get_commits_for_branch("main", None).unwrap().len(), 1);
    }

    #[test]
    fn current_branch_pointer_requires_branch_file() {
        let store = store();
        assert!(matches!(
            store.set_current_branch_name("ghost"),
            Err(StoreError::BranchNotFound(_))
        ));
    }

    #[test]
    fn branch_config_accessors() {
        let store = store();
        store.create_branch("main", config("main")).unwrap();
        let updated = store
            .update_branch_config("main", |cfg| {
                cfg.explorer_url = Some("https://sepolia.etherscan.io".into())
            })
            .unwrap();
        assert_eq!(
            store.get_branch_config("main").unwrap(),
            Some(updated.clone())
        );
        assert_eq!(
            updated.explorer_url.as_deref(),
            Some("https://sepolia.etherscan.io")
        );

        let err = store
            .update_branch_config("main", |cfg| cfg.diamond_address = "nope".into())
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(store.get_branch_config("main").unwrap(), Some(updated));
        assert_eq!(store.get_branch_config("ghost").unwrap(), None);
    }

    #[test]
    fn load_dag_reconstructs_branches_and_merges() {
        let (store, mut dag) = seeded();
        commit_on(&store, &mut dag, "c1");

        dag.create_branch("feature", None).unwrap();
        let mut feature = config("feature");
        feature.created_from = Some("main".into());
        feature.created_from_commit = dag.get_head("feature").map(String::from);
        store.create_branch("feature", feature).unwrap();

        dag.switch_branch("feature").unwrap();
        store.set_current_branch_name("feature").unwrap();
        commit_on(&store, &mut dag, "f1");

        dag.switch_branch("main").unwrap();
        store.set_current_branch_name("main").unwrap();
        let merge = dag
            .merge_commit("Merge feature", "dev", DIAMOND, vec![], "feature")
            .unwrap();
        store
            .add_merge_commit("main", "feature", dag.get_commit(&merge).unwrap().clone())
            .unwrap();

        let loaded = store.load_dag().unwrap();
        assert_eq!(loaded.get_commit_count(), dag.get_commit_count());
        assert_eq!(loaded.get_branches(), dag.get_branches());
        assert_eq!(loaded.get_current_branch(), Some("main"));
        assert_eq!(loaded.get_head("main"), Some(merge.as_str()));
        assert_eq!(loaded.get_head("feature"), dag.get_head("feature"));
        assert!(loaded.is_merged("feature"));
    }

    #[test]
    fn merging_an_empty_branch_survives_reload() {
        let (store, mut dag) = seeded();
        dag.create_branch("feature", None).unwrap();
        let mut feature = config("feature");
        feature.created_from_commit = dag.get_head("feature").map(String::from);
        store.create_branch("feature", feature).unwrap();
        commit_on(&store, &mut dag, "c1");

        let merge = dag
            .merge_commit("Merge feature", "dev", DIAMOND, vec![], "feature")
            .unwrap();
        store
            .add_merge_commit("main", "feature", dag.get_commit(&merge).unwrap().clone())
            .unwrap();

        let mut loaded = store.load_dag().unwrap();
        assert!(loaded.is_merged("feature"));
        assert!(!loaded.is_merged("main"));
        let err = loaded
            .merge_commit("again", "dev", DIAMOND, vec![], "feature")
            .unwrap_err();
        assert!(err.to_string().contains("already been merged"));
    }

    #[test]
    fn deleting_a_merged_branch_keeps_target_history() {
        let (store, mut dag) = seeded();
        dag.create_branch("feature", None).unwrap();
        let mut feature = config("feature");
        feature.created_from_commit = dag.get_head("feature").map(String::from);
        store.create_branch("feature", feature).unwrap();
        dag.switch_branch("feature").unwrap();
        store.set_current_branch_name("feature").unwrap();
        let f1 = commit_on(&store, &mut dag, "f1");

        dag.switch_branch("main").unwrap();
        store.set_current_branch_name("main").unwrap();
        let merge = dag
            .merge_commit("Merge feature", "dev", DIAMOND, vec![], "feature")
            .unwrap();
        store
            .add_merge_commit("main", "feature", dag.get_commit(&merge).unwrap().clone())
            .unwrap();
        assert_eq!(store.load_dag().unwrap().get_history("main", None).len(), 3);

        store.delete_branch("feature").unwrap();

        let main = store.get_branch_file("main").unwrap().unwrap();
        let order: Vec<&str> = main.commits.iter().map(|c| c.hash()).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(order[1], f1);
        assert_eq!(main.last_commit().unwrap().hash(), merge);

        let loaded = store.load_dag().unwrap();
        assert_eq!(loaded.get_head("main"), Some(merge.as_str()));
        assert_eq!(loaded.get_history("main", None).len(), 3);
        assert_eq!(loaded.get_branches(), vec!["main"]);
    }

    #[test]
    fn deleting_a_fork_source_keeps_the_fork_head() {
        let (store, mut dag) = seeded();
        dag.create_branch("scratch", None).unwrap();
        let mut scratch = config("scratch");
        scratch.created_from_commit = dag.get_head("scratch").map(String::from);
        store.create_branch("scratch", scratch).unwrap();
        dag.switch_branch("scratch").unwrap();
        let s1 = commit_on(&store, &mut dag, "s1");

        dag.create_branch("empty-fork", Some(&s1)).unwrap();
        let mut empty = config("empty-fork");
        empty.created_from_commit = Some(s1.clone());
        store.create_branch("empty-fork", empty).unwrap();

        dag.create_branch("fork", Some(&s1)).unwrap();
        let mut fork = config("fork");
        fork.created_from_commit = Some(s1.clone());
        store.create_branch("fork", fork).unwrap();
        dag.switch_branch("fork").unwrap();
        let f1 = commit_on(&store, &mut dag, "f1");

        store.delete_branch("scratch").unwrap();

        let loaded = store.load_dag().unwrap();
        assert_eq!(loaded.get_head("empty-fork"), Some(s1.as_str()));
        assert_eq!(loaded.get_head("fork"), Some(f1.as_str()));
        assert_eq!(loaded.get_history("fork", None).len(), 3);

        let fork = store.get_branch_file("fork").unwrap().unwrap();
        let order: Vec<&str> = fork.commits.iter().map(|c| c.hash()).collect();
        assert_eq!(order, vec![s1.as_str(), f1.as_str()]);
        // main never reached scratch
        assert_eq!(store.get_branch_file("main").unwrap().unwrap().commits.len(), 1);
    }

    #[test]
    fn empty_branch_head_is_its_source_commit() {
        let (store, dag) = seeded();
        let root = dag.get_head("main").unwrap().to_string();
        let mut cfg = config("feature");
        cfg.created_from_commit = Some(root.clone());
        store.create_branch("feature", cfg).unwrap();
        let loaded = store.load_dag().unwrap();
        assert_eq!(loaded.get_head("feature"), Some(root.as_str()));
    }
}
