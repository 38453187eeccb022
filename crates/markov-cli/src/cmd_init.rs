use std::path::Path;

use anyhow::Context;
use markov_core::{now_millis, CommitDag};
use markov_store::{BranchConfig, BranchFileStore, WorkspaceLock, DEFAULT_BRANCH};

pub struct InitParams<'a> {
    pub repo_root: &'a Path,
    pub chain: &'a str,
    pub chain_id: Option<u64>,
    pub rpc_url: &'a str,
    pub diamond: &'a str,
}

pub fn execute(params: &InitParams<'_>) -> anyhow::Result<()> {
    let store = BranchFileStore::new(params.repo_root);
    if store.is_initialized() && store.exists(DEFAULT_BRANCH) {
        println!(
            "Already initialized: {}",
            store.paths().markov_dir.display()
        );
        return Ok(());
    }

    store.initialize()?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    let config = BranchConfig {
        name: DEFAULT_BRANCH.to_string(),
        chain: params.chain.to_string(),
        chain_id: params.chain_id,
        rpc_url: params.rpc_url.to_string(),
        diamond_address: params.diamond.to_string(),
        explorer_api_key: None,
        explorer_url: None,
        created_at: now_millis(),
        created_from: None,
        created_from_commit: None,
        merged_into: None,
    };
    store
        .create_branch(DEFAULT_BRANCH, config)
        .context("cannot create main branch")?;

    let mut dag = CommitDag::new();
    let root = dag.initialize(DEFAULT_BRANCH)?;
    let commit = dag
        .get_commit(&root)
        .cloned()
        .context("root commit missing after initialize")?;
    store.add_commit(DEFAULT_BRANCH, commit)?;

    println!("Initialized {}", store.paths().markov_dir.display());
    println!("  HEAD: {DEFAULT_BRANCH} @ {root}");
    println!("  chain: {}", params.chain);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(root: &Path) -> InitParams<'_> {
        InitParams {
            repo_root: root,
            chain: "anvil",
            chain_id: Some(31337),
            rpc_url: "http://127.0.0.1:8545",
            diamond: markov_core::dag::ZERO_ADDRESS,
        }
    }

    #[test]
    fn init_writes_main_with_root_commit() {
        let tmp = tempfile::tempdir().unwrap();
        execute(&params(tmp.path())).unwrap();

        let store = BranchFileStore::open(tmp.path()).unwrap();
        let main = store.get_branch_file("main").unwrap().unwrap();
        assert_eq!(main.commits.len(), 1);
        assert_eq!(main.commits[0].message(), markov_core::ROOT_MESSAGE);
        assert_eq!(main.config.chain_id, Some(31337));
        assert_eq!(store.get_current_branch_name().unwrap(), "main");
    }

    #[test]
    fn init_twice_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        execute(&params(tmp.path())).unwrap();
        execute(&params(tmp.path())).unwrap();
        let store = BranchFileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get_commits_for_branch("main", None).unwrap().len(), 1);
    }

    #[test]
    fn init_rejects_bad_diamond() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = params(tmp.path());
        p.diamond = "0x1234";
        assert!(execute(&p).is_err());
    }
}
