use std::path::Path;

use anyhow::Context;
use markov_core::now_millis;
use markov_store::schema::is_valid_branch_name;
use markov_store::{BranchConfig, BranchFileStore, WorkspaceLock};

fn validate_branch_name(name: &str) -> anyhow::Result<()> {
    if !is_valid_branch_name(name) {
        anyhow::bail!("invalid branch name '{name}': only [A-Za-z0-9_-] allowed");
    }
    Ok(())
}

/// `markov branch create <name> [--from <commit>]`
///
/// The new branch copies the deployment config of the branch it forks from.
pub fn create(repo_root: &Path, name: &str, from: Option<&str>) -> anyhow::Result<()> {
    validate_branch_name(name)?;

    let store = BranchFileStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    let mut dag = store.load_dag()?;
    dag.create_branch(name, from)?;
    let head = dag
        .get_head(name)
        .context("new branch has no HEAD")?
        .to_string();
    let origin = dag
        .get_commit(&head)
        .map(|c| c.branch().to_string())
        .context("branch point not found")?;

    let current = store.get_current_branch_name()?;
    let base = match store.get_branch_config(&origin)? {
        Some(config) => config,
        None => store
            .get_branch_config(&current)?
            .with_context(|| format!("no config for branch '{current}'"))?,
    };
    let config = BranchConfig {
        name: name.to_string(),
        created_at: now_millis(),
        created_from: Some(origin.clone()),
        created_from_commit: Some(head.clone()),
        merged_into: None,
        ..base
    };
    store.create_branch(name, config)?;

    println!("Created branch {name} from {origin} at {head}");
    Ok(())
}

/// `markov branch list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let dag = store.load_dag()?;
    let current = store.get_current_branch_name()?;

    for name in store.list_branches()? {
        let marker = if name == current { "*" } else { " " };
        let head = dag.get_head(&name).unwrap_or("-");
        let merged = if dag.is_merged(&name) { " (merged)" } else { "" };
        println!("{marker} {name:<20} {head}{merged}");
    }
    Ok(())
}

/// `markov branch delete <name>`
///
/// Commits another branch still reaches are copied into that branch's file
/// before the file is removed.
pub fn delete(repo_root: &Path, name: &str) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    store.delete_branch(name)?;
    println!("Deleted branch {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_init;

    fn init(root: &Path) {
        cmd_init::execute(&cmd_init::InitParams {
            repo_root: root,
            chain: "anvil",
            chain_id: Some(31337),
            rpc_url: "http://127.0.0.1:8545",
            diamond: markov_core::dag::ZERO_ADDRESS,
        })
        .unwrap();
    }

    #[test]
    fn create_copies_config_and_records_origin() {
        let tmp = tempfile::tempdir().unwrap();
        init(tmp.path());
        create(tmp.path(), "feature", None).unwrap();

        let store = BranchFileStore::open(tmp.path()).unwrap();
        let main_head = store.get_branch_file("main").unwrap().unwrap().commits[0]
            .hash()
            .to_string();
        let feature = store.get_branch_config("feature").unwrap().unwrap();
        assert_eq!(feature.name, "feature");
        assert_eq!(feature.chain_id, Some(31337));
        assert_eq!(feature.created_from.as_deref(), Some("main"));
        assert_eq!(feature.created_from_commit, Some(main_head.clone()));

        let dag = store.load_dag().unwrap();
        assert_eq!(dag.get_head("feature"), Some(main_head.as_str()));
    }

    #[test]
    fn create_rejects_bad_name_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        init(tmp.path());
        assert!(create(tmp.path(), "feat/x", None).is_err());
        create(tmp.path(), "feature", None).unwrap();
        let err = create(tmp.path(), "feature", None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn create_from_unknown_commit_fails() {
        let tmp = tempfile::tempdir().unwrap();
        init(tmp.path());
        assert!(create(tmp.path(), "feature", Some("ffffffffffffffff")).is_err());
        let store = BranchFileStore::open(tmp.path()).unwrap();
        assert!(!store.exists("feature"));
    }

    #[test]
    fn delete_refuses_current_branch() {
        let tmp = tempfile::tempdir().unwrap();
        init(tmp.path());
        create(tmp.path(), "feature", None).unwrap();
        assert!(delete(tmp.path(), "main").is_err());
        delete(tmp.path(), "feature").unwrap();
        assert!(!BranchFileStore::open(tmp.path()).unwrap().exists("feature"));
    }
}
