use std::path::Path;

use markov_store::{BranchFileStore, WorkspaceLock};

/// `markov switch <name>`
pub fn execute(repo_root: &Path, name: &str) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    if store.get_current_branch_name()? == name {
        println!("Already on {name}");
        return Ok(());
    }
    store.set_current_branch_name(name)?;
    println!("Switched to branch {name}");
    Ok(())
}
