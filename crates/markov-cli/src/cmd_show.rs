use std::path::Path;

use markov_store::BranchFileStore;

use crate::cmd_log::print_commit;

/// `markov show <hash> [--json]`
pub fn execute(repo_root: &Path, hash: &str, json: bool) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let Some(commit) = store.get_commit(hash)? else {
        anyhow::bail!("Commit '{hash}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&commit)?);
    } else {
        print_commit(&commit);
        if !commit.verify_hash() {
            println!();
            println!("warning: stored hash does not match commit content");
        }
    }
    Ok(())
}
