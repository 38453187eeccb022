use std::path::Path;

use anyhow::Context;
use markov_store::{BranchFileStore, WorkspaceLock};
use tracing::info;

use crate::cmd_conflicts::print_conflicts;

/// `markov merge <source> [-m <msg>] [--force]`
///
/// Records a merge commit on the current branch. Selector conflicts abort
/// the merge unless `force` is set. The merge commit carries no cut of its
/// own; the source's cuts are reachable through its second parent.
pub fn execute(
    repo_root: &Path,
    source: &str,
    message: Option<&str>,
    author: &str,
    force: bool,
) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    let mut dag = store.load_dag()?;
    let target = dag
        .get_current_branch()
        .context("no current branch")?
        .to_string();

    let conflicts = dag.detect_conflicts(source, &target)?;
    if !conflicts.is_empty() {
        print_conflicts(&conflicts, source, &target);
        if !force {
            anyhow::bail!(
                "merge aborted: {} conflicting selector(s) (use --force to record anyway)",
                conflicts.len()
            );
        }
        info!(count = conflicts.len(), "recording merge with conflicts");
    }

    let diamond = store
        .get_branch_config(&target)?
        .with_context(|| format!("no config for branch '{target}'"))?
        .diamond_address;
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Merge branch '{source}' into {target}"));

    let hash = dag.merge_commit(&message, author, &diamond, Vec::new(), source)?;
    let commit = dag
        .get_commit(&hash)
        .cloned()
        .context("merge commit missing after merge")?;
    store.add_merge_commit(&target, source, commit)?;

    println!("Merged {source} -> {target} ({hash})");
    Ok(())
}
