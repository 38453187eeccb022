use std::path::Path;

use markov_core::Conflict;
use markov_store::BranchFileStore;

/// `markov conflicts <a> <b> [--json]`
pub fn execute(repo_root: &Path, a: &str, b: &str, json: bool) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let dag = store.load_dag()?;
    let conflicts = dag.detect_conflicts(a, b)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }
    if conflicts.is_empty() {
        println!("No conflicts between {a} and {b}");
        return Ok(());
    }
    print_conflicts(&conflicts, a, b);
    Ok(())
}

pub(crate) fn print_conflicts(conflicts: &[Conflict], source: &str, target: &str) {
    println!("{} conflicting selector(s):", conflicts.len());
    for c in conflicts {
        println!(
            "  {}  {}: {:<7}  {}: {}",
            c.selector,
            source,
            c.source_action.as_str(),
            target,
            c.target_action.as_str()
        );
    }
}
