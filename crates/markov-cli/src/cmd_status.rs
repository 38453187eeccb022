use std::path::Path;

use markov_store::BranchFileStore;

use crate::cmd_log::format_millis;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let dag = store.load_dag()?;
    let current = store.get_current_branch_name()?;

    println!("On branch {current}");

    match dag.get_head(&current).and_then(|h| dag.get_commit(h)) {
        Some(c) => println!(
            "HEAD: {} {} \"{}\"",
            c.hash(),
            format_millis(c.timestamp()),
            c.message()
        ),
        None => println!("HEAD: (none)"),
    }

    if let Some(config) = store.get_branch_config(&current)? {
        let chain_id = config
            .chain_id
            .map(|id| format!(" ({id})"))
            .unwrap_or_default();
        println!("Chain: {}{chain_id}", config.chain);
        println!("RPC: {}", config.rpc_url);
        println!("Diamond: {}", config.diamond_address);
        if let (Some(from), Some(at)) = (&config.created_from, &config.created_from_commit) {
            println!("Created from: {from} @ {at}");
        }
    }

    let on_branch = dag.get_history(&current, None).len();
    println!(
        "Commits: {on_branch} reachable, {} total across {} branch(es)",
        dag.get_commit_count(),
        dag.get_branches().len()
    );
    Ok(())
}
