use std::path::Path;

use anyhow::Context;
use markov_core::{FacetCut, FacetCutAction};
use markov_store::{BranchFileStore, WorkspaceLock};

pub struct CommitParams<'a> {
    pub repo_root: &'a Path,
    pub message: &'a str,
    pub author: &'a str,
    pub add: &'a [String],
    pub replace: &'a [String],
    pub remove: &'a [String],
    pub cut_file: Option<&'a Path>,
    pub diamond: Option<&'a str>,
    pub allow_empty: bool,
}

/// Parse `FACET=SEL[,SEL...]` into one facet cut.
fn parse_cut_arg(arg: &str, action: FacetCutAction) -> anyhow::Result<FacetCut> {
    let (facet, selectors) = arg
        .split_once('=')
        .with_context(|| format!("expected FACET=SEL[,SEL...], got '{arg}'"))?;
    let selectors: Vec<&str> = selectors
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if selectors.is_empty() {
        anyhow::bail!("no selectors given for facet {facet}");
    }
    Ok(FacetCut::new(facet.trim(), action, selectors))
}

/// Cuts from `--cut-file` first, then `--add`, `--replace`, `--remove` in
/// command-line order.
fn build_cut(params: &CommitParams<'_>) -> anyhow::Result<Vec<FacetCut>> {
    let mut cut: Vec<FacetCut> = match params.cut_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of facet cuts", path.display()))?
        }
        None => Vec::new(),
    };
    for (args, action) in [
        (params.add, FacetCutAction::Add),
        (params.replace, FacetCutAction::Replace),
        (params.remove, FacetCutAction::Remove),
    ] {
        for arg in args {
            cut.push(parse_cut_arg(arg, action)?);
        }
    }
    Ok(cut)
}

/// `markov commit -m <msg> [--add|--replace|--remove FACET=SEL,...]`
pub fn execute(params: &CommitParams<'_>) -> anyhow::Result<()> {
    let cut = build_cut(params)?;
    if cut.is_empty() && !params.allow_empty {
        anyhow::bail!("nothing to commit (use --add/--replace/--remove, --cut-file, or --allow-empty)");
    }

    let store = BranchFileStore::open(params.repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;

    let mut dag = store.load_dag()?;
    let branch = dag
        .get_current_branch()
        .context("no current branch")?
        .to_string();
    let diamond = match params.diamond {
        Some(addr) => addr.to_string(),
        None => {
            store
                .get_branch_config(&branch)?
                .with_context(|| format!("no config for branch '{branch}'"))?
                .diamond_address
        }
    };

    let hash = dag.add_commit(params.message, params.author, &diamond, cut)?;
    let commit = dag
        .get_commit(&hash)
        .cloned()
        .context("commit missing after add")?;
    let selectors: usize = commit.cut().iter().map(|c| c.function_selectors.len()).sum();
    store.add_commit(&branch, commit)?;

    println!("[{branch} {hash}] {}", params.message);
    println!("  {selectors} selector(s) changed");
    Ok(())
}
