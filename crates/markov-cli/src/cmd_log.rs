use std::path::Path;

use anyhow::Context;
use markov_core::Commit;
use markov_store::BranchFileStore;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub struct LogParams<'a> {
    pub repo_root: &'a Path,
    pub branch: Option<&'a str>,
    pub limit: Option<usize>,
    pub json: bool,
}

/// `markov log [--branch <name>] [--limit N] [--json]`
pub fn execute(params: &LogParams<'_>) -> anyhow::Result<()> {
    let store = BranchFileStore::open(params.repo_root)?;
    let dag = store.load_dag()?;
    let branch = match params.branch {
        Some(b) => b.to_string(),
        None => dag
            .get_current_branch()
            .context("no current branch")?
            .to_string(),
    };
    if dag.get_head(&branch).is_none() {
        anyhow::bail!("Branch '{branch}' does not exist");
    }

    let commits = dag.get_history(&branch, params.limit);
    if params.json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }

    for commit in &commits {
        print_commit(commit);
        println!();
    }
    println!("({} commits on {branch})", commits.len());
    Ok(())
}

/// Epoch millis as RFC 3339, or the raw number when out of range.
pub(crate) fn format_millis(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

pub(crate) fn print_commit(commit: &Commit) {
    println!("commit {} ({})", commit.hash(), commit.branch());
    if commit.is_merge() {
        println!("Merge:  {}", commit.parents().join(" "));
    }
    println!("Author: {}", commit.author());
    println!("Date:   {}", format_millis(commit.timestamp()));
    println!("Diamond: {}", commit.diamond_address());
    println!();
    println!("    {}", commit.message());
    for cut in commit.cut() {
        println!(
            "    {:<7} {} [{}]",
            cut.action.as_str(),
            cut.facet_address,
            cut.function_selectors.join(", ")
        );
    }
}
