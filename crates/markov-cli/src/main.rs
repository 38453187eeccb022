mod cmd_branch;
mod cmd_commit;
mod cmd_config;
mod cmd_conflicts;
mod cmd_init;
mod cmd_log;
mod cmd_merge;
mod cmd_show;
mod cmd_status;
mod cmd_switch;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use markov_store::MarkovPaths;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "markov",
    version,
    about = "Git-style version control for Diamond facet cuts"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .markov/ project with a `main` branch
    Init {
        /// Chain name recorded in the main branch config
        #[arg(long, default_value = "localhost")]
        chain: String,
        /// Numeric chain id
        #[arg(long)]
        chain_id: Option<u64>,
        /// JSON-RPC endpoint
        #[arg(long, default_value = "http://127.0.0.1:8545")]
        rpc_url: String,
        /// Deployed Diamond address (zero address when not yet deployed)
        #[arg(long, default_value = markov_core::dag::ZERO_ADDRESS)]
        diamond: String,
    },
    /// Create, list, or delete branches
    Branch {
        #[command(subcommand)]
        cmd: BranchCmd,
    },
    /// Switch the current branch
    Switch {
        /// Branch name
        name: String,
    },
    /// Record a facet cut on the current branch
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
        /// Commit author
        #[arg(long, env = "MARKOV_AUTHOR", default_value = "markov")]
        author: String,
        /// Add selectors: FACET=SEL[,SEL...] (repeatable)
        #[arg(long = "add")]
        add: Vec<String>,
        /// Replace selectors: FACET=SEL[,SEL...] (repeatable)
        #[arg(long = "replace")]
        replace: Vec<String>,
        /// Remove selectors: FACET=SEL[,SEL...] (repeatable)
        #[arg(long = "remove")]
        remove: Vec<String>,
        /// JSON file holding an array of facet cuts
        #[arg(long)]
        cut_file: Option<PathBuf>,
        /// Diamond address (defaults to the branch config)
        #[arg(long)]
        diamond: Option<String>,
        /// Allow a commit with an empty cut
        #[arg(long)]
        allow_empty: bool,
    },
    /// Show commit history, newest first
    Log {
        /// Branch to show (default: current)
        #[arg(long)]
        branch: Option<String>,
        /// Maximum number of commits
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single commit
    Show {
        /// Commit hash
        hash: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge a branch into the current branch
    Merge {
        /// Branch to merge
        source: String,
        /// Merge commit message
        #[arg(short, long)]
        message: Option<String>,
        /// Commit author
        #[arg(long, env = "MARKOV_AUTHOR", default_value = "markov")]
        author: String,
        /// Record the merge even when selectors conflict
        #[arg(long)]
        force: bool,
    },
    /// List selector conflicts between two branches
    Conflicts {
        /// First branch (reported as source)
        a: String,
        /// Second branch (reported as target)
        b: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current branch, HEAD, and deployment config
    Status,
    /// Read or edit a branch's deployment config
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

#[derive(Subcommand)]
enum BranchCmd {
    /// Create a branch at the current HEAD or a given commit
    Create {
        /// Branch name
        name: String,
        /// Commit to branch from (default: current HEAD)
        #[arg(long)]
        from: Option<String>,
    },
    /// List branches
    List,
    /// Delete a branch file
    Delete {
        /// Branch name
        name: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MARKOV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Nearest ancestor holding `.markov/`, or `cwd` itself so that commands
/// report a "not initialized" error against it.
fn project_root(cwd: &Path) -> PathBuf {
    MarkovPaths::find_root(cwd).unwrap_or_else(|| cwd.to_path_buf())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let repo_root = project_root(&cwd);

    match cli.cmd {
        Command::Init {
            chain,
            chain_id,
            rpc_url,
            diamond,
        } => cmd_init::execute(&cmd_init::InitParams {
            repo_root: &cwd,
            chain: &chain,
            chain_id,
            rpc_url: &rpc_url,
            diamond: &diamond,
        }),
        Command::Branch { cmd } => match cmd {
            BranchCmd::Create { name, from } => {
                cmd_branch::create(&repo_root, &name, from.as_deref())
            }
            BranchCmd::List => cmd_branch::list(&repo_root),
            BranchCmd::Delete { name } => cmd_branch::delete(&repo_root, &name),
        },
        Command::Switch { name } => cmd_switch::execute(&repo_root, &name),
        Command::Commit {
            message,
            author,
            add,
            replace,
            remove,
            cut_file,
            diamond,
            allow_empty,
        } => cmd_commit::execute(&cmd_commit::CommitParams {
            repo_root: &repo_root,
            message: &message,
            author: &author,
            add: &add,
            replace: &replace,
            remove: &remove,
            cut_file: cut_file.as_deref(),
            diamond: diamond.as_deref(),
            allow_empty,
        }),
        Command::Log {
            branch,
            limit,
            json,
        } => cmd_log::execute(&cmd_log::LogParams {
            repo_root: &repo_root,
            branch: branch.as_deref(),
            limit,
            json,
        }),
        Command::Show { hash, json } => cmd_show::execute(&repo_root, &hash, json),
        Command::Merge {
            source,
            message,
            author,
            force,
        } => cmd_merge::execute(&repo_root, &source, message.as_deref(), &author, force),
        Command::Conflicts { a, b, json } => cmd_conflicts::execute(&repo_root, &a, &b, json),
        Command::Status => cmd_status::execute(&repo_root),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
    }
}
