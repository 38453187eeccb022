use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use markov_store::{BranchConfig, BranchFileStore, WorkspaceLock};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value on a branch
    Set {
        /// Config key (chain, chainId, rpcUrl, diamondAddress, explorerUrl, explorerApiKey)
        key: String,
        /// Config value ("" clears optional keys)
        value: String,
        /// Branch to edit (default: current)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Get one config value, or the whole config as JSON
    Get {
        /// Config key
        key: Option<String>,
        /// Branch to read (default: current)
        #[arg(long)]
        branch: Option<String>,
    },
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value, branch } => set(repo_root, branch.as_deref(), &key, &value),
        ConfigCmd::Get { key, branch } => get(repo_root, branch.as_deref(), key.as_deref()),
    }
}

// ── Key handling ──

/// A parsed `config set` request, applied inside the store's update closure.
#[derive(Debug, PartialEq)]
enum ConfigUpdate {
    Chain(String),
    ChainId(Option<u64>),
    RpcUrl(String),
    DiamondAddress(String),
    ExplorerUrl(Option<String>),
    ExplorerApiKey(Option<String>),
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_update(key: &str, value: &str) -> anyhow::Result<ConfigUpdate> {
    Ok(match key {
        "chain" => ConfigUpdate::Chain(value.to_string()),
        "chainId" => ConfigUpdate::ChainId(if value.is_empty() {
            None
        } else {
            Some(
                value
                    .parse()
                    .with_context(|| format!("chainId must be a number, got '{value}'"))?,
            )
        }),
        "rpcUrl" => ConfigUpdate::RpcUrl(value.to_string()),
        "diamondAddress" => ConfigUpdate::DiamondAddress(value.to_string()),
        "explorerUrl" => ConfigUpdate::ExplorerUrl(optional(value)),
        "explorerApiKey" => ConfigUpdate::ExplorerApiKey(optional(value)),
        other => anyhow::bail!("unknown or read-only config key: {other}"),
    })
}

impl ConfigUpdate {
    fn apply(self, config: &mut BranchConfig) {
        match self {
            ConfigUpdate::Chain(v) => config.chain = v,
            ConfigUpdate::ChainId(v) => config.chain_id = v,
            ConfigUpdate::RpcUrl(v) => config.rpc_url = v,
            ConfigUpdate::DiamondAddress(v) => config.diamond_address = v,
            ConfigUpdate::ExplorerUrl(v) => config.explorer_url = v,
            ConfigUpdate::ExplorerApiKey(v) => config.explorer_api_key = v,
        }
    }
}

fn resolve_branch(store: &BranchFileStore, branch: Option<&str>) -> anyhow::Result<String> {
    match branch {
        Some(b) => Ok(b.to_string()),
        None => Ok(store.get_current_branch_name()?),
    }
}

// ── Command Implementations ──

/// `markov config set <key> <value> [--branch <name>]`
pub fn set(repo_root: &Path, branch: Option<&str>, key: &str, value: &str) -> anyhow::Result<()> {
    let update = parse_update(key, value)?;
    let store = BranchFileStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(store.paths())?;
    let branch = resolve_branch(&store, branch)?;

    store.update_branch_config(&branch, |config| update.apply(config))?;
    println!("{branch}: {key} = {value}");
    Ok(())
}

/// `markov config get [key] [--branch <name>]`
pub fn get(repo_root: &Path, branch: Option<&str>, key: Option<&str>) -> anyhow::Result<()> {
    let store = BranchFileStore::open(repo_root)?;
    let branch = resolve_branch(&store, branch)?;
    let config = store
        .get_branch_config(&branch)?
        .with_context(|| format!("Branch '{branch}' does not exist"))?;
    let value = serde_json::to_value(&config)?;

    match key {
        None => println!("{}", serde_json::to_string_pretty(&value)?),
        Some(k) => match value.get(k) {
            Some(serde_json::Value::String(s)) => println!("{s}"),
            Some(v) => println!("{v}"),
            None => println!("(not set)"),
        },
    }
    Ok(())
}
