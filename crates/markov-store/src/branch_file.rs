use markov_core::{BranchName, Commit};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Deployment settings recorded for a branch.
///
/// Every field has a default so that a file missing required keys still
/// decodes; the schema check reports what is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BranchConfig {
    pub name: String,
    pub chain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub rpc_url: String,
    pub diamond_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Epoch millis.
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_from: Option<BranchName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_from_commit: Option<String>,
    /// Branch this one was merged into. Set once; a merged branch cannot be
    /// merged again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<BranchName>,
}

impl BranchConfig {
    /// Decode a config object key by key, dropping values whose type does
    /// not fit. Missing keys take their defaults.
    fn from_map_lenient(map: &Map<String, Value>) -> Self {
        let mut kept = Map::new();
        for (key, value) in map {
            kept.insert(key.clone(), value.clone());
            if serde_json::from_value::<BranchConfig>(Value::Object(kept.clone())).is_err() {
                warn!(key = %key, "dropping config value that cannot be decoded");
                kept.remove(key);
            }
        }
        serde_json::from_value(Value::Object(kept)).unwrap_or_default()
    }
}

/// One `.markov/branches/<name>.json` file: config plus the commits made on
/// the branch, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchFile {
    pub name: BranchName,
    pub config: BranchConfig,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl BranchFile {
    pub fn new(name: impl Into<BranchName>, config: BranchConfig) -> Self {
        Self {
            name: name.into(),
            config,
            commits: Vec::new(),
        }
    }

    /// Best-effort decode of a file that does not fit the typed record.
    ///
    /// The name falls back to `file_stem`, config values that cannot be
    /// decoded are dropped, and commits that cannot be decoded are skipped.
    /// Returns `None` only when the document is not a JSON object.
    pub fn from_value_lenient(value: &Value, file_stem: &str) -> Option<Self> {
        let root = value.as_object()?;
        let name = root
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(file_stem)
            .to_string();
        let config = match root.get("config") {
            Some(Value::Object(map)) => BranchConfig::from_map_lenient(map),
            _ => BranchConfig::default(),
        };
        let commits = match root.get("commits") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| match serde_json::from_value::<Commit>(item.clone()) {
                    Ok(commit) => Some(commit),
                    Err(e) => {
                        warn!(branch = %name, index = i, error = %e, "skipping undecodable commit");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        Some(Self {
            name,
            config,
            commits,
        })
    }

    /// The most recent commit recorded in this file.
    pub fn last_commit(&self) -> Option<&Commit> {
        self.commits.last()
    }
}

/// Contents of `.markov/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBranchPointer {
    pub current_branch: BranchName,
}
