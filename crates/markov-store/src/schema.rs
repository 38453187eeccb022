//! Branch file schema.
//!
//! Checks run over the raw JSON value so a single pass reports every
//! violation, not just the first one serde would stop at. Writers treat any
//! issue as fatal; readers log and continue.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static BRANCH_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());
static COMMIT_HASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{16}$").unwrap());
static SELECTOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{8}$").unwrap());

/// Allowed values of `cut[].action`.
const ACTIONS: [u64; 3] = [0, 1, 2];

/// One schema violation, located by a JSON-pointer-like path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Check a branch name against the file-name pattern.
pub fn is_valid_branch_name(name: &str) -> bool {
    BRANCH_NAME.is_match(name)
}

/// Validate a branch file. `file_stem` is the name the file is (or will be)
/// stored under; the `name` field must match it.
pub fn validate_branch_file(value: &Value, file_stem: &str) -> Vec<SchemaIssue> {
    let mut v = Validator::default();
    let Some(root) = v.object(value, "") else {
        return v.issues;
    };

    if let Some(name) = v.string(root, "", "name", true, Some(&BRANCH_NAME)) {
        if name != file_stem {
            v.issue("/name", format!("\"{name}\" does not match file name \"{file_stem}\""));
        }
    }

    match root.get("config") {
        Some(config) => v.config(config),
        None => v.issue("/config", "is required"),
    }

    match root.get("commits") {
        Some(Value::Array(commits)) => {
            for (i, commit) in commits.iter().enumerate() {
                v.commit(commit, &format!("/commits/{i}"));
            }
        }
        Some(_) => v.issue("/commits", "must be an array"),
        None => v.issue("/commits", "is required"),
    }

    v.issues
}

#[derive(Default)]
struct Validator {
    issues: Vec<SchemaIssue>,
}

impl Validator {
    fn issue(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(SchemaIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => {
                self.issue(if path.is_empty() { "/" } else { path }, "must be an object");
                None
            }
        }
    }

    fn string<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
        required: bool,
        pattern: Option<&Regex>,
    ) -> Option<&'v str> {
        let at = format!("{path}/{key}");
        match obj.get(key) {
            Some(Value::String(s)) => {
                if let Some(re) = pattern {
                    if !re.is_match(s) {
                        self.issue(&at, format!("\"{s}\" does not match {}", re.as_str()));
                    }
                }
                Some(s)
            }
            Some(_) => {
                self.issue(&at, "must be a string");
                None
            }
            None => {
                if required {
                    self.issue(&at, "is required");
                }
                None
            }
        }
    }

    fn number(&mut self, obj: &Map<String, Value>, path: &str, key: &str, required: bool) {
        let at = format!("{path}/{key}");
        match obj.get(key) {
            Some(Value::Number(_)) => {}
            Some(_) => self.issue(&at, "must be a number"),
            None if required => self.issue(&at, "is required"),
            None => {}
        }
    }

    fn config(&mut self, value: &Value) {
        let path = "/config";
        let Some(config) = self.object(value, path) else {
            return;
        };
        self.string(config, path, "name", true, None);
        self.string(config, path, "chain", true, None);
        self.number(config, path, "chainId", false);
        self.string(config, path, "rpcUrl", true, None);
        self.string(config, path, "diamondAddress", true, Some(&ADDRESS));
        self.string(config, path, "explorerApiKey", false, None);
        self.string(config, path, "explorerUrl", false, None);
        self.number(config, path, "createdAt", true);
        self.string(config, path, "createdFrom", false, None);
        self.string(config, path, "createdFromCommit", false, None);
        self.string(config, path, "mergedInto", false, None);
    }

    fn commit(&mut self, value: &Value, path: &str) {
        let Some(commit) = self.object(value, path) else {
            return;
        };
        self.string(commit, path, "hash", true, Some(&COMMIT_HASH));
        self.number(commit, path, "timestamp", true);
        self.string(commit, path, "author", true, None);
        self.string(commit, path, "message", true, None);
        self.string(commit, path, "diamondAddress", true, Some(&ADDRESS));
        self.string(commit, path, "branch", true, None);

        match commit.get("parentHash") {
            None | Some(Value::Null) => {}
            Some(_) => {
                self.string(commit, path, "parentHash", false, Some(&COMMIT_HASH));
            }
        }

        match commit.get("parentHashes") {
            None => {}
            Some(Value::Array(parents)) => {
                for (i, parent) in parents.iter().enumerate() {
                    let at = format!("{path}/parentHashes/{i}");
                    match parent.as_str() {
                        Some(h) if COMMIT_HASH.is_match(h) => {}
                        Some(h) => self.issue(&at, format!("\"{h}\" is not a commit hash")),
                        None => self.issue(&at, "must be a string"),
                    }
                }
            }
            Some(_) => self.issue(&format!("{path}/parentHashes"), "must be an array"),
        }

        match commit.get("cut") {
            Some(Value::Array(cuts)) => {
                for (i, cut) in cuts.iter().enumerate() {
                    self.facet_cut(cut, &format!("{path}/cut/{i}"));
                }
            }
            Some(_) => self.issue(&format!("{path}/cut"), "must be an array"),
            None => self.issue(&format!("{path}/cut"), "is required"),
        }
    }

    fn facet_cut(&mut self, value: &Value, path: &str) {
        let Some(cut) = self.object(value, path) else {
            return;
        };
        self.string(cut, path, "facetAddress", true, Some(&ADDRESS));

        let at = format!("{path}/action");
        match cut.get("action") {
            Some(action) if action.as_u64().is_some_and(|a| ACTIONS.contains(&a)) => {}
            Some(action) => self.issue(&at, format!("{action} is not one of 0, 1, 2")),
            None => self.issue(&at, "is required"),
        }

        let at = format!("{path}/functionSelectors");
        match cut.get("functionSelectors") {
            Some(Value::Array(selectors)) => {
                for (i, selector) in selectors.iter().enumerate() {
                    match selector.as_str() {
                        Some(s) if SELECTOR.is_match(s) => {}
                        Some(s) => self.issue(&format!("{at}/{i}"), format!("\"{s}\" is not a selector")),
                        None => self.issue(&format!("{at}/{i}"), "must be a string"),
                    }
                }
            }
            Some(_) => self.issue(&at, "must be an array"),
            None => self.issue(&at, "is required"),
        }
    }
}
