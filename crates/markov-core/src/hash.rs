use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::FacetCut;

/// Number of hex characters kept from the digest.
pub const COMMIT_HASH_LEN: usize = 16;

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The hashed fields of a commit, in canonical key order.
///
/// Serialization is compact JSON with keys emitted in declaration order.
/// `parentHash` is omitted for root commits; `parentHashes` is only present
/// on merge commits and comes last, so single-parent hashes are unaffected
/// by it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFields<'a> {
    pub timestamp: i64,
    pub author: &'a str,
    pub message: &'a str,
    pub diamond_address: &'a str,
    pub cut: &'a [FacetCut],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<&'a str>,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_hashes: Option<&'a [String]>,
}

/// Canonical bytes fed to the digest.
pub fn canonical_commit_bytes(fields: &CommitFields<'_>) -> Vec<u8> {
    serde_json::to_vec(fields).expect("commit fields serialization should not fail")
}

/// Content hash of a commit: SHA-256 over the canonical bytes, truncated.
pub fn commit_hash(fields: &CommitFields<'_>) -> String {
    let mut digest = sha256_hex(&canonical_commit_bytes(fields));
    digest.truncate(COMMIT_HASH_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FacetCutAction;

    #[test]
    fn sha256_empty() {
        let h = sha256_hex(b"");
        assert_eq!(
            h,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_key_order() {
        let cut = vec![FacetCut::new("0xF1", FacetCutAction::Replace, ["0x22222222"])];
        let fields = CommitFields {
            timestamp: 1_700_000_000_000,
            author: "dev",
            message: "Commit 1",
            diamond_address: "0xD",
            cut: &cut,
            parent_hash: Some("0123456789abcdef"),
            branch: "main",
            parent_hashes: None,
        };
        let bytes = canonical_commit_bytes(&fields);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"timestamp":1700000000000,"author":"dev","message":"Commit 1","diamondAddress":"0xD","cut":[{"facetAddress":"0xF1","action":1,"functionSelectors":["0x22222222"]}],"parentHash":"0123456789abcdef","branch":"main"}"#
        );
        assert_eq!(commit_hash(&fields), "ac488d1b2ad8f129");
    }

    #[test]
    fn root_hash_is_stable() {
        let fields = CommitFields {
            timestamp: 0,
            author: "system",
            message: "Initialize Diamond project",
            diamond_address: "",
            cut: &[],
            parent_hash: None,
            branch: "main",
            parent_hashes: None,
        };
        assert_eq!(commit_hash(&fields), "bcfc545de42aa8cf");
    }

    #[test]
    fn merge_parents_change_the_hash() {
        let parents = vec!["aaaaaaaaaaaaaaaa".to_string(), "bbbbbbbbbbbbbbbb".to_string()];
        let base = CommitFields {
            timestamp: 5,
            author: "dev",
            message: "merge",
            diamond_address: "0xD",
            cut: &[],
            parent_hash: Some("aaaaaaaaaaaaaaaa"),
            branch: "main",
            parent_hashes: None,
        };
        let merged = CommitFields {
            parent_hashes: Some(&parents),
            ..base
        };
        let plain = CommitFields {
            parent_hashes: None,
            ..merged
        };
        assert_ne!(commit_hash(&plain), commit_hash(&merged));
    }

    #[test]
    fn output_is_16_char_lowercase_hex() {
        let fields = CommitFields {
            timestamp: 1,
            author: "a",
            message: "m",
            diamond_address: "0x0",
            cut: &[],
            parent_hash: None,
            branch: "b",
            parent_hashes: None,
        };
        let h = commit_hash(&fields);
        assert_eq!(h.len(), COMMIT_HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }
}
