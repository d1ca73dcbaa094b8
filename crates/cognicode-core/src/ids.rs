use crate::types::{Issue, Suggestion, TestCase};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-addressed key of a source text: SHA-256 over its raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        Self::of_bytes(text.as_bytes())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

/// Deterministic identifier over an ordered list of identifying fields.
/// Fields are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn stable_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Items that can be given a stable identity for deduplication downstream.
pub trait Identify {
    fn identity(&self) -> String;
}

impl Identify for Issue {
    fn identity(&self) -> String {
        stable_id(&[
            "issue",
            self.severity.as_str(),
            &self.category,
            &self.line.to_string(),
            &self.column.to_string(),
            &self.message,
        ])
    }
}

impl Identify for Suggestion {
    fn identity(&self) -> String {
        stable_id(&[
            "suggestion",
            self.kind.as_str(),
            &self.title,
            &self.line_start.to_string(),
            &self.line_end.to_string(),
        ])
    }
}

impl Identify for TestCase {
    fn identity(&self) -> String {
        stable_id(&["test", &self.framework, self.kind.as_str(), &self.name])
    }
}

/// A formatted item paired with its deterministic id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ranked<T> {
    pub id: String,
    #[serde(flatten)]
    pub item: T,
}

impl<T: Identify> Ranked<T> {
    pub fn new(item: T) -> Self {
        Self {
            id: item.identity(),
            item,
        }
    }
}
