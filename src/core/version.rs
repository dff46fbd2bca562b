//! Content-addressed version store
//!
//! Maps `(file, digest)` to a payload snapshot. Storing the same digest twice
//! overwrites identical bytes, so capture is idempotent.

use crate::core::digest::Digest;
use std::collections::HashMap;

/// A stored snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub digest: Digest,
    pub payload: Vec<u8>,
    /// Order in which the digest was first stored for its file
    pub sequence: u64,
}

/// Per-file digest → payload archive
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    files: HashMap<String, HashMap<Digest, VersionEntry>>,
    next_sequence: u64,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` under `digest` for `file`
    ///
    /// Returns `true` when the digest was not yet known for this file.
    pub fn insert(&mut self, file: &str, digest: Digest, payload: &[u8]) -> bool {
        let versions = self.files.entry(file.to_string()).or_default();

        match versions.get_mut(&digest) {
            Some(existing) => {
                existing.payload = payload.to_vec();
                false
            }
            None => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                versions.insert(
                    digest.clone(),
                    VersionEntry {
                        digest,
                        payload: payload.to_vec(),
                        sequence,
                    },
                );
                true
            }
        }
    }

    /// Store `payload` under its own content digest
    pub fn capture(&mut self, file: &str, payload: &[u8]) -> Digest {
        let digest = Digest::of_payload(payload);
        self.insert(file, digest.clone(), payload);
        digest
    }

    pub fn get(&self, file: &str, digest: &Digest) -> Option<&[u8]> {
        self.files
            .get(file)
            .and_then(|versions| versions.get(digest))
            .map(|entry| entry.payload.as_slice())
    }

    pub fn contains(&self, file: &str, digest: &Digest) -> bool {
        self.get(file, digest).is_some()
    }

    /// Digests stored for a file, oldest first
    pub fn history(&self, file: &str) -> Vec<Digest> {
        let mut entries: Vec<&VersionEntry> = self
            .files
            .get(file)
            .map(|versions| versions.values().collect())
            .unwrap_or_default();
        entries.sort_by_key(|entry| entry.sequence);
        entries.into_iter().map(|entry| entry.digest.clone()).collect()
    }

    /// Number of snapshots held for a file
    pub fn version_count(&self, file: &str) -> usize {
        self.files.get(file).map(HashMap::len).unwrap_or(0)
    }

    /// Total snapshots across all files
    pub fn len(&self) -> usize {
        self.files.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_get() {
        let mut store = VersionStore::new();
        let digest = store.capture("teddy_server.py", b"legacy");
        assert_eq!(digest, Digest::of_payload(b"legacy"));
        assert_eq!(store.get("teddy_server.py", &digest), Some(&b"legacy"[..]));
        assert_eq!(store.get("other.py", &digest), None);
    }

    #[test]
    fn test_capture_is_idempotent() {
        let mut store = VersionStore::new();
        let first = store.capture("f", b"same bytes");
        let second = store.capture("f", b"same bytes");
        assert_eq!(first, second);
        assert_eq!(store.version_count("f"), 1);
        assert_eq!(store.get("f", &first), Some(&b"same bytes"[..]));
    }

    #[test]
    fn test_history_keeps_insertion_order() {
        let mut store = VersionStore::new();
        let a = store.capture("f", b"a");
        let b = store.capture("f", b"b");
        store.capture("g", b"c");
        let a_again = store.capture("f", b"a");

        assert_eq!(a, a_again);
        assert_eq!(store.history("f"), vec![a, b]);
        assert!(store.history("missing").is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_insert_reports_new_digest() {
        let mut store = VersionStore::new();
        let digest = Digest::from("deadbeef");
        assert!(store.insert("f", digest.clone(), b"x"));
        assert!(!store.insert("f", digest.clone(), b"x"));
        assert!(store.contains("f", &digest));
    }
}
