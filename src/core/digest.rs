//! Content digests and commit clocks

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Timestamp format written into commit records and mixed into commit digests
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lowercase hex SHA-256 fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Digest of raw payload bytes
    pub fn of_payload(payload: &[u8]) -> Self {
        Digest(hex::encode(Sha256::digest(payload)))
    }

    /// Digest of a commit: timestamp, author, message, then the payload
    ///
    /// Identical payloads committed by different authors or at different
    /// times produce different digests.
    pub fn of_commit(timestamp: &str, author: &str, message: &str, payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(timestamp.as_bytes());
        hasher.update(author.as_bytes());
        hasher.update(message.as_bytes());
        hasher.update(payload);
        Digest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Digest {
    fn from(value: &str) -> Self {
        Digest(value.to_ascii_lowercase())
    }
}

impl From<String> for Digest {
    fn from(value: String) -> Self {
        Digest(value.to_ascii_lowercase())
    }
}

/// Source of commit timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Timestamp rendered with [`TIMESTAMP_FORMAT`]
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock frozen `secs` seconds after the Unix epoch
    pub fn from_unix(secs: i64) -> Self {
        FixedClock(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_digest_is_deterministic() {
        let a = Digest::of_payload(b"def handle_request(data): return process_legacy(data)");
        let b = Digest::of_payload(b"def handle_request(data): return process_legacy(data)");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, Digest::of_payload(b"something else"));
    }

    #[test]
    fn test_empty_payload_digest() {
        assert_eq!(
            Digest::of_payload(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_commit_digest_mixes_metadata() {
        let payload = b"def handle_request(data): return process_optimized(data)";
        let a = Digest::of_commit("2024-01-01 00:00:00", "rushikesh648", "Optimize", payload);
        let b = Digest::of_commit("2024-01-01 00:00:00", "someone-else", "Optimize", payload);
        let c = Digest::of_commit("2024-01-01 00:00:01", "rushikesh648", "Optimize", payload);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Digest::of_payload(payload));
    }

    #[test]
    fn test_short_and_parse() {
        let digest = Digest::of_payload(b"x");
        assert_eq!(digest.short().len(), 8);
        assert_eq!(Digest::from(digest.as_str().to_uppercase()), digest);
        assert_eq!(Digest::from("deadbeef").short(), "deadbeef");
    }

    #[test]
    fn test_fixed_clock_timestamp() {
        let clock = FixedClock::from_unix(0);
        assert_eq!(clock.timestamp(), "1970-01-01 00:00:00");
    }
}
