//! Relay channel: exchange compressed snapshots through a key-value relay
//! server behind a human-readable short code.
//!
//! The relay never sees the code itself. The routing key is the hex SHA-256
//! of `"snapshot:" + code`, so someone watching relay traffic cannot recover
//! the speakable code from the key. Entries expire server-side after about
//! five minutes.

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};

/// Adjective vocabulary for short codes. Fixed list; codes generated by a
/// newer build must stay parseable by older ones, so append only.
const ADJECTIVES: [&str; 24] = [
    "blue", "red", "green", "gold", "silver", "amber", "coral", "ivory", "jade", "pearl", "ruby",
    "teal", "brave", "calm", "eager", "gentle", "happy", "kind", "lively", "merry", "quiet",
    "swift", "warm", "wise",
];

/// Noun vocabulary for short codes.
const NOUNS: [&str; 24] = [
    "tiger", "otter", "heron", "finch", "lynx", "marten", "osprey", "puffin", "raven", "seal",
    "swan", "wren", "aspen", "birch", "cedar", "fern", "hazel", "juniper", "laurel", "maple",
    "olive", "rowan", "tulip", "willow",
];

/// A speakable three-part snapshot code like `blue-tiger-42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortCode(String);

impl ShortCode {
    /// Generate a fresh random code: adjective-noun-number, number 10-99.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.random_range(0..NOUNS.len())];
        let number: u8 = rng.random_range(10..100);
        Self(format!("{adjective}-{noun}-{number}"))
    }

    /// Parse user input as a short code. Case-insensitive; both words must
    /// come from the fixed vocabulary.
    pub fn parse(input: &str) -> SnapshotResult<Self> {
        let normalized = input.trim().to_ascii_lowercase();
        let parts: Vec<&str> = normalized.split('-').collect();
        let [adjective, noun, number] = parts.as_slice() else {
            return Err(SnapshotError::MalformedInput(format!(
                "invalid snapshot code '{input}': expected word-word-number"
            )));
        };

        if !ADJECTIVES.contains(adjective) || !NOUNS.contains(noun) {
            return Err(SnapshotError::MalformedInput(format!(
                "invalid snapshot code '{input}': unknown words"
            )));
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SnapshotError::MalformedInput(format!(
                "invalid snapshot code '{input}': trailing part is not a number"
            )));
        }

        Ok(Self(normalized))
    }

    /// Whether the input parses as a short code.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the relay routing key: hex SHA-256 of `"snapshot:" + code`.
    pub fn routing_key(&self) -> String {
        let digest = Sha256::digest(format!("snapshot:{}", self.0).as_bytes());
        hex::encode(digest)
    }
}

impl std::fmt::Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP client for the snapshot relay.
pub struct RelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            base_url: relay_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn snapshot_url(&self, code: &ShortCode) -> String {
        format!("{}/room/{}/snapshot", self.base_url, code.routing_key())
    }

    /// PUT a compressed snapshot to the relay under a fresh short code.
    /// Returns the code to speak or send to the other person.
    pub async fn publish(&self, compressed: &str) -> SnapshotResult<ShortCode> {
        let code = ShortCode::generate();
        let url = self.snapshot_url(&code);

        let res = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(compressed.to_string())
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(SnapshotError::Relay {
                status: status.as_u16(),
                detail: format!("publish failed: {status}"),
            });
        }

        debug!(code = %code, key_prefix = &code.routing_key()[..8], "published snapshot to relay");
        Ok(code)
    }

    /// GET a compressed snapshot from the relay by short code. A 404 means
    /// the code expired (or never existed), which is its own error variant.
    pub async fn fetch(&self, code: &ShortCode) -> SnapshotResult<String> {
        let url = self.snapshot_url(code);
        let res = self.http.get(&url).send().await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SnapshotError::Expired(format!(
                "snapshot '{code}' not found, it may have expired (5 minute limit)"
            )));
        }
        if !status.is_success() {
            return Err(SnapshotError::Relay {
                status: status.as_u16(),
                detail: format!("fetch failed: {status}"),
            });
        }

        let data = res.text().await?;
        debug!(code = %code, chars = data.len(), "fetched snapshot from relay");
        Ok(data)
    }
}
