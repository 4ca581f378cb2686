//! Snapshot compression and share-input handling.
//!
//! A snapshot travels as `compact v2 JSON → deflate (zlib) → base64url`,
//! the same body over every channel: URL fragment, copy-paste text, relay
//! short code, or QR. Decompression also accepts version 1 payloads, which
//! were the raw session JSON before the positional encoding existed.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::codec::{decode_session, detect_categories, encode_session, CompactV2};
use crate::error::{SnapshotError, SnapshotResult};
use crate::relay::ShortCode;
use crate::settings::{SettingsPatch, SharingCategory};
use crate::types::SessionData;

const SNAPSHOT_ORIGIN: &str = "https://contractions.app";

/// QR version 40 at low error correction holds ~2950 chars; leave headroom
/// for the URL prefix.
pub const QR_CHAR_BUDGET: usize = 2900;
const URL_PREFIX_CHARS: usize = 40;

/// Result of decompressing a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompressedSnapshot {
    pub session: SessionData,
    pub shared_settings: Option<SettingsPatch>,
    /// Wire version the payload used (1 or 2)
    pub version: u8,
}

/// Compress a session (plus optional shared settings) into a base64url
/// string ready for any share channel.
pub fn compress_session(
    session: &SessionData,
    shared_settings: Option<&SettingsPatch>,
) -> SnapshotResult<String> {
    let compact = encode_session(session, shared_settings);
    let json = serde_json::to_vec(&compact)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    let encoded = URL_SAFE_NO_PAD.encode(&compressed);
    debug!(
        raw = json.len(),
        compressed = compressed.len(),
        chars = encoded.len(),
        "compressed snapshot"
    );
    Ok(encoded)
}

/// Decompress a base64url snapshot string. Accepts both the current compact
/// format and version 1 raw session JSON.
pub fn decompress_session(code: &str) -> SnapshotResult<DecompressedSnapshot> {
    // Tolerate padded input from sloppy copy-paste
    let trimmed = code.trim().trim_end_matches('=');
    let compressed = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| SnapshotError::MalformedInput(format!("invalid base64url data: {e}")))?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| SnapshotError::MalformedInput(format!("corrupt deflate stream: {e}")))?;
    debug!(chars = trimmed.len(), bytes = raw.len(), "decompressed snapshot");

    let parsed: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|e| SnapshotError::MalformedInput(format!("invalid snapshot JSON: {e}")))?;

    if parsed.get("v").and_then(serde_json::Value::as_u64) == Some(2) {
        let compact: CompactV2 = serde_json::from_value(parsed)?;
        let decoded = decode_session(&compact)?;
        return Ok(DecompressedSnapshot {
            session: decoded.session,
            shared_settings: decoded.shared_settings,
            version: 2,
        });
    }

    // v1 fallback: the payload is the session itself
    let session: SessionData = serde_json::from_value(parsed)
        .map_err(|e| SnapshotError::MalformedInput(format!("invalid v1 session: {e}")))?;
    Ok(DecompressedSnapshot {
        session,
        shared_settings: None,
        version: 1,
    })
}

/// Shareable snapshot URL carrying the payload in the hash fragment, which
/// never reaches the server.
pub fn snapshot_url(code: &str) -> String {
    format!("{SNAPSHOT_ORIGIN}/#snapshot={code}")
}

/// What kind of share input the user pasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareInput {
    /// URL containing a `#snapshot=` fragment; carries the extracted payload
    Url(String),
    /// Relay short code to resolve before decompressing
    Code(ShortCode),
    /// Raw compressed payload pasted directly
    Raw(String),
}

fn is_base64url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Classify pasted input as a snapshot URL, a relay short code, or a raw
/// compressed payload. Returns `None` when it is none of those.
pub fn classify_share_input(input: &str) -> Option<ShareInput> {
    let trimmed = input.trim();

    if let Some(idx) = trimmed.find("#snapshot=") {
        let rest = &trimmed[idx + "#snapshot=".len()..];
        let end = rest.find(|c| !is_base64url_char(c)).unwrap_or(rest.len());
        if end > 0 {
            return Some(ShareInput::Url(rest[..end].to_string()));
        }
        return None;
    }

    if let Ok(code) = ShortCode::parse(trimmed) {
        return Some(ShareInput::Code(code));
    }

    if trimmed.len() >= 20 && trimmed.chars().all(is_base64url_char) {
        return Some(ShareInput::Raw(trimmed.to_string()));
    }

    None
}

/// Whether a compressed payload fits in a QR code once wrapped in the
/// snapshot URL.
pub fn fits_qr(code: &str) -> bool {
    code.len() + URL_PREFIX_CHARS < QR_CHAR_BUDGET
}

/// Human-readable summary of what a snapshot contains, shown before sending
/// and before importing.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPreview {
    pub contraction_count: usize,
    pub completed_count: usize,
    pub event_count: usize,
    /// "10:00 AM — 1:45 PM", or `None` with fewer than two contractions
    pub time_range: Option<String>,
    pub session_started: Option<chrono::DateTime<chrono::Utc>>,
    /// Settings categories travelling with the session
    pub included_categories: Vec<SharingCategory>,
}

/// Summarize a session and its shared settings for preview display.
pub fn preview(session: &SessionData, shared_settings: Option<&SettingsPatch>) -> SnapshotPreview {
    let completed = session
        .contractions
        .iter()
        .filter(|c| c.end.is_some())
        .count();

    let time_range = if session.contractions.len() >= 2 {
        let earliest = session.contractions.iter().map(|c| c.start).min();
        let latest = session.contractions.iter().map(|c| c.start).max();
        match (earliest, latest) {
            (Some(a), Some(b)) => Some(format!(
                "{} — {}",
                a.format("%-I:%M %p"),
                b.format("%-I:%M %p")
            )),
            _ => None,
        }
    } else {
        None
    };

    SnapshotPreview {
        contraction_count: session.contractions.len(),
        completed_count: completed,
        event_count: session.events.len(),
        time_range,
        session_started: session.session_started_at,
        included_categories: shared_settings.map(detect_categories).unwrap_or_default(),
    }
}
