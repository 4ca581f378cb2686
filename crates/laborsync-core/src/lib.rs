//! LaborSync Core Library
//!
//! Compact session codec and peer-to-peer snapshot sharing for a labor
//! contraction timer.
//!
//! ## Overview
//!
//! A session is a growing log of timed contractions and discrete labor
//! events. This crate encodes it into a minimal positional wire format,
//! compresses it (deflate + base64url), and moves it over three channels:
//!
//! - **URL fragment**: the payload rides in `#snapshot=...`, which never
//!   reaches any server
//! - **Relay short code**: a speakable `blue-tiger-42` code resolved through
//!   a hashed routing key on a short-TTL relay
//! - **Signaling-free peer channel**: a direct data channel established by
//!   manually exchanging two compressed SDP codes
//!
//! Settings travel alongside sessions in category-filtered, bitfield-packed
//! form, so "share my thresholds but not my provider's phone number" works
//! in both directions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use laborsync_core::snapshot;
//!
//! let code = snapshot::compress_session(&session, None)?;
//! let url = snapshot::snapshot_url(&code);
//!
//! let received = snapshot::decompress_session(&code)?;
//! assert_eq!(received.session, session);
//! ```

#![allow(async_fn_in_trait)]

pub mod codec;
pub mod error;
pub mod peer;
pub mod qr;
pub mod relay;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod types;

// Re-exports
pub use codec::{decode_session, encode_session, CompactV2, DecodedSession};
pub use error::{SnapshotError, SnapshotResult};
pub use relay::{RelayClient, ShortCode};
pub use settings::{Settings, SettingsPatch, SharingCategory, SharingPreferences};
pub use snapshot::{
    classify_share_input, compress_session, decompress_session, fits_qr, preview, snapshot_url,
    DecompressedSnapshot, ShareInput, SnapshotPreview,
};
pub use storage::Storage;
pub use types::{Contraction, EventKind, LaborEvent, Location, SectionId, SessionData};
