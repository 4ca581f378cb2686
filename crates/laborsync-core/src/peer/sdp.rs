//! SDP offer/answer code compression.
//!
//! Handshake codes are `deflate → base64url` like snapshots, but carry a
//! role prefix (`lso.` for offers, `lsa.` for answers) so pasting an answer
//! where an offer belongs fails immediately with a clear message instead of
//! producing nonsense SDP.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{SnapshotError, SnapshotResult};

const OFFER_PREFIX: &str = "lso.";
const ANSWER_PREFIX: &str = "lsa.";

fn compress(sdp: &str, prefix: &str) -> String {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    // SDP is ASCII; write cannot fail into a Vec
    let _ = encoder.write_all(sdp.as_bytes());
    let compressed = encoder.finish().unwrap_or_default();
    format!("{prefix}{}", URL_SAFE_NO_PAD.encode(compressed))
}

fn decompress(code: &str, prefix: &str, role: &str) -> SnapshotResult<String> {
    let trimmed = code.trim();
    let body = trimmed.strip_prefix(prefix).ok_or_else(|| {
        SnapshotError::MalformedInput(format!(
            "not an {role} code: expected '{prefix}' prefix"
        ))
    })?;

    let compressed = URL_SAFE_NO_PAD
        .decode(body.trim_end_matches('='))
        .map_err(|e| SnapshotError::MalformedInput(format!("invalid {role} code: {e}")))?;

    let mut sdp = String::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_string(&mut sdp)
        .map_err(|e| {
            SnapshotError::MalformedInput(format!("corrupt {role} code: {e}"))
        })?;
    Ok(sdp)
}

pub fn compress_offer(sdp: &str) -> String {
    compress(sdp, OFFER_PREFIX)
}

pub fn decompress_offer(code: &str) -> SnapshotResult<String> {
    decompress(code, OFFER_PREFIX, "offer")
}

pub fn compress_answer(sdp: &str) -> String {
    compress(sdp, ANSWER_PREFIX)
}

pub fn decompress_answer(code: &str) -> SnapshotResult<String> {
    decompress(code, ANSWER_PREFIX, "answer")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SDP: &str = "v=0\r\no=- 42 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";

    #[test]
    fn test_offer_roundtrip() {
        let code = compress_offer(SAMPLE_SDP);
        assert!(code.starts_with("lso."));
        assert_eq!(decompress_offer(&code).unwrap(), SAMPLE_SDP);
    }

    #[test]
    fn test_answer_roundtrip() {
        let code = compress_answer(SAMPLE_SDP);
        assert!(code.starts_with("lsa."));
        assert_eq!(decompress_answer(&code).unwrap(), SAMPLE_SDP);
    }

    #[test]
    fn test_role_prefixes_are_not_interchangeable() {
        let offer = compress_offer(SAMPLE_SDP);
        let err = decompress_answer(&offer).unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedInput(_)));
        assert!(err.to_string().contains("lsa."));

        let answer = compress_answer(SAMPLE_SDP);
        assert!(decompress_offer(&answer).is_err());
    }

    #[test]
    fn test_corrupt_body_rejected() {
        assert!(decompress_offer("lso.%%%notbase64%%%").is_err());
        assert!(decompress_offer("lso.aGVsbG8gd29ybGQ").is_err());
    }

    #[test]
    fn test_code_is_smaller_than_sdp() {
        // Realistic SDP with candidate lines is highly repetitive
        let mut sdp = String::from(SAMPLE_SDP);
        for i in 0..12 {
            sdp.push_str(&format!(
                "a=candidate:{i} 1 udp 2122260223 192.168.1.{i} 5000{i} typ host\r\n"
            ));
        }
        let code = compress_offer(&sdp);
        assert!(code.len() < sdp.len());
    }
}
