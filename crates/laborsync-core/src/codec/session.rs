//! Positional-array session encoding (wire version 2).
//!
//! Contractions and events are stored as arrays with delta timestamps
//! relative to a base instant `t0`, enum-coded locations, and trailing
//! default trimming. This typically yields 50-80% smaller payloads before
//! the deflate stage even runs.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{SnapshotError, SnapshotResult};
use crate::settings::SettingsPatch;
use crate::types::{
    Contraction, EventKind, LaborEvent, Location, PhaseTiming, SectionId, SessionData,
    DEFAULT_LAYOUT,
};

use super::settings::{decode_settings, encode_settings, CompactSettings};

/// Compact v2 wire format. Single-letter keys are the wire contract.
///
/// Each contraction array is
/// `[id, startDelta, endDelta|null, intensity|null, locationEnum, notes,
/// phases|null, flags]` with trailing defaults trimmed (minimum length 2);
/// each event array is `[id, timestampDelta, typeEnum, notes]` (minimum
/// length 3). Deltas are ms offsets from `t0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactV2 {
    /// Format version, always 2
    pub v: u8,
    /// Base epoch ms all deltas are relative to
    pub t0: i64,
    /// Contractions as positional arrays
    pub c: Vec<Vec<Value>>,
    /// Events as positional arrays (omitted when empty)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub e: Option<Vec<Vec<Value>>>,
    /// Paused flag (omitted when false)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub p: Option<bool>,
    /// Paused-at instant as delta from t0
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pa: Option<i64>,
    /// Accumulated pause milliseconds
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pm: Option<i64>,
    /// Layout as section indices (omitted when it matches the default)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub l: Option<Vec<u64>>,
    /// Legacy raw shared settings; still accepted on decode
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub s: Option<SettingsPatch>,
    /// Compressed shared settings; preferred over `s`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sk: Option<CompactSettings>,
}

/// Output of [`decode_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSession {
    pub session: SessionData,
    /// Shared settings carried alongside the session, if any
    pub shared_settings: Option<SettingsPatch>,
}

/// Whether a positional slot holds a trimmable default (null, 0, or "").
fn is_trim_default(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Trim trailing defaults from a positional array, but never below
/// `min_len`: required leading fields stay even when they hold defaults.
fn trim_trailing(mut arr: Vec<Value>, min_len: usize) -> Vec<Value> {
    while arr.len() > min_len {
        if is_trim_default(arr.last().unwrap_or(&Value::Null)) {
            arr.pop();
        } else {
            break;
        }
    }
    arr
}

fn encode_contraction(c: &Contraction, t0: i64) -> Vec<Value> {
    let start_delta = c.start.timestamp_millis() - t0;
    let end_delta = c.end.map(|e| e.timestamp_millis() - t0);

    let phases = c.phases.map(|p| {
        json!([
            p.building,
            p.peak,
            p.easing,
            p.peak_offset_sec,
        ])
    });

    let mut flags = 0u64;
    if c.untimed {
        flags |= 1;
    }
    if c.rating_dismissed {
        flags |= 2;
    }

    let raw = vec![
        json!(c.id),
        json!(start_delta),
        json!(end_delta),
        json!(c.intensity),
        json!(Location::to_wire(c.location)),
        json!(c.notes),
        phases.unwrap_or(Value::Null),
        json!(flags),
    ];

    // min_len=2 keeps id and startDelta
    trim_trailing(raw, 2)
}

fn encode_event(e: &LaborEvent, t0: i64) -> Vec<Value> {
    let ts_delta = e.timestamp.timestamp_millis() - t0;
    let raw = vec![
        json!(e.id),
        json!(ts_delta),
        json!(e.kind.to_wire()),
        json!(e.notes),
    ];
    // min_len=3 keeps id, timestamp, and type (type 0 is meaningful)
    trim_trailing(raw, 3)
}

fn layout_matches_default(layout: &[SectionId]) -> bool {
    layout.len() == DEFAULT_LAYOUT.len() && layout.iter().zip(DEFAULT_LAYOUT.iter()).all(|(a, b)| a == b)
}

/// Resolve milliseconds-since-epoch into a UTC instant.
fn from_epoch_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Encode a session plus optional shared settings into the compact v2 form.
///
/// The base instant `t0` is the session start when known, otherwise the
/// first contraction's start, otherwise now.
pub fn encode_session(session: &SessionData, shared_settings: Option<&SettingsPatch>) -> CompactV2 {
    let t0 = session
        .session_started_at
        .map(|t| t.timestamp_millis())
        .or_else(|| {
            session
                .contractions
                .first()
                .map(|c| c.start.timestamp_millis())
        })
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    let mut compact = CompactV2 {
        v: 2,
        t0,
        c: session
            .contractions
            .iter()
            .map(|c| encode_contraction(c, t0))
            .collect(),
        e: None,
        p: None,
        pa: None,
        pm: None,
        l: None,
        s: None,
        sk: None,
    };

    if !session.events.is_empty() {
        compact.e = Some(session.events.iter().map(|e| encode_event(e, t0)).collect());
    }

    if session.paused {
        compact.p = Some(true);
    }

    if let Some(paused_at) = session.paused_at {
        compact.pa = Some(paused_at.timestamp_millis() - t0);
    }

    if session.pause_accumulated_ms > 0 {
        compact.pm = Some(session.pause_accumulated_ms);
    }

    if !layout_matches_default(&session.layout) {
        compact.l = Some(session.layout.iter().map(|s| s.to_wire()).collect());
    }

    if let Some(patch) = shared_settings {
        if !patch.is_empty() {
            compact.sk = Some(encode_settings(patch));
        }
    }

    compact
}

fn decode_contraction(arr: &[Value], t0: i64) -> SnapshotResult<Contraction> {
    if arr.len() < 2 {
        return Err(SnapshotError::MalformedInput(format!(
            "contraction array too short: {} fields",
            arr.len()
        )));
    }

    let id = arr[0].as_str().unwrap_or_default().to_string();
    let start_delta = arr[1].as_i64().ok_or_else(|| {
        SnapshotError::MalformedInput("contraction start delta is not an integer".to_string())
    })?;
    let end_delta = arr.get(2).and_then(Value::as_i64);
    let intensity = arr.get(3).and_then(Value::as_u64).map(|n| n as u8);
    let loc_enum = arr.get(4).and_then(Value::as_u64).unwrap_or(0);
    let notes = arr
        .get(5)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let phases = arr.get(6).and_then(Value::as_array).map(|p| PhaseTiming {
        building: p.first().and_then(Value::as_f64),
        peak: p.get(1).and_then(Value::as_f64),
        easing: p.get(2).and_then(Value::as_f64),
        peak_offset_sec: p.get(3).and_then(Value::as_f64),
    });
    let flags = arr.get(7).and_then(Value::as_u64).unwrap_or(0);

    Ok(Contraction {
        id,
        start: from_epoch_ms(t0 + start_delta),
        end: end_delta.map(|d| from_epoch_ms(t0 + d)),
        intensity,
        location: Location::from_wire(loc_enum),
        notes,
        phases,
        untimed: flags & 1 != 0,
        rating_dismissed: flags & 2 != 0,
    })
}

fn decode_event(arr: &[Value], t0: i64) -> SnapshotResult<LaborEvent> {
    if arr.len() < 3 {
        return Err(SnapshotError::MalformedInput(format!(
            "event array too short: {} fields",
            arr.len()
        )));
    }

    let id = arr[0].as_str().unwrap_or_default().to_string();
    let ts_delta = arr[1].as_i64().ok_or_else(|| {
        SnapshotError::MalformedInput("event timestamp delta is not an integer".to_string())
    })?;
    let kind = EventKind::from_wire(arr[2].as_u64().unwrap_or(3));
    let notes = arr
        .get(3)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(LaborEvent {
        id,
        kind,
        timestamp: from_epoch_ms(t0 + ts_delta),
        notes,
    })
}

/// Decode the compact v2 form back into a session and optional shared
/// settings. Compressed settings (`sk`) win over the legacy raw form (`s`)
/// when both are present.
pub fn decode_session(compact: &CompactV2) -> SnapshotResult<DecodedSession> {
    let t0 = compact.t0;

    let contractions = compact
        .c
        .iter()
        .map(|arr| decode_contraction(arr, t0))
        .collect::<SnapshotResult<Vec<_>>>()?;

    let events = compact
        .e
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|arr| decode_event(arr, t0))
        .collect::<SnapshotResult<Vec<_>>>()?;

    let layout = match &compact.l {
        Some(indices) => indices.iter().map(|&n| SectionId::from_wire(n)).collect(),
        None => DEFAULT_LAYOUT.to_vec(),
    };

    let session = SessionData {
        contractions,
        events,
        session_started_at: Some(from_epoch_ms(t0)),
        layout,
        paused: compact.p == Some(true),
        paused_at: compact.pa.map(|d| from_epoch_ms(t0 + d)),
        pause_accumulated_ms: compact.pm.unwrap_or(0),
        overrides: None,
    };

    let shared_settings = match (&compact.sk, &compact.s) {
        (Some(sk), _) => Some(decode_settings(sk)),
        (None, Some(s)) => Some(s.clone()),
        (None, None) => None,
    };

    Ok(DecodedSession {
        session,
        shared_settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 15, 10, 0, 0).unwrap()
    }

    fn sample_session() -> SessionData {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);

        let mut a = Contraction::begin(t);
        a.id = "c1".to_string();
        a.end = Some(t + chrono::Duration::seconds(60));
        a.intensity = Some(3);
        a.location = Some(Location::Back);
        a.notes = "strong".to_string();

        let mut b = Contraction::begin(t + chrono::Duration::minutes(8));
        b.id = "c2".to_string();

        session.contractions = vec![a, b];
        session.events = vec![LaborEvent {
            id: "e1".to_string(),
            kind: EventKind::WaterBreak,
            timestamp: t + chrono::Duration::minutes(4),
            notes: String::new(),
        }];
        session
    }

    #[test]
    fn test_roundtrip_preserves_session() {
        let session = sample_session();
        let compact = encode_session(&session, None);
        assert_eq!(compact.v, 2);

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.session.contractions, session.contractions);
        assert_eq!(decoded.session.events, session.events);
        assert_eq!(decoded.session.layout, session.layout);
        assert_eq!(decoded.session.session_started_at, session.session_started_at);
        assert!(decoded.shared_settings.is_none());
    }

    #[test]
    fn test_minimal_contraction_trims_to_two_fields() {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        let mut c = Contraction::begin(t + chrono::Duration::minutes(1));
        c.id = "c1".to_string();
        session.contractions = vec![c];

        let compact = encode_session(&session, None);
        assert_eq!(compact.c[0].len(), 2);
        assert_eq!(compact.c[0][0], json!("c1"));
        assert_eq!(compact.c[0][1], json!(60_000));
    }

    #[test]
    fn test_contraction_with_trailing_location_trims_to_five_fields() {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        let mut c = Contraction::begin(t + chrono::Duration::minutes(1));
        c.id = "c1".to_string();
        c.end = Some(t + chrono::Duration::seconds(110));
        c.location = Some(Location::Back);
        session.contractions = vec![c.clone()];

        let compact = encode_session(&session, None);
        // notes, phases, and flags are all default, so the row stops at the
        // location enum
        assert_eq!(compact.c[0].len(), 5);
        assert_eq!(compact.c[0][4], json!(2));

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.session.contractions[0], c);
    }

    #[test]
    fn test_full_contraction_keeps_all_fields() {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        let mut c = Contraction::begin(t);
        c.id = "c1".to_string();
        c.end = Some(t + chrono::Duration::seconds(70));
        c.intensity = Some(4);
        c.location = Some(Location::Wrapping);
        c.notes = "peak early".to_string();
        c.phases = Some(PhaseTiming {
            building: Some(20.0),
            peak: Some(30.0),
            easing: Some(20.0),
            peak_offset_sec: None,
        });
        c.untimed = true;
        c.rating_dismissed = true;
        session.contractions = vec![c.clone()];

        let compact = encode_session(&session, None);
        assert_eq!(compact.c[0].len(), 8);
        assert_eq!(compact.c[0][7], json!(3)); // both flag bits

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.session.contractions[0], c);
    }

    #[test]
    fn test_active_contraction_roundtrips_open_end() {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        let mut c = Contraction::begin(t + chrono::Duration::minutes(2));
        c.id = "c1".to_string();
        c.intensity = Some(2);
        session.contractions = vec![c];

        let compact = encode_session(&session, None);
        // end slot must survive as an explicit null so intensity keeps its
        // position
        assert_eq!(compact.c[0].len(), 4);
        assert_eq!(compact.c[0][2], Value::Null);

        let decoded = decode_session(&compact).unwrap();
        assert!(decoded.session.contractions[0].is_active());
        assert_eq!(decoded.session.contractions[0].intensity, Some(2));
    }

    #[test]
    fn test_event_keeps_type_zero() {
        let session = sample_session();
        let compact = encode_session(&session, None);
        let events = compact.e.as_ref().unwrap();
        // water-break is enum 0; min length protects it from trimming
        assert_eq!(events[0].len(), 3);
        assert_eq!(events[0][2], json!(0));
    }

    #[test]
    fn test_default_layout_omitted_custom_layout_kept() {
        let mut session = sample_session();
        assert_eq!(encode_session(&session, None).l, None);

        session.layout.swap(0, 4);
        let compact = encode_session(&session, None);
        assert_eq!(compact.l.as_ref().unwrap()[0], 4);

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.session.layout, session.layout);
    }

    #[test]
    fn test_pause_fields() {
        let t = base();
        let mut session = sample_session();
        session.paused = true;
        session.paused_at = Some(t + chrono::Duration::minutes(10));
        session.pause_accumulated_ms = 30_000;

        let compact = encode_session(&session, None);
        assert_eq!(compact.p, Some(true));
        assert_eq!(compact.pa, Some(600_000));
        assert_eq!(compact.pm, Some(30_000));

        let decoded = decode_session(&compact).unwrap();
        assert!(decoded.session.paused);
        assert_eq!(decoded.session.paused_at, session.paused_at);
        assert_eq!(decoded.session.pause_accumulated_ms, 30_000);

        // Unpaused sessions omit all three keys
        let json = serde_json::to_string(&encode_session(&sample_session(), None)).unwrap();
        assert!(!json.contains("\"p\":"));
        assert!(!json.contains("\"pa\":"));
        assert!(!json.contains("\"pm\":"));
    }

    #[test]
    fn test_t0_falls_back_to_first_contraction() {
        let t = base();
        let mut session = SessionData::empty();
        let mut c = Contraction::begin(t);
        c.id = "c1".to_string();
        session.contractions = vec![c];

        let compact = encode_session(&session, None);
        assert_eq!(compact.t0, t.timestamp_millis());
        assert_eq!(compact.c[0][1], json!(0));
    }

    #[test]
    fn test_shared_settings_travel_compressed() {
        let session = sample_session();
        let patch = SettingsPatch {
            parity: Some(crate::settings::Parity::Subsequent),
            theme: Some("clinical".to_string()),
            ..Default::default()
        };

        let compact = encode_session(&session, Some(&patch));
        assert!(compact.sk.is_some());
        assert!(compact.s.is_none());

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.shared_settings, Some(patch));
    }

    #[test]
    fn test_empty_settings_patch_omitted() {
        let compact = encode_session(&sample_session(), Some(&SettingsPatch::default()));
        assert!(compact.sk.is_none());
    }

    #[test]
    fn test_legacy_raw_settings_still_decode() {
        let mut compact = encode_session(&sample_session(), None);
        compact.s = Some(SettingsPatch {
            theme: Some("night".to_string()),
            ..Default::default()
        });

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(
            decoded.shared_settings.unwrap().theme.as_deref(),
            Some("night")
        );
    }

    #[test]
    fn test_malformed_arrays_rejected() {
        let mut compact = encode_session(&sample_session(), None);
        compact.c.push(vec![json!("lonely")]);
        assert!(matches!(
            decode_session(&compact),
            Err(SnapshotError::MalformedInput(_))
        ));

        let mut compact = encode_session(&sample_session(), None);
        compact.e = Some(vec![vec![json!("e9"), json!(1000)]]);
        assert!(matches!(
            decode_session(&compact),
            Err(SnapshotError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_unknown_enums_degrade_safely() {
        let mut compact = encode_session(&sample_session(), None);
        compact.c[0] = vec![json!("c1"), json!(0), Value::Null, Value::Null, json!(42)];
        compact.e = Some(vec![vec![json!("e1"), json!(0), json!(99)]]);
        compact.l = Some(vec![0, 1, 2, 3, 4, 5, 77]);

        let decoded = decode_session(&compact).unwrap();
        assert_eq!(decoded.session.contractions[0].location, None);
        assert_eq!(decoded.session.events[0].kind, EventKind::Custom);
        assert_eq!(decoded.session.layout[6], SectionId::Summary);
    }

    #[test]
    fn test_compact_json_beats_naive_by_40_percent() {
        let t = base();
        let mut session = SessionData::empty();
        session.session_started_at = Some(t);
        for i in 0..20 {
            let start = t + chrono::Duration::minutes(i * 7);
            let mut c = Contraction::begin(start);
            c.id = format!("{:026}", i);
            c.end = Some(start + chrono::Duration::seconds(55 + i));
            c.intensity = Some((i % 5 + 1) as u8);
            c.location = Some(Location::Front);
            session.contractions.push(c);
        }

        let naive = serde_json::to_string(&session).unwrap();
        let compact = serde_json::to_string(&encode_session(&session, None)).unwrap();
        tracing::debug!(naive = naive.len(), compact = compact.len(), "session size");
        assert!(compact.len() * 10 <= naive.len() * 6);
    }
}
