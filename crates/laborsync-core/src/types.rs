//! Core session types for LaborSync
//!
//! A session is an ordered log of timed contractions plus discrete labor
//! events (water break, mucus plug, ...). The codec in [`crate::codec`]
//! reads and produces these values; it never mutates a session in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Where a contraction was felt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Front,
    Back,
    Wrapping,
}

impl Location {
    /// Fixed wire table: 1=front, 2=back, 3=wrapping (0 is "none").
    pub fn to_wire(loc: Option<Location>) -> u64 {
        match loc {
            None => 0,
            Some(Location::Front) => 1,
            Some(Location::Back) => 2,
            Some(Location::Wrapping) => 3,
        }
    }

    /// Unknown integers decode to `None` rather than failing.
    pub fn from_wire(n: u64) -> Option<Location> {
        match n {
            1 => Some(Location::Front),
            2 => Some(Location::Back),
            3 => Some(Location::Wrapping),
            _ => None,
        }
    }
}

/// Kind of labor event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    WaterBreak,
    MucusPlug,
    BloodyShow,
    Custom,
}

impl EventKind {
    /// Fixed wire table: 0=water-break, 1=mucus-plug, 2=bloody-show, 3=custom.
    pub fn to_wire(self) -> u64 {
        match self {
            EventKind::WaterBreak => 0,
            EventKind::MucusPlug => 1,
            EventKind::BloodyShow => 2,
            EventKind::Custom => 3,
        }
    }

    /// Unknown integers decode to `Custom` so snapshots from newer app
    /// versions still open.
    pub fn from_wire(n: u64) -> EventKind {
        match n {
            0 => EventKind::WaterBreak,
            1 => EventKind::MucusPlug,
            2 => EventKind::BloodyShow,
            _ => EventKind::Custom,
        }
    }
}

/// Identifier for a dashboard section. The set is closed; layout is a
/// permutation of all seven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionId {
    HospitalAdvisor,
    Summary,
    PatternAssessment,
    TrendAnalysis,
    WaveChart,
    Timeline,
    LaborGuide,
}

/// Default section ordering. Layout is omitted from the wire format when it
/// matches this exactly (length and order).
pub const DEFAULT_LAYOUT: [SectionId; 7] = [
    SectionId::HospitalAdvisor,
    SectionId::Summary,
    SectionId::PatternAssessment,
    SectionId::TrendAnalysis,
    SectionId::WaveChart,
    SectionId::Timeline,
    SectionId::LaborGuide,
];

impl SectionId {
    /// Fixed wire table; matches the order of [`DEFAULT_LAYOUT`].
    pub fn to_wire(self) -> u64 {
        match self {
            SectionId::HospitalAdvisor => 0,
            SectionId::Summary => 1,
            SectionId::PatternAssessment => 2,
            SectionId::TrendAnalysis => 3,
            SectionId::WaveChart => 4,
            SectionId::Timeline => 5,
            SectionId::LaborGuide => 6,
        }
    }

    /// Unknown integers decode to `Summary` as a safe fallback.
    pub fn from_wire(n: u64) -> SectionId {
        match n {
            0 => SectionId::HospitalAdvisor,
            1 => SectionId::Summary,
            2 => SectionId::PatternAssessment,
            3 => SectionId::TrendAnalysis,
            4 => SectionId::WaveChart,
            5 => SectionId::Timeline,
            6 => SectionId::LaborGuide,
            _ => SectionId::Summary,
        }
    }
}

/// Optional per-contraction phase timing captured by the live rating overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTiming {
    pub building: Option<f64>,
    pub peak: Option<f64>,
    pub easing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub peak_offset_sec: Option<f64>,
}

/// A single contraction.
///
/// `end == None` means the contraction is still in progress. Invariant:
/// when present, `end >= start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contraction {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Intensity rating 1-5 (or 1-3 when the intensity scale setting is 3)
    pub intensity: Option<u8>,
    pub location: Option<Location>,
    #[serde(default)]
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phases: Option<PhaseTiming>,
    /// Entered after the fact without live timing
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub untimed: bool,
    /// User closed the post-contraction rating prompt without rating
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub rating_dismissed: bool,
}

impl Contraction {
    /// Start a new contraction now (or at the given instant).
    pub fn begin(start: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            start,
            end: None,
            intensity: None,
            location: None,
            notes: String::new(),
            phases: None,
            untimed: false,
            rating_dismissed: false,
        }
    }

    /// Whether this contraction is still running.
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Duration in seconds; zero while still active.
    pub fn duration_seconds(&self) -> f64 {
        match self.end {
            Some(end) => ((end - self.start).num_milliseconds().max(0)) as f64 / 1000.0,
            None => 0.0,
        }
    }
}

/// A discrete labor event (water break etc.). Immutable once created except
/// via explicit user edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

impl LaborEvent {
    /// Record a new event at the given instant.
    pub fn record(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            kind,
            timestamp,
            notes: String::new(),
        }
    }
}

/// The full session state the codec operates on.
///
/// Contractions are kept chronological by start time, though user edits may
/// violate strict order; the codec does not enforce ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub contractions: Vec<Contraction>,
    pub events: Vec<LaborEvent>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub layout: Vec<SectionId>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pause_accumulated_ms: i64,
    /// Per-session settings overrides, if the user diverged from globals
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub overrides: Option<crate::settings::SettingsPatch>,
}

impl SessionData {
    /// A fresh session with the default layout and nothing recorded.
    pub fn empty() -> Self {
        Self {
            contractions: Vec::new(),
            events: Vec::new(),
            session_started_at: None,
            layout: DEFAULT_LAYOUT.to_vec(),
            paused: false,
            paused_at: None,
            pause_accumulated_ms: 0,
            overrides: None,
        }
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result shape supplied by the external labor-stage estimator.
///
/// The estimator itself is outside this crate; consumers receive this as
/// opaque input alongside a decoded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAssessment {
    /// Estimated stage name (`pre-labor`, `early`, `active`, `transition`),
    /// or `None` when there is not enough data
    pub labor_stage: Option<String>,
    /// Whether the 5-1-1 rule is currently met
    pub rule_511_met: bool,
    pub avg_interval_min: f64,
    pub avg_duration_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_contraction_begin_is_active() {
        let c = Contraction::begin(Utc::now());
        assert!(c.is_active());
        assert_eq!(c.duration_seconds(), 0.0);
        assert!(!c.id.is_empty());
    }

    #[test]
    fn test_contraction_duration() {
        let start = Utc.with_ymd_and_hms(2025, 2, 15, 10, 0, 0).unwrap();
        let mut c = Contraction::begin(start);
        c.end = Some(start + chrono::Duration::seconds(65));
        assert_eq!(c.duration_seconds(), 65.0);
        assert!(!c.is_active());
    }

    #[test]
    fn test_location_wire_roundtrip() {
        for loc in [Location::Front, Location::Back, Location::Wrapping] {
            assert_eq!(Location::from_wire(Location::to_wire(Some(loc))), Some(loc));
        }
        assert_eq!(Location::to_wire(None), 0);
        assert_eq!(Location::from_wire(0), None);
        assert_eq!(Location::from_wire(99), None);
    }

    #[test]
    fn test_event_kind_unknown_decodes_to_custom() {
        assert_eq!(EventKind::from_wire(3), EventKind::Custom);
        assert_eq!(EventKind::from_wire(42), EventKind::Custom);
        assert_eq!(EventKind::from_wire(0), EventKind::WaterBreak);
    }

    #[test]
    fn test_section_wire_table_matches_default_layout() {
        for (i, section) in DEFAULT_LAYOUT.iter().enumerate() {
            assert_eq!(section.to_wire(), i as u64);
            assert_eq!(SectionId::from_wire(i as u64), *section);
        }
        assert_eq!(SectionId::from_wire(200), SectionId::Summary);
    }

    #[test]
    fn test_session_json_uses_wire_names() {
        let start = Utc.with_ymd_and_hms(2025, 2, 15, 10, 0, 0).unwrap();
        let mut session = SessionData::empty();
        let mut c = Contraction::begin(start);
        c.location = Some(Location::Wrapping);
        session.contractions.push(c);
        session
            .events
            .push(LaborEvent::record(EventKind::WaterBreak, start));

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"wrapping\""));
        assert!(json.contains("\"water-break\""));
        assert!(json.contains("\"sessionStartedAt\""));

        let back: SessionData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
