//! Settings model: the full settings record, its partial (patch) form, and
//! the sharing categories used when settings travel inside a snapshot.
//!
//! The patch form is load-bearing: every field is `Option`, because callers
//! must be able to tell "setting was explicitly false" from "setting was not
//! part of this payload" when selectively importing shared settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The 5-1-1 style threshold: contractions `interval_minutes` apart, lasting
/// `duration_seconds`, sustained for `sustained_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub interval_minutes: f64,
    pub duration_seconds: f64,
    pub sustained_minutes: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5.0,
            duration_seconds: 60.0,
            sustained_minutes: 60.0,
        }
    }
}

/// Per-stage pattern thresholds used by the stage estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageThreshold {
    pub max_interval_min: f64,
    pub min_duration_sec: f64,
}

/// Default stage thresholds keyed by stage name.
pub fn default_stage_thresholds() -> BTreeMap<String, StageThreshold> {
    BTreeMap::from([
        (
            "pre-labor".to_string(),
            StageThreshold {
                max_interval_min: 30.0,
                min_duration_sec: 0.0,
            },
        ),
        (
            "early".to_string(),
            StageThreshold {
                max_interval_min: 20.0,
                min_duration_sec: 30.0,
            },
        ),
        (
            "active".to_string(),
            StageThreshold {
                max_interval_min: 5.0,
                min_duration_sec: 45.0,
            },
        ),
        (
            "transition".to_string(),
            StageThreshold {
                max_interval_min: 3.0,
                min_duration_sec: 60.0,
            },
        ),
    ])
}

/// Braxton-Hicks assessment tuning. Eight fields, flattened to a fixed-order
/// array on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BhThresholds {
    pub regularity_cv_low: f64,
    pub regularity_cv_high: f64,
    pub location_ratio_high: f64,
    pub location_ratio_low: f64,
    pub sustained_min_minutes: f64,
    pub sustained_max_gap_minutes: f64,
    pub verdict_real_threshold: f64,
    pub verdict_bh_threshold: f64,
}

impl Default for BhThresholds {
    fn default() -> Self {
        Self {
            regularity_cv_low: 0.25,
            regularity_cv_high: 0.6,
            location_ratio_high: 0.6,
            location_ratio_low: 0.2,
            sustained_min_minutes: 120.0,
            sustained_max_gap_minutes: 30.0,
            verdict_real_threshold: 60.0,
            verdict_bh_threshold: 30.0,
        }
    }
}

/// Risk appetite for hospital departure timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    Conservative,
    Moderate,
    Relaxed,
}

impl RiskAppetite {
    pub fn to_wire(self) -> u64 {
        match self {
            RiskAppetite::Conservative => 0,
            RiskAppetite::Moderate => 1,
            RiskAppetite::Relaxed => 2,
        }
    }

    pub fn from_wire(n: u64) -> RiskAppetite {
        match n {
            0 => RiskAppetite::Conservative,
            2 => RiskAppetite::Relaxed,
            _ => RiskAppetite::Moderate,
        }
    }
}

/// Hospital advisor configuration (full form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalAdvisorConfig {
    pub travel_time_minutes: i64,
    pub travel_time_uncertain: bool,
    pub risk_appetite: RiskAppetite,
    pub provider_phone: String,
}

impl Default for HospitalAdvisorConfig {
    fn default() -> Self {
        Self {
            travel_time_minutes: 0,
            travel_time_uncertain: false,
            risk_appetite: RiskAppetite::Moderate,
            provider_phone: String::new(),
        }
    }
}

/// Hospital advisor partial form. Provider phone and the travel fields live
/// in the same record but belong to different sharing categories, so each is
/// independently optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalAdvisorPatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub travel_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub travel_time_uncertain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub risk_appetite: Option<RiskAppetite>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provider_phone: Option<String>,
}

impl HospitalAdvisorPatch {
    pub fn is_empty(&self) -> bool {
        self.travel_time_minutes.is_none()
            && self.travel_time_uncertain.is_none()
            && self.risk_appetite.is_none()
            && self.provider_phone.is_none()
    }
}

/// Hero panel display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeroMode {
    StageBadge,
    ActionCard,
    CompactTimer,
}

impl HeroMode {
    pub fn to_wire(self) -> u64 {
        match self {
            HeroMode::StageBadge => 0,
            HeroMode::ActionCard => 1,
            HeroMode::CompactTimer => 2,
        }
    }

    pub fn from_wire(n: u64) -> HeroMode {
        match n {
            1 => HeroMode::ActionCard,
            2 => HeroMode::CompactTimer,
            _ => HeroMode::StageBadge,
        }
    }
}

/// Hospital advisor presentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorMode {
    Range,
    Urgency,
    Minimal,
}

impl AdvisorMode {
    pub fn to_wire(self) -> u64 {
        match self {
            AdvisorMode::Range => 0,
            AdvisorMode::Urgency => 1,
            AdvisorMode::Minimal => 2,
        }
    }

    pub fn from_wire(n: u64) -> AdvisorMode {
        match n {
            1 => AdvisorMode::Urgency,
            2 => AdvisorMode::Minimal,
            _ => AdvisorMode::Range,
        }
    }
}

/// First baby or not; labor typically progresses faster after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Parity {
    FirstBaby,
    Subsequent,
}

impl Parity {
    pub fn to_wire(self) -> u64 {
        match self {
            Parity::FirstBaby => 0,
            Parity::Subsequent => 1,
        }
    }

    pub fn from_wire(n: u64) -> Parity {
        if n == 1 {
            Parity::Subsequent
        } else {
            Parity::FirstBaby
        }
    }
}

/// Clock display format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "24h")]
    H24,
}

impl TimeFormat {
    pub fn to_wire(self) -> u64 {
        match self {
            TimeFormat::H12 => 0,
            TimeFormat::H24 => 1,
        }
    }

    pub fn from_wire(n: u64) -> TimeFormat {
        if n == 1 {
            TimeFormat::H24
        } else {
            TimeFormat::H12
        }
    }
}

/// Which instant stage-time estimates are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageTimeBasis {
    LastRecorded,
    CurrentTime,
}

impl StageTimeBasis {
    pub fn to_wire(self) -> u64 {
        match self {
            StageTimeBasis::LastRecorded => 0,
            StageTimeBasis::CurrentTime => 1,
        }
    }

    pub fn from_wire(n: u64) -> StageTimeBasis {
        if n == 1 {
            StageTimeBasis::CurrentTime
        } else {
            StageTimeBasis::LastRecorded
        }
    }
}

/// Assumed labor progression rate for departure-window estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionRate {
    Slower,
    Average,
    Faster,
}

impl ProgressionRate {
    pub fn to_wire(self) -> u64 {
        match self {
            ProgressionRate::Slower => 0,
            ProgressionRate::Average => 1,
            ProgressionRate::Faster => 2,
        }
    }

    pub fn from_wire(n: u64) -> ProgressionRate {
        match n {
            1 => ProgressionRate::Average,
            2 => ProgressionRate::Faster,
            _ => ProgressionRate::Slower,
        }
    }
}

/// Water-break reference statistics, shown in the water-break info panel.
/// Four ordered display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterBreakStats {
    pub before_contractions: String,
    pub during_labor: String,
    pub labor_within_12_hours: String,
    pub labor_within_24_hours: String,
}

impl Default for WaterBreakStats {
    fn default() -> Self {
        Self {
            before_contractions: "8-10%".to_string(),
            during_labor: "~90%".to_string(),
            labor_within_12_hours: "~50%".to_string(),
            labor_within_24_hours: "~75%".to_string(),
        }
    }
}

/// The fixed, closed set of sharing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharingCategory {
    Thresholds,
    Provider,
    Layout,
    Parity,
    Travel,
    Appearance,
}

impl SharingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingCategory::Thresholds => "thresholds",
            SharingCategory::Provider => "provider",
            SharingCategory::Layout => "layout",
            SharingCategory::Parity => "parity",
            SharingCategory::Travel => "travel",
            SharingCategory::Appearance => "appearance",
        }
    }
}

/// All categories in bitfield order. Append-only; the `sp` wire bitfield
/// indexes into this order.
pub const SHARING_CATEGORIES: [SharingCategory; 6] = [
    SharingCategory::Thresholds,
    SharingCategory::Provider,
    SharingCategory::Layout,
    SharingCategory::Parity,
    SharingCategory::Travel,
    SharingCategory::Appearance,
];

/// Which categories a user has opted to share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct SharingPreferences {
    pub thresholds: bool,
    pub provider: bool,
    pub layout: bool,
    pub parity: bool,
    pub travel: bool,
    pub appearance: bool,
}

impl SharingPreferences {
    /// No categories enabled.
    pub fn none() -> Self {
        Self {
            thresholds: false,
            provider: false,
            layout: false,
            parity: false,
            travel: false,
            appearance: false,
        }
    }

    /// All categories enabled.
    pub fn all() -> Self {
        Self {
            thresholds: true,
            provider: true,
            layout: true,
            parity: true,
            travel: true,
            appearance: true,
        }
    }

    pub fn get(&self, cat: SharingCategory) -> bool {
        match cat {
            SharingCategory::Thresholds => self.thresholds,
            SharingCategory::Provider => self.provider,
            SharingCategory::Layout => self.layout,
            SharingCategory::Parity => self.parity,
            SharingCategory::Travel => self.travel,
            SharingCategory::Appearance => self.appearance,
        }
    }

    pub fn set(&mut self, cat: SharingCategory, enabled: bool) {
        match cat {
            SharingCategory::Thresholds => self.thresholds = enabled,
            SharingCategory::Provider => self.provider = enabled,
            SharingCategory::Layout => self.layout = enabled,
            SharingCategory::Parity => self.parity = enabled,
            SharingCategory::Travel => self.travel = enabled,
            SharingCategory::Appearance => self.appearance = enabled,
        }
    }
}

impl Default for SharingPreferences {
    /// Share thresholds, provider, and layout by default.
    fn default() -> Self {
        Self {
            thresholds: true,
            provider: true,
            layout: true,
            parity: false,
            travel: false,
            appearance: false,
        }
    }
}

/// The full settings record with application defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub show_wave_chart: bool,
    pub show_timeline: bool,
    pub show_summary_cards: bool,
    pub show_progression_insight: bool,
    pub show_post_rating: bool,
    pub show_intensity_picker: bool,
    pub show_location_picker: bool,
    pub show_rest_seconds: bool,
    pub show_hospital_advisor: bool,
    pub show_contextual_tips: bool,
    pub show_braxton_hicks_assessment: bool,
    pub show_clinical_reference: bool,
    pub show_water_break_button: bool,
    pub show_threshold_rule: bool,
    pub show_live_rating: bool,
    pub show_chart_overlay: bool,
    pub show_prayers: bool,
    pub haptic_feedback: bool,
    pub persist_pause: bool,
    pub enable_debug_log: bool,

    pub threshold: ThresholdConfig,
    pub stage_thresholds: BTreeMap<String, StageThreshold>,
    pub bh_thresholds: BhThresholds,
    /// Either 3 or 5
    pub intensity_scale: u8,
    pub hospital_advisor: HospitalAdvisorConfig,
    pub hero_mode: HeroMode,
    pub advisor_mode: AdvisorMode,
    pub parity: Parity,
    pub time_format: TimeFormat,
    pub stage_time_basis: StageTimeBasis,
    pub advisor_progression_rate: ProgressionRate,
    pub theme: String,
    pub wave_chart_height: u32,
    pub chart_gap_threshold_min: u32,
    pub sharing_preferences: SharingPreferences,
    pub water_break_stats: WaterBreakStats,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_wave_chart: true,
            show_timeline: true,
            show_summary_cards: true,
            show_progression_insight: true,
            show_post_rating: true,
            show_intensity_picker: true,
            show_location_picker: true,
            show_rest_seconds: false,
            show_hospital_advisor: true,
            show_contextual_tips: true,
            show_braxton_hicks_assessment: true,
            show_clinical_reference: true,
            show_water_break_button: true,
            show_threshold_rule: true,
            show_live_rating: false,
            show_chart_overlay: false,
            show_prayers: false,
            haptic_feedback: true,
            persist_pause: true,
            enable_debug_log: false,
            threshold: ThresholdConfig::default(),
            stage_thresholds: default_stage_thresholds(),
            bh_thresholds: BhThresholds::default(),
            intensity_scale: 5,
            hospital_advisor: HospitalAdvisorConfig::default(),
            hero_mode: HeroMode::StageBadge,
            advisor_mode: AdvisorMode::Range,
            parity: Parity::FirstBaby,
            time_format: TimeFormat::H12,
            stage_time_basis: StageTimeBasis::LastRecorded,
            advisor_progression_rate: ProgressionRate::Slower,
            theme: "warm".to_string(),
            wave_chart_height: 120,
            chart_gap_threshold_min: 0,
            sharing_preferences: SharingPreferences::default(),
            water_break_stats: WaterBreakStats::default(),
        }
    }
}

/// Partial settings: the shape that travels inside snapshots and that
/// selective import works on. A field is shared/applied iff it is `Some`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_wave_chart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_timeline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_summary_cards: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_progression_insight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_post_rating: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_intensity_picker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_location_picker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_rest_seconds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_hospital_advisor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_contextual_tips: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_braxton_hicks_assessment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_clinical_reference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_water_break_button: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_threshold_rule: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_live_rating: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_chart_overlay: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub show_prayers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub haptic_feedback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub persist_pause: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub enable_debug_log: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub threshold: Option<ThresholdConfig>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stage_thresholds: Option<BTreeMap<String, StageThreshold>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bh_thresholds: Option<BhThresholds>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intensity_scale: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hospital_advisor: Option<HospitalAdvisorPatch>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hero_mode: Option<HeroMode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub advisor_mode: Option<AdvisorMode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parity: Option<Parity>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time_format: Option<TimeFormat>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stage_time_basis: Option<StageTimeBasis>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub advisor_progression_rate: Option<ProgressionRate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub wave_chart_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chart_gap_threshold_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sharing_preferences: Option<SharingPreferences>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub water_break_stats: Option<WaterBreakStats>,
}

impl SettingsPatch {
    /// No fields set at all.
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Apply every present field onto `target`. Hospital advisor fields merge
    /// individually; everything else replaces wholesale.
    pub fn merge_into(&self, target: &mut Settings) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field.clone() { target.$field = v; })*
            };
        }
        apply!(
            show_wave_chart,
            show_timeline,
            show_summary_cards,
            show_progression_insight,
            show_post_rating,
            show_intensity_picker,
            show_location_picker,
            show_rest_seconds,
            show_hospital_advisor,
            show_contextual_tips,
            show_braxton_hicks_assessment,
            show_clinical_reference,
            show_water_break_button,
            show_threshold_rule,
            show_live_rating,
            show_chart_overlay,
            show_prayers,
            haptic_feedback,
            persist_pause,
            enable_debug_log,
            threshold,
            stage_thresholds,
            bh_thresholds,
            intensity_scale,
            hero_mode,
            advisor_mode,
            parity,
            time_format,
            stage_time_basis,
            advisor_progression_rate,
            theme,
            wave_chart_height,
            chart_gap_threshold_min,
            sharing_preferences,
            water_break_stats,
        );

        if let Some(ha) = &self.hospital_advisor {
            if let Some(v) = ha.travel_time_minutes {
                target.hospital_advisor.travel_time_minutes = v;
            }
            if let Some(v) = ha.travel_time_uncertain {
                target.hospital_advisor.travel_time_uncertain = v;
            }
            if let Some(v) = ha.risk_appetite {
                target.hospital_advisor.risk_appetite = v;
            }
            if let Some(v) = &ha.provider_phone {
                target.hospital_advisor.provider_phone = v.clone();
            }
        }
    }

    /// Lay this patch over another patch. Present fields win; hospital
    /// advisor fields merge individually as in [`merge_into`](Self::merge_into).
    pub fn overlay(&self, target: &mut SettingsPatch) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.is_some() { target.$field = self.$field.clone(); })*
            };
        }
        apply!(
            show_wave_chart,
            show_timeline,
            show_summary_cards,
            show_progression_insight,
            show_post_rating,
            show_intensity_picker,
            show_location_picker,
            show_rest_seconds,
            show_hospital_advisor,
            show_contextual_tips,
            show_braxton_hicks_assessment,
            show_clinical_reference,
            show_water_break_button,
            show_threshold_rule,
            show_live_rating,
            show_chart_overlay,
            show_prayers,
            haptic_feedback,
            persist_pause,
            enable_debug_log,
            threshold,
            stage_thresholds,
            bh_thresholds,
            intensity_scale,
            hero_mode,
            advisor_mode,
            parity,
            time_format,
            stage_time_basis,
            advisor_progression_rate,
            theme,
            wave_chart_height,
            chart_gap_threshold_min,
            sharing_preferences,
            water_break_stats,
        );

        if let Some(ha) = &self.hospital_advisor {
            let merged = target.hospital_advisor.get_or_insert_with(Default::default);
            if ha.travel_time_minutes.is_some() {
                merged.travel_time_minutes = ha.travel_time_minutes;
            }
            if ha.travel_time_uncertain.is_some() {
                merged.travel_time_uncertain = ha.travel_time_uncertain;
            }
            if ha.risk_appetite.is_some() {
                merged.risk_appetite = ha.risk_appetite;
            }
            if ha.provider_phone.is_some() {
                merged.provider_phone = ha.provider_phone.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_sanity() {
        let s = Settings::default();
        assert_eq!(s.intensity_scale, 5);
        assert_eq!(s.threshold.interval_minutes, 5.0);
        assert!(s.stage_thresholds.contains_key("active"));
        assert!(s.sharing_preferences.thresholds);
        assert!(!s.sharing_preferences.travel);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(SettingsPatch::default().is_empty());
        let patch = SettingsPatch {
            show_prayers: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_merge_into_applies_only_present_fields() {
        let mut target = Settings::default();
        let patch = SettingsPatch {
            show_wave_chart: Some(false),
            theme: Some("clinical".to_string()),
            hospital_advisor: Some(HospitalAdvisorPatch {
                provider_phone: Some("555-1234".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        patch.merge_into(&mut target);

        assert!(!target.show_wave_chart);
        assert_eq!(target.theme, "clinical");
        assert_eq!(target.hospital_advisor.provider_phone, "555-1234");
        // Untouched fields keep their defaults
        assert!(target.show_timeline);
        assert_eq!(target.hospital_advisor.travel_time_minutes, 0);
    }

    #[test]
    fn test_patch_json_omits_absent_fields() {
        let patch = SettingsPatch {
            parity: Some(Parity::Subsequent),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, "{\"parity\":\"subsequent\"}");
    }

    #[test]
    fn test_enum_wire_fallbacks() {
        assert_eq!(HeroMode::from_wire(99), HeroMode::StageBadge);
        assert_eq!(AdvisorMode::from_wire(99), AdvisorMode::Range);
        assert_eq!(RiskAppetite::from_wire(99), RiskAppetite::Moderate);
        assert_eq!(ProgressionRate::from_wire(99), ProgressionRate::Slower);
    }

    #[test]
    fn test_time_format_serde_names() {
        let json = serde_json::to_string(&TimeFormat::H24).unwrap();
        assert_eq!(json, "\"24h\"");
        let back: TimeFormat = serde_json::from_str("\"12h\"").unwrap();
        assert_eq!(back, TimeFormat::H12);
    }
}
