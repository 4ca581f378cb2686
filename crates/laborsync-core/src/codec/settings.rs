//! Settings compressor: partial settings ⇄ compact wire form.
//!
//! Booleans are packed into two integers: `bp` marks which keys were present
//! in the patch, `b` carries their values. This keeps "explicitly false"
//! distinguishable from "not included". Enum settings map through fixed
//! integer tables; composite records flatten to fixed-order arrays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::settings::{
    AdvisorMode, BhThresholds, HeroMode, HospitalAdvisorPatch, Parity, ProgressionRate,
    RiskAppetite, SettingsPatch, SharingPreferences, StageThreshold, StageTimeBasis,
    ThresholdConfig, TimeFormat, WaterBreakStats, SHARING_CATEGORIES,
};

/// Number of boolean settings in the bitfield.
///
/// Bit order is the field order in `patch_bool` below. The order is a wire
/// contract: append new booleans at the end, never reorder, or previously
/// encoded bitfields change meaning.
const BOOL_KEY_COUNT: usize = 20;

fn patch_bool(patch: &SettingsPatch, bit: usize) -> Option<bool> {
    match bit {
        0 => patch.show_wave_chart,
        1 => patch.show_timeline,
        2 => patch.show_summary_cards,
        3 => patch.show_progression_insight,
        4 => patch.show_post_rating,
        5 => patch.show_intensity_picker,
        6 => patch.show_location_picker,
        7 => patch.show_rest_seconds,
        8 => patch.show_hospital_advisor,
        9 => patch.show_contextual_tips,
        10 => patch.show_braxton_hicks_assessment,
        11 => patch.show_clinical_reference,
        12 => patch.show_water_break_button,
        13 => patch.show_threshold_rule,
        14 => patch.show_live_rating,
        15 => patch.show_chart_overlay,
        16 => patch.show_prayers,
        17 => patch.haptic_feedback,
        18 => patch.persist_pause,
        19 => patch.enable_debug_log,
        _ => None,
    }
}

fn set_patch_bool(patch: &mut SettingsPatch, bit: usize, value: bool) {
    let slot = match bit {
        0 => &mut patch.show_wave_chart,
        1 => &mut patch.show_timeline,
        2 => &mut patch.show_summary_cards,
        3 => &mut patch.show_progression_insight,
        4 => &mut patch.show_post_rating,
        5 => &mut patch.show_intensity_picker,
        6 => &mut patch.show_location_picker,
        7 => &mut patch.show_rest_seconds,
        8 => &mut patch.show_hospital_advisor,
        9 => &mut patch.show_contextual_tips,
        10 => &mut patch.show_braxton_hicks_assessment,
        11 => &mut patch.show_clinical_reference,
        12 => &mut patch.show_water_break_button,
        13 => &mut patch.show_threshold_rule,
        14 => &mut patch.show_live_rating,
        15 => &mut patch.show_chart_overlay,
        16 => &mut patch.show_prayers,
        17 => &mut patch.haptic_feedback,
        18 => &mut patch.persist_pause,
        19 => &mut patch.enable_debug_log,
        _ => return,
    };
    *slot = Some(value);
}

/// Compressed settings wire form. All keys optional; single-letter names are
/// part of the wire contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompactSettings {
    /// Boolean values bitfield
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub b: Option<u32>,
    /// Boolean presence mask (which bits are meaningful)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bp: Option<u32>,
    /// Threshold triplet [intervalMin, durationSec, sustainedMin]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub t: Option<[f64; 3]>,
    /// Per-stage thresholds [maxIntervalMin, minDurationSec]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub st: Option<BTreeMap<String, [f64; 2]>>,
    /// BH thresholds as ordered 8-element array
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bh: Option<Vec<f64>>,
    /// Intensity scale (3 or 5)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is: Option<u8>,
    /// Hospital advisor [travel, uncertain, riskEnum, phone], trailing-trimmed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ha: Option<Vec<Value>>,
    /// Hero mode enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hm: Option<u8>,
    /// Advisor mode enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub am: Option<u8>,
    /// Parity enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pr: Option<u8>,
    /// Time format enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tf: Option<u8>,
    /// Theme name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub th: Option<String>,
    /// Wave chart height (px)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub wh: Option<u32>,
    /// Chart gap threshold (minutes)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cg: Option<u32>,
    /// Stage-time basis enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sb: Option<u8>,
    /// Sharing preferences bitfield (6 bits)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sp: Option<u8>,
    /// Water break stats as 4-element array
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ws: Option<[String; 4]>,
    /// Advisor progression rate enum
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub apr: Option<u8>,
}

/// Encode a settings patch into the compact wire form.
pub fn encode_settings(patch: &SettingsPatch) -> CompactSettings {
    let mut cs = CompactSettings::default();

    let mut values: u32 = 0;
    let mut presence: u32 = 0;
    for bit in 0..BOOL_KEY_COUNT {
        if let Some(v) = patch_bool(patch, bit) {
            presence |= 1 << bit;
            if v {
                values |= 1 << bit;
            }
        }
    }
    if presence != 0 {
        cs.b = Some(values);
        cs.bp = Some(presence);
    }

    if let Some(t) = patch.threshold {
        cs.t = Some([t.interval_minutes, t.duration_seconds, t.sustained_minutes]);
    }

    if let Some(st) = &patch.stage_thresholds {
        cs.st = Some(
            st.iter()
                .map(|(stage, cfg)| (stage.clone(), [cfg.max_interval_min, cfg.min_duration_sec]))
                .collect(),
        );
    }

    if let Some(bh) = patch.bh_thresholds {
        cs.bh = Some(vec![
            bh.regularity_cv_low,
            bh.regularity_cv_high,
            bh.location_ratio_high,
            bh.location_ratio_low,
            bh.sustained_min_minutes,
            bh.sustained_max_gap_minutes,
            bh.verdict_real_threshold,
            bh.verdict_bh_threshold,
        ]);
    }

    cs.is = patch.intensity_scale;

    if let Some(ha) = &patch.hospital_advisor {
        // Sentinels: -1 for absent numbers, false for absent bool, "" for
        // absent phone. Trailing sentinels are trimmed; a fully-sentinel
        // array is omitted.
        let mut arr = vec![
            json!(ha.travel_time_minutes.unwrap_or(-1)),
            json!(ha.travel_time_uncertain.unwrap_or(false)),
            json!(ha
                .risk_appetite
                .map(|r| r.to_wire() as i64)
                .unwrap_or(-1)),
            json!(ha.provider_phone.clone().unwrap_or_default()),
        ];
        while let Some(last) = arr.last() {
            let sentinel = last == &json!(-1) || last == &json!(false) || last == &json!("");
            if sentinel {
                arr.pop();
            } else {
                break;
            }
        }
        if !arr.is_empty() {
            cs.ha = Some(arr);
        }
    }

    cs.hm = patch.hero_mode.map(|v| v.to_wire() as u8);
    cs.am = patch.advisor_mode.map(|v| v.to_wire() as u8);
    cs.pr = patch.parity.map(|v| v.to_wire() as u8);
    cs.tf = patch.time_format.map(|v| v.to_wire() as u8);
    cs.sb = patch.stage_time_basis.map(|v| v.to_wire() as u8);
    cs.apr = patch.advisor_progression_rate.map(|v| v.to_wire() as u8);

    cs.th = patch.theme.clone();
    cs.wh = patch.wave_chart_height;
    cs.cg = patch.chart_gap_threshold_min;

    if let Some(prefs) = patch.sharing_preferences {
        let mut sp: u8 = 0;
        for (i, cat) in SHARING_CATEGORIES.iter().enumerate() {
            if prefs.get(*cat) {
                sp |= 1 << i;
            }
        }
        cs.sp = Some(sp);
    }

    if let Some(ws) = &patch.water_break_stats {
        cs.ws = Some([
            ws.before_contractions.clone(),
            ws.during_labor.clone(),
            ws.labor_within_12_hours.clone(),
            ws.labor_within_24_hours.clone(),
        ]);
    }

    cs
}

/// Decode the compact form back into a settings patch. A field is present in
/// the output iff its presence indicator was set in the input.
pub fn decode_settings(cs: &CompactSettings) -> SettingsPatch {
    let mut patch = SettingsPatch::default();

    if let Some(presence) = cs.bp {
        let values = cs.b.unwrap_or(0);
        for bit in 0..BOOL_KEY_COUNT {
            if presence & (1 << bit) != 0 {
                set_patch_bool(&mut patch, bit, values & (1 << bit) != 0);
            }
        }
    }

    if let Some([interval, duration, sustained]) = cs.t {
        patch.threshold = Some(ThresholdConfig {
            interval_minutes: interval,
            duration_seconds: duration,
            sustained_minutes: sustained,
        });
    }

    if let Some(st) = &cs.st {
        patch.stage_thresholds = Some(
            st.iter()
                .map(|(stage, [max_interval, min_duration])| {
                    (
                        stage.clone(),
                        StageThreshold {
                            max_interval_min: *max_interval,
                            min_duration_sec: *min_duration,
                        },
                    )
                })
                .collect(),
        );
    }

    if let Some(bh) = &cs.bh {
        if bh.len() >= 8 {
            patch.bh_thresholds = Some(BhThresholds {
                regularity_cv_low: bh[0],
                regularity_cv_high: bh[1],
                location_ratio_high: bh[2],
                location_ratio_low: bh[3],
                sustained_min_minutes: bh[4],
                sustained_max_gap_minutes: bh[5],
                verdict_real_threshold: bh[6],
                verdict_bh_threshold: bh[7],
            });
        }
    }

    patch.intensity_scale = cs.is;

    if let Some(ha) = &cs.ha {
        let mut hap = HospitalAdvisorPatch::default();
        if let Some(travel) = ha.first().and_then(Value::as_i64) {
            if travel != -1 {
                hap.travel_time_minutes = Some(travel);
            }
        }
        if let Some(true) = ha.get(1).and_then(Value::as_bool) {
            hap.travel_time_uncertain = Some(true);
        }
        if let Some(risk) = ha.get(2).and_then(Value::as_i64) {
            if risk != -1 {
                hap.risk_appetite = Some(RiskAppetite::from_wire(risk as u64));
            }
        }
        if let Some(phone) = ha.get(3).and_then(Value::as_str) {
            if !phone.is_empty() {
                hap.provider_phone = Some(phone.to_string());
            }
        }
        patch.hospital_advisor = Some(hap);
    }

    patch.hero_mode = cs.hm.map(|n| HeroMode::from_wire(n as u64));
    patch.advisor_mode = cs.am.map(|n| AdvisorMode::from_wire(n as u64));
    patch.parity = cs.pr.map(|n| Parity::from_wire(n as u64));
    patch.time_format = cs.tf.map(|n| TimeFormat::from_wire(n as u64));
    patch.stage_time_basis = cs.sb.map(|n| StageTimeBasis::from_wire(n as u64));
    patch.advisor_progression_rate = cs.apr.map(|n| ProgressionRate::from_wire(n as u64));

    patch.theme = cs.th.clone();
    patch.wave_chart_height = cs.wh;
    patch.chart_gap_threshold_min = cs.cg;

    if let Some(sp) = cs.sp {
        let mut prefs = SharingPreferences::none();
        for (i, cat) in SHARING_CATEGORIES.iter().enumerate() {
            prefs.set(*cat, sp & (1 << i) != 0);
        }
        patch.sharing_preferences = Some(prefs);
    }

    if let Some([before, during, within12, within24]) = cs.ws.clone() {
        patch.water_break_stats = Some(WaterBreakStats {
            before_contractions: before,
            during_labor: during,
            labor_within_12_hours: within12,
            labor_within_24_hours: within24,
        });
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_bool_bitfield_roundtrip() {
        let mut patch = SettingsPatch::default();
        patch.show_wave_chart = Some(true);
        patch.show_timeline = Some(false);
        patch.show_prayers = Some(false);
        patch.haptic_feedback = Some(true);
        patch.enable_debug_log = Some(false);

        let cs = encode_settings(&patch);
        assert!(cs.b.is_some());
        assert!(cs.bp.is_some());

        let decoded = decode_settings(&cs);
        assert_eq!(decoded.show_wave_chart, Some(true));
        assert_eq!(decoded.show_timeline, Some(false));
        assert_eq!(decoded.show_prayers, Some(false));
        assert_eq!(decoded.haptic_feedback, Some(true));
        assert_eq!(decoded.enable_debug_log, Some(false));
        // Keys not in the patch stay absent
        assert_eq!(decoded.show_summary_cards, None);
        assert_eq!(decoded.persist_pause, None);
    }

    #[test]
    fn test_no_bools_omits_bitfield() {
        let patch = SettingsPatch {
            theme: Some("clinical".to_string()),
            ..Default::default()
        };
        let cs = encode_settings(&patch);
        assert_eq!(cs.b, None);
        assert_eq!(cs.bp, None);
        assert_eq!(cs.th.as_deref(), Some("clinical"));
    }

    #[test]
    fn test_enum_settings_roundtrip() {
        let patch = SettingsPatch {
            hero_mode: Some(HeroMode::CompactTimer),
            advisor_mode: Some(AdvisorMode::Minimal),
            parity: Some(Parity::Subsequent),
            time_format: Some(TimeFormat::H24),
            stage_time_basis: Some(StageTimeBasis::CurrentTime),
            advisor_progression_rate: Some(ProgressionRate::Faster),
            ..Default::default()
        };

        let decoded = decode_settings(&encode_settings(&patch));
        assert_eq!(decoded.hero_mode, Some(HeroMode::CompactTimer));
        assert_eq!(decoded.advisor_mode, Some(AdvisorMode::Minimal));
        assert_eq!(decoded.parity, Some(Parity::Subsequent));
        assert_eq!(decoded.time_format, Some(TimeFormat::H24));
        assert_eq!(decoded.stage_time_basis, Some(StageTimeBasis::CurrentTime));
        assert_eq!(
            decoded.advisor_progression_rate,
            Some(ProgressionRate::Faster)
        );
    }

    #[test]
    fn test_threshold_roundtrip() {
        let patch = SettingsPatch {
            threshold: Some(ThresholdConfig {
                interval_minutes: 4.0,
                duration_seconds: 45.0,
                sustained_minutes: 90.0,
            }),
            ..Default::default()
        };

        let cs = encode_settings(&patch);
        assert_eq!(cs.t, Some([4.0, 45.0, 90.0]));

        let decoded = decode_settings(&cs);
        assert_eq!(decoded.threshold, patch.threshold);
    }

    #[test]
    fn test_hospital_advisor_roundtrip() {
        let patch = SettingsPatch {
            hospital_advisor: Some(HospitalAdvisorPatch {
                travel_time_minutes: Some(45),
                travel_time_uncertain: Some(true),
                risk_appetite: Some(RiskAppetite::Conservative),
                provider_phone: Some("555-1234".to_string()),
            }),
            ..Default::default()
        };

        let decoded = decode_settings(&encode_settings(&patch));
        let ha = decoded.hospital_advisor.unwrap();
        assert_eq!(ha.travel_time_minutes, Some(45));
        assert_eq!(ha.travel_time_uncertain, Some(true));
        assert_eq!(ha.risk_appetite, Some(RiskAppetite::Conservative));
        assert_eq!(ha.provider_phone.as_deref(), Some("555-1234"));
    }

    #[test]
    fn test_hospital_advisor_trailing_trim() {
        // Only travel set: array trims to a single element
        let patch = SettingsPatch {
            hospital_advisor: Some(HospitalAdvisorPatch {
                travel_time_minutes: Some(30),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cs = encode_settings(&patch);
        assert_eq!(cs.ha.as_ref().unwrap().len(), 1);

        // Nothing set: key omitted entirely
        let empty = SettingsPatch {
            hospital_advisor: Some(HospitalAdvisorPatch::default()),
            ..Default::default()
        };
        assert_eq!(encode_settings(&empty).ha, None);
    }

    #[test]
    fn test_bh_thresholds_roundtrip() {
        let patch = SettingsPatch {
            bh_thresholds: Some(BhThresholds {
                regularity_cv_low: 0.2,
                regularity_cv_high: 0.7,
                location_ratio_high: 0.6,
                location_ratio_low: 0.15,
                sustained_min_minutes: 150.0,
                sustained_max_gap_minutes: 25.0,
                verdict_real_threshold: 65.0,
                verdict_bh_threshold: 25.0,
            }),
            ..Default::default()
        };

        let cs = encode_settings(&patch);
        assert_eq!(cs.bh.as_ref().unwrap().len(), 8);

        let decoded = decode_settings(&cs);
        assert_eq!(decoded.bh_thresholds, patch.bh_thresholds);
    }

    #[test]
    fn test_sharing_preferences_bitfield_roundtrip() {
        let prefs = SharingPreferences {
            thresholds: true,
            provider: false,
            layout: true,
            parity: true,
            travel: false,
            appearance: true,
        };
        let patch = SettingsPatch {
            sharing_preferences: Some(prefs),
            ..Default::default()
        };

        let cs = encode_settings(&patch);
        assert!(cs.sp.is_some());

        let decoded = decode_settings(&cs);
        assert_eq!(decoded.sharing_preferences, Some(prefs));
    }

    #[test]
    fn test_stage_thresholds_roundtrip() {
        let patch = SettingsPatch {
            stage_thresholds: Some(crate::settings::default_stage_thresholds()),
            ..Default::default()
        };
        let decoded = decode_settings(&encode_settings(&patch));
        assert_eq!(decoded.stage_thresholds, patch.stage_thresholds);
    }

    #[test]
    fn test_compact_json_is_much_smaller_than_raw() {
        // The bulkiest realistic patch: full appearance category
        let defaults = Settings::default();
        let patch = crate::codec::extract_shared(
            &defaults,
            &SharingPreferences {
                appearance: true,
                ..SharingPreferences::none()
            },
        )
        .unwrap();

        let raw = serde_json::to_string(&patch).unwrap();
        let compact = serde_json::to_string(&encode_settings(&patch)).unwrap();
        tracing::debug!(raw = raw.len(), compact = compact.len(), "settings size");
        assert!(compact.len() < raw.len() / 2);
    }

    #[test]
    fn test_presence_preserved_exactly() {
        let patch = SettingsPatch {
            show_wave_chart: Some(false),
            show_prayers: Some(true),
            ..Default::default()
        };
        let decoded = decode_settings(&encode_settings(&patch));
        assert_eq!(decoded, patch);
    }
}
