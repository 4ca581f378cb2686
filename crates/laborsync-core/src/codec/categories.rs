//! Category-based settings selection.
//!
//! Senders extract only the settings fields whose categories they opted to
//! share; receivers detect which categories a payload carries and filter it
//! down to the categories they accept. Provider phone and travel settings
//! live in the same hospital-advisor record but are separate categories, so
//! both sides treat that record field-by-field.

use crate::settings::{
    HospitalAdvisorPatch, Settings, SettingsPatch, SharingCategory, SharingPreferences,
};

/// Build the partial settings a sender shares, containing only fields from
/// enabled categories. Returns `None` when no category is enabled.
pub fn extract_shared(settings: &Settings, prefs: &SharingPreferences) -> Option<SettingsPatch> {
    let mut result = SettingsPatch::default();
    let mut has_any = false;

    if prefs.thresholds {
        result.threshold = Some(settings.threshold);
        result.stage_thresholds = Some(settings.stage_thresholds.clone());
        result.bh_thresholds = Some(settings.bh_thresholds);
        result.intensity_scale = Some(settings.intensity_scale);
        has_any = true;
    }

    if prefs.provider || prefs.travel {
        let mut ha = HospitalAdvisorPatch::default();
        if prefs.provider {
            ha.provider_phone = Some(settings.hospital_advisor.provider_phone.clone());
        }
        if prefs.travel {
            ha.travel_time_minutes = Some(settings.hospital_advisor.travel_time_minutes);
            ha.travel_time_uncertain = Some(settings.hospital_advisor.travel_time_uncertain);
            ha.risk_appetite = Some(settings.hospital_advisor.risk_appetite);
        }
        result.hospital_advisor = Some(ha);
        has_any = true;
    }

    if prefs.layout {
        result.hero_mode = Some(settings.hero_mode);
        has_any = true;
    }

    if prefs.parity {
        result.parity = Some(settings.parity);
        has_any = true;
    }

    if prefs.appearance {
        result.theme = Some(settings.theme.clone());
        result.show_wave_chart = Some(settings.show_wave_chart);
        result.show_timeline = Some(settings.show_timeline);
        result.show_summary_cards = Some(settings.show_summary_cards);
        result.show_progression_insight = Some(settings.show_progression_insight);
        result.show_post_rating = Some(settings.show_post_rating);
        result.show_intensity_picker = Some(settings.show_intensity_picker);
        result.show_location_picker = Some(settings.show_location_picker);
        result.time_format = Some(settings.time_format);
        result.wave_chart_height = Some(settings.wave_chart_height);
        result.show_rest_seconds = Some(settings.show_rest_seconds);
        result.show_hospital_advisor = Some(settings.show_hospital_advisor);
        result.advisor_mode = Some(settings.advisor_mode);
        result.show_contextual_tips = Some(settings.show_contextual_tips);
        result.show_braxton_hicks_assessment = Some(settings.show_braxton_hicks_assessment);
        result.show_clinical_reference = Some(settings.show_clinical_reference);
        result.show_water_break_button = Some(settings.show_water_break_button);
        result.show_threshold_rule = Some(settings.show_threshold_rule);
        result.show_live_rating = Some(settings.show_live_rating);
        result.show_chart_overlay = Some(settings.show_chart_overlay);
        result.show_prayers = Some(settings.show_prayers);
        has_any = true;
    }

    has_any.then_some(result)
}

/// Detect which sharing categories a received patch carries, for preview
/// display before the receiver applies anything.
pub fn detect_categories(patch: &SettingsPatch) -> Vec<SharingCategory> {
    let mut cats = Vec::new();

    if patch.threshold.is_some()
        || patch.stage_thresholds.is_some()
        || patch.bh_thresholds.is_some()
        || patch.intensity_scale.is_some()
    {
        cats.push(SharingCategory::Thresholds);
    }

    let ha = patch.hospital_advisor.as_ref();
    if ha.is_some_and(|ha| ha.provider_phone.is_some()) {
        cats.push(SharingCategory::Provider);
    }

    if patch.hero_mode.is_some() {
        cats.push(SharingCategory::Layout);
    }

    if patch.parity.is_some() {
        cats.push(SharingCategory::Parity);
    }

    if ha.is_some_and(|ha| ha.travel_time_minutes.is_some() || ha.risk_appetite.is_some()) {
        cats.push(SharingCategory::Travel);
    }

    if patch.theme.is_some() || patch.show_wave_chart.is_some() || patch.time_format.is_some() {
        cats.push(SharingCategory::Appearance);
    }

    cats
}

/// Filter a received patch down to the categories the receiver checked.
/// Used for selective import: unchecked categories are dropped entirely.
pub fn filter_by_categories(patch: &SettingsPatch, enabled: &SharingPreferences) -> SettingsPatch {
    let mut result = SettingsPatch::default();

    if enabled.thresholds {
        result.threshold = patch.threshold;
        result.stage_thresholds = patch.stage_thresholds.clone();
        result.bh_thresholds = patch.bh_thresholds;
        result.intensity_scale = patch.intensity_scale;
    }

    if let Some(ha) = &patch.hospital_advisor {
        if enabled.provider || enabled.travel {
            let mut merged = HospitalAdvisorPatch::default();
            if enabled.provider {
                merged.provider_phone = ha.provider_phone.clone();
            }
            if enabled.travel {
                merged.travel_time_minutes = ha.travel_time_minutes;
                merged.travel_time_uncertain = ha.travel_time_uncertain;
                merged.risk_appetite = ha.risk_appetite;
            }
            if !merged.is_empty() {
                result.hospital_advisor = Some(merged);
            }
        }
    }

    if enabled.layout {
        result.hero_mode = patch.hero_mode;
    }

    if enabled.parity {
        result.parity = patch.parity;
    }

    if enabled.appearance {
        result.theme = patch.theme.clone();
        result.show_wave_chart = patch.show_wave_chart;
        result.show_timeline = patch.show_timeline;
        result.show_summary_cards = patch.show_summary_cards;
        result.show_progression_insight = patch.show_progression_insight;
        result.show_post_rating = patch.show_post_rating;
        result.show_intensity_picker = patch.show_intensity_picker;
        result.show_location_picker = patch.show_location_picker;
        result.time_format = patch.time_format;
        result.wave_chart_height = patch.wave_chart_height;
        result.show_rest_seconds = patch.show_rest_seconds;
        result.show_hospital_advisor = patch.show_hospital_advisor;
        result.advisor_mode = patch.advisor_mode;
        result.show_contextual_tips = patch.show_contextual_tips;
        result.show_braxton_hicks_assessment = patch.show_braxton_hicks_assessment;
        result.show_clinical_reference = patch.show_clinical_reference;
        result.show_water_break_button = patch.show_water_break_button;
        result.show_threshold_rule = patch.show_threshold_rule;
        result.show_live_rating = patch.show_live_rating;
        result.show_chart_overlay = patch.show_chart_overlay;
        result.show_prayers = patch.show_prayers;
    }

    result
}
