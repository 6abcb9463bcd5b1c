//! Data freshness tracking (spec §4.I), grounded in `FreshnessTracker`/
//! `WebsiteFreshnessIndicator` in
//! `original_source/scripts/freshness_system.py`. Per-model stamping runs
//! during artifact assembly; the site-wide `FreshnessMetadata` and its
//! indicator view are produced once per sync by the orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{FreshnessAnnotation, FreshnessStatus, ModelRecord};

const STALE_HOURS: f64 = 24.0;
const VERY_STALE_HOURS: f64 = 25.0;

/// Stamp a single record's freshness annotation in place, as of `now`/`synced_at`.
pub fn stamp(record: &mut ModelRecord, synced_at: DateTime<Utc>, now: DateTime<Utc>) {
    let hours_since_modified = record
        .last_modified
        .map(|modified| (now - modified).num_seconds() as f64 / 3600.0);
    let freshness_status = status_for(hours_since_modified);
    let hours_since_synced = (now - synced_at).num_seconds() as f64 / 3600.0;

    record.freshness = Some(FreshnessAnnotation {
        last_synced: synced_at,
        freshness_status,
        hours_since_modified,
        hours_since_synced,
    });
}

fn status_for(hours_since_modified: Option<f64>) -> FreshnessStatus {
    match hours_since_modified {
        None => FreshnessStatus::Unknown,
        Some(hours) if hours <= STALE_HOURS => FreshnessStatus::Fresh,
        Some(hours) if hours <= VERY_STALE_HOURS => FreshnessStatus::Stale,
        Some(_) => FreshnessStatus::VeryStale,
    }
}

/// Site-wide freshness metadata for a completed sync (spec §4.I).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessMetadata {
    pub last_sync_timestamp: DateTime<Utc>,
    pub sync_duration_seconds: f64,
    pub total_models_processed: usize,
    pub sync_mode: String,
    pub sync_success: bool,
    pub models_with_timestamps: usize,
    pub models_without_timestamps: usize,
    pub oldest_model_timestamp: Option<DateTime<Utc>>,
    pub newest_model_timestamp: Option<DateTime<Utc>>,
    pub freshness_score: f64,
    pub staleness_warnings: Vec<String>,
}

/// Generate site-wide freshness metadata from already-stamped records.
pub fn generate_metadata(
    records: &[ModelRecord],
    last_sync_timestamp: DateTime<Utc>,
    sync_duration_seconds: f64,
    sync_mode: &str,
    sync_success: bool,
) -> FreshnessMetadata {
    let models_with_timestamps = records.iter().filter(|m| m.last_modified.is_some()).count();
    let models_without_timestamps = records.len() - models_with_timestamps;

    let oldest_model_timestamp = records.iter().filter_map(|m| m.last_modified).min();
    let newest_model_timestamp = records.iter().filter_map(|m| m.last_modified).max();

    let fresh_count = records
        .iter()
        .filter(|m| matches!(m.freshness.as_ref().map(|f| f.freshness_status), Some(FreshnessStatus::Fresh)))
        .count();
    let freshness_score = if records.is_empty() {
        0.0
    } else {
        fresh_count as f64 / records.len() as f64
    };

    let staleness_warnings =
        staleness_warnings(records, last_sync_timestamp, models_without_timestamps);

    FreshnessMetadata {
        last_sync_timestamp,
        sync_duration_seconds,
        total_models_processed: records.len(),
        sync_mode: sync_mode.to_string(),
        sync_success,
        models_with_timestamps,
        models_without_timestamps,
        oldest_model_timestamp,
        newest_model_timestamp,
        freshness_score,
        staleness_warnings,
    }
}

fn staleness_warnings(
    records: &[ModelRecord],
    last_sync_timestamp: DateTime<Utc>,
    models_without_timestamps: usize,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let now = Utc::now();

    let hours_since_sync = (now - last_sync_timestamp).num_seconds() as f64 / 3600.0;
    if hours_since_sync > VERY_STALE_HOURS {
        warnings.push(format!(
            "data is {hours_since_sync:.1} hours old (last sync: {})",
            last_sync_timestamp.to_rfc3339()
        ));
    }

    if !records.is_empty() {
        let stale_count = records
            .iter()
            .filter(|m| {
                matches!(
                    m.freshness.as_ref().map(|f| f.freshness_status),
                    Some(FreshnessStatus::Stale) | Some(FreshnessStatus::VeryStale)
                )
            })
            .count();
        let stale_fraction = stale_count as f64 / records.len() as f64;
        if stale_fraction > 0.1 {
            warnings.push(format!("{:.1}% of models have stale data", stale_fraction * 100.0));
        }

        let missing_fraction = models_without_timestamps as f64 / records.len() as f64;
        if missing_fraction > 0.05 {
            warnings.push(format!(
                "{:.1}% of models lack modification timestamps",
                missing_fraction * 100.0
            ));
        }
    }

    warnings
}

/// Website-facing freshness indicator (spec §4.I), derived from
/// [`FreshnessMetadata`] at artifact-write time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessIndicator {
    pub last_sync_timestamp: DateTime<Utc>,
    pub hours_since_sync: f64,
    pub overall_status: &'static str,
    pub status_color: &'static str,
    pub status_icon: &'static str,
    pub time_message: String,
    pub freshness_score: f64,
    pub total_models: usize,
    pub sync_duration: f64,
    pub sync_mode: String,
    pub sync_success: bool,
    pub staleness_warnings: Vec<String>,
    pub show_staleness_warning: bool,
}

pub fn generate_indicator(metadata: &FreshnessMetadata) -> FreshnessIndicator {
    let now = Utc::now();
    let hours_since_sync = (now - metadata.last_sync_timestamp).num_seconds() as f64 / 3600.0;

    let (overall_status, status_color, status_icon) = if hours_since_sync <= STALE_HOURS {
        ("fresh", "green", "ok")
    } else if hours_since_sync <= VERY_STALE_HOURS {
        ("stale", "yellow", "warning")
    } else {
        ("very_stale", "red", "critical")
    };

    FreshnessIndicator {
        last_sync_timestamp: metadata.last_sync_timestamp,
        hours_since_sync: (hours_since_sync * 10.0).round() / 10.0,
        overall_status,
        status_color,
        status_icon,
        time_message: time_message(hours_since_sync),
        freshness_score: (metadata.freshness_score * 1000.0).round() / 1000.0,
        total_models: metadata.total_models_processed,
        sync_duration: (metadata.sync_duration_seconds * 10.0).round() / 10.0,
        sync_mode: metadata.sync_mode.clone(),
        sync_success: metadata.sync_success,
        staleness_warnings: metadata.staleness_warnings.clone(),
        show_staleness_warning: hours_since_sync > VERY_STALE_HOURS || !metadata.staleness_warnings.is_empty(),
    }
}

fn time_message(hours_since_sync: f64) -> String {
    if hours_since_sync < 1.0 {
        "updated less than 1 hour ago".to_string()
    } else if hours_since_sync < 24.0 {
        format!("updated {} hours ago", hours_since_sync as i64)
    } else {
        let days = (hours_since_sync / 24.0) as i64;
        let remaining_hours = (hours_since_sync as i64) % 24;
        match (days, remaining_hours) {
            (1, 0) => "updated 1 day ago".to_string(),
            (_, 0) => format!("updated {days} days ago"),
            (1, h) => format!("updated 1 day and {h} hours ago"),
            (d, h) => format!("updated {d} days and {h} hours ago"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn bare_record(last_modified: Option<DateTime<Utc>>) -> ModelRecord {
        ModelRecord {
            id: "org/model".into(),
            name: "Model".into(),
            family: "org".into(),
            architecture: "Unknown".into(),
            files: vec![],
            downloads: 0,
            tags: HashSet::new(),
            total_size_bytes: 0,
            quantizations: HashSet::new(),
            last_modified,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        }
    }

    #[test]
    fn stamp_classifies_by_hours_since_modified() {
        let now = Utc::now();
        let mut fresh = bare_record(Some(now - chrono::Duration::hours(1)));
        stamp(&mut fresh, now, now);
        assert_eq!(fresh.freshness.unwrap().freshness_status, FreshnessStatus::Fresh);

        let mut stale = bare_record(Some(now - chrono::Duration::hours(24) - chrono::Duration::minutes(30)));
        stamp(&mut stale, now, now);
        assert_eq!(stale.freshness.unwrap().freshness_status, FreshnessStatus::Stale);

        let mut very_stale = bare_record(Some(now - chrono::Duration::hours(30)));
        stamp(&mut very_stale, now, now);
        assert_eq!(very_stale.freshness.unwrap().freshness_status, FreshnessStatus::VeryStale);

        let mut unknown = bare_record(None);
        stamp(&mut unknown, now, now);
        assert_eq!(unknown.freshness.unwrap().freshness_status, FreshnessStatus::Unknown);
    }

    #[test]
    fn indicator_shows_warning_past_very_stale_threshold() {
        let metadata = FreshnessMetadata {
            last_sync_timestamp: Utc::now() - chrono::Duration::hours(26),
            sync_duration_seconds: 12.0,
            total_models_processed: 10,
            sync_mode: "incremental".into(),
            sync_success: true,
            models_with_timestamps: 10,
            models_without_timestamps: 0,
            oldest_model_timestamp: None,
            newest_model_timestamp: None,
            freshness_score: 0.9,
            staleness_warnings: vec![],
        };
        let indicator = generate_indicator(&metadata);
        assert_eq!(indicator.overall_status, "very_stale");
        assert!(indicator.show_staleness_warning);
    }
}
