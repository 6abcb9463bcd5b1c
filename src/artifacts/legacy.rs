//! `gguf_models.json` and `gguf_models_estimated_sizes.json` (spec §4.J) —
//! compatibility shapes kept for clients that predate the optimized
//! `models.json`/`models-light.json` artifacts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{FreshnessStatus, ModelRecord};

#[derive(Debug, Serialize)]
pub struct LegacyFile<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyModelEntry<'a> {
    pub model_id: &'a str,
    pub files: Vec<LegacyFile<'a>>,
    pub downloads: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub last_synced: Option<DateTime<Utc>>,
    pub freshness_status: Option<FreshnessStatus>,
    pub hours_since_modified: Option<f64>,
    pub hours_since_synced: Option<f64>,
}

pub fn build_gguf_models(records: &[ModelRecord]) -> Vec<LegacyModelEntry<'_>> {
    records
        .iter()
        .map(|r| LegacyModelEntry {
            model_id: &r.id,
            files: r.files.iter().map(|f| LegacyFile { filename: &f.filename }).collect(),
            downloads: r.downloads,
            last_modified: r.last_modified,
            last_synced: r.freshness.as_ref().map(|f| f.last_synced),
            freshness_status: r.freshness.as_ref().map(|f| f.freshness_status),
            hours_since_modified: r.freshness.as_ref().and_then(|f| f.hours_since_modified),
            hours_since_synced: r.freshness.as_ref().map(|f| f.hours_since_synced),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedSizeEntry {
    pub total_size: u64,
    pub files: HashMap<String, u64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub freshness_status: Option<FreshnessStatus>,
}

pub fn build_estimated_sizes(records: &[ModelRecord]) -> HashMap<String, EstimatedSizeEntry> {
    records
        .iter()
        .map(|r| {
            let files = r.files.iter().map(|f| (f.filename.clone(), f.size_bytes)).collect();
            (
                r.id.clone(),
                EstimatedSizeEntry {
                    total_size: r.total_size_bytes,
                    files,
                    last_updated: r.last_modified,
                    freshness_status: r.freshness.as_ref().map(|f| f.freshness_status),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use std::collections::HashSet;

    fn record() -> ModelRecord {
        ModelRecord {
            id: "org/model".into(),
            name: "Model".into(),
            family: "org".into(),
            architecture: "Llama".into(),
            files: vec![FileRecord {
                filename: "model.Q4_K_M.gguf".into(),
                size_bytes: 1024,
                size_human: "1.0 KB".into(),
                quantization: "Q4_K_M".into(),
                download_url: "https://example.test/model.gguf".into(),
                last_modified: None,
            }],
            downloads: 5,
            tags: HashSet::new(),
            total_size_bytes: 1024,
            quantizations: HashSet::from(["Q4_K_M".to_string()]),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        }
    }

    #[test]
    fn legacy_model_entry_carries_filenames_only() {
        let records = vec![record()];
        let legacy = build_gguf_models(&records);
        assert_eq!(legacy[0].files[0].filename, "model.Q4_K_M.gguf");
    }

    #[test]
    fn estimated_sizes_keyed_by_model_id() {
        let records = vec![record()];
        let sizes = build_estimated_sizes(&records);
        let entry = sizes.get("org/model").unwrap();
        assert_eq!(entry.total_size, 1024);
        assert_eq!(*entry.files.get("model.Q4_K_M.gguf").unwrap(), 1024);
    }
}
