//! `data/models.json` (spec §4.J).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{GenerationMetadata, ModelRecord};

const MAX_TAGS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsArtifact<'a> {
    pub models: Vec<OptimizedModel<'a>>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedModel<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub family: &'a str,
    pub architecture: &'a str,
    pub files: &'a [crate::types::FileRecord],
    pub downloads: u64,
    pub tags: Vec<&'a str>,
    pub total_size_bytes: u64,
    pub quantizations: Vec<&'a str>,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub discovery_method: &'a [String],
}

/// Tags capped at 10 entries, sorted for determinism (spec §4.J).
fn capped_tags(record: &ModelRecord) -> Vec<&str> {
    let mut tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
    tags.sort_unstable();
    tags.truncate(MAX_TAGS);
    tags
}

pub fn build(records: &[ModelRecord], generated_at: DateTime<Utc>) -> ModelsArtifact<'_> {
    let models = records
        .iter()
        .map(|record| OptimizedModel {
            id: &record.id,
            name: &record.name,
            family: &record.family,
            architecture: &record.architecture,
            files: &record.files,
            downloads: record.downloads,
            tags: capped_tags(record),
            total_size_bytes: record.total_size_bytes,
            quantizations: {
                let mut q: Vec<&str> = record.quantizations.iter().map(String::as_str).collect();
                q.sort_unstable();
                q
            },
            last_modified: record.last_modified,
            created_at: record.created_at,
            discovery_method: &record.discovery_method,
        })
        .collect();

    ModelsArtifact {
        models,
        metadata: GenerationMetadata::new(generated_at, records.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn caps_tags_at_ten() {
        let mut record = ModelRecord {
            id: "org/model".into(),
            name: "Model".into(),
            family: "org".into(),
            architecture: "Unknown".into(),
            files: vec![],
            downloads: 0,
            tags: (0..20).map(|i| format!("tag{i}")).collect::<HashSet<_>>(),
            total_size_bytes: 0,
            quantizations: HashSet::new(),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        };
        record.tags.insert("extra".to_string());
        let tags = capped_tags(&record);
        assert_eq!(tags.len(), MAX_TAGS);
    }
}
