//! `data/search-index.json` (spec §4.J).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{GenerationMetadata, ModelRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry<'a> {
    pub search_text: String,
    pub name: &'a str,
    pub arch: &'a str,
    pub family: &'a str,
    pub quants: Vec<&'a str>,
    pub size: u64,
    pub downloads: u64,
    pub files: usize,
    pub discovery_method: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndexArtifact<'a> {
    pub models: BTreeMap<&'a str, SearchEntry<'a>>,
    pub metadata: GenerationMetadata,
}

fn search_text(record: &ModelRecord) -> String {
    let mut parts = vec![record.id.to_lowercase(), record.name.to_lowercase(), record.family.to_lowercase(), record.architecture.to_lowercase()];
    parts.extend(record.tags.iter().map(|t| t.to_lowercase()));
    parts.join(" ")
}

pub fn build(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> SearchIndexArtifact<'_> {
    let models = records
        .iter()
        .map(|record| {
            let mut quants: Vec<&str> = record.quantizations.iter().map(String::as_str).collect();
            quants.sort_unstable();
            (
                record.id.as_str(),
                SearchEntry {
                    search_text: search_text(record),
                    name: &record.name,
                    arch: &record.architecture,
                    family: &record.family,
                    quants,
                    size: record.total_size_bytes,
                    downloads: record.downloads,
                    files: record.files.len(),
                    discovery_method: &record.discovery_method,
                },
            )
        })
        .collect();

    SearchIndexArtifact {
        models,
        metadata: GenerationMetadata::new(generated_at, records.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn search_text_includes_id_name_and_tags() {
        let record = ModelRecord {
            id: "Org/Model-Name".into(),
            name: "Model Name".into(),
            family: "Org".into(),
            architecture: "Llama".into(),
            files: vec![],
            downloads: 0,
            tags: HashSet::from(["Chat".to_string()]),
            total_size_bytes: 0,
            quantizations: HashSet::new(),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        };
        let text = search_text(&record);
        assert!(text.contains("org/model-name"));
        assert!(text.contains("chat"));
    }
}
