//! `data/models-light.json` (spec §4.J) — top 100 by downloads, minimal fields
//! for the site's initial paint before the full `models.json` loads.

use serde::Serialize;

use crate::types::{GenerationMetadata, ModelRecord};

const TOP_N: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightModel<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub architecture: &'a str,
    pub downloads: u64,
    pub total_size_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsLightArtifact<'a> {
    pub models: Vec<LightModel<'a>>,
    pub metadata: GenerationMetadata,
}

pub fn build(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> ModelsLightArtifact<'_> {
    let mut sorted: Vec<&ModelRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.downloads.cmp(&a.downloads));
    sorted.truncate(TOP_N);

    let models = sorted
        .into_iter()
        .map(|r| LightModel {
            id: &r.id,
            name: &r.name,
            architecture: &r.architecture,
            downloads: r.downloads,
            total_size_bytes: r.total_size_bytes,
        })
        .collect();

    ModelsLightArtifact {
        models,
        metadata: GenerationMetadata::new(generated_at, records.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: &str, downloads: u64) -> ModelRecord {
        ModelRecord {
            id: id.into(),
            name: id.into(),
            family: "org".into(),
            architecture: "Llama".into(),
            files: vec![],
            downloads,
            tags: HashSet::new(),
            total_size_bytes: 0,
            quantizations: HashSet::new(),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        }
    }

    #[test]
    fn truncates_to_top_100_by_downloads() {
        let records: Vec<ModelRecord> = (0..150).map(|i| record(&format!("org/m{i}"), i as u64)).collect();
        let artifact = build(&records, chrono::Utc::now());
        assert_eq!(artifact.models.len(), TOP_N);
        assert_eq!(artifact.models[0].downloads, 149);
        assert_eq!(artifact.metadata.total_models, 150);
    }
}
