//! `data/families.json`, `data/architectures.json`, `data/quantizations.json`
//! (spec §4.J) — three faceted indexes, all built from the same grouping
//! shape: facet value -> ids that carry it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{GenerationMetadata, ModelRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetIndexArtifact {
    pub facets: BTreeMap<String, Vec<String>>,
    pub metadata: GenerationMetadata,
}

fn build_facet(
    records: &[ModelRecord],
    generated_at: chrono::DateTime<chrono::Utc>,
    key_for: impl Fn(&ModelRecord) -> Vec<&str>,
) -> FacetIndexArtifact {
    let mut facets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records {
        for key in key_for(record) {
            facets.entry(key.to_string()).or_default().push(record.id.clone());
        }
    }
    for ids in facets.values_mut() {
        ids.sort();
    }
    FacetIndexArtifact {
        facets,
        metadata: GenerationMetadata::new(generated_at, records.len()),
    }
}

pub fn build_families(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> FacetIndexArtifact {
    build_facet(records, generated_at, |r| vec![r.family.as_str()])
}

pub fn build_architectures(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> FacetIndexArtifact {
    build_facet(records, generated_at, |r| vec![r.architecture.as_str()])
}

pub fn build_quantizations(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> FacetIndexArtifact {
    build_facet(records, generated_at, |r| r.quantizations.iter().map(String::as_str).collect())
}
