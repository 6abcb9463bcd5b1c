//! `data/statistics.json` (spec §4.J).

use std::collections::HashMap;

use serde::Serialize;

use crate::enrich::derive_size_category;
use crate::types::{GenerationMetadata, ModelRecord};

const TOP_FAMILIES: usize = 20;
const TOP_BY_DOWNLOADS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_models: usize,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub total_downloads: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopModelEntry<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub downloads: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsArtifact<'a> {
    pub summary: Summary,
    pub architectures: HashMap<&'a str, usize>,
    pub families: HashMap<&'a str, usize>,
    pub quantizations: HashMap<&'a str, usize>,
    pub size_buckets: HashMap<&'static str, usize>,
    pub top_by_downloads: Vec<TopModelEntry<'a>>,
    pub metadata: GenerationMetadata,
}

fn top_n_by_count<'a>(counts: HashMap<&'a str, usize>, n: usize) -> HashMap<&'a str, usize> {
    let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.truncate(n);
    entries.into_iter().collect()
}

pub fn build(records: &[ModelRecord], generated_at: chrono::DateTime<chrono::Utc>) -> StatisticsArtifact<'_> {
    let mut architectures: HashMap<&str, usize> = HashMap::new();
    let mut families: HashMap<&str, usize> = HashMap::new();
    let mut quantizations: HashMap<&str, usize> = HashMap::new();
    let mut size_buckets: HashMap<&'static str, usize> = HashMap::new();

    let mut total_files = 0usize;
    let mut total_size_bytes = 0u64;
    let mut total_downloads = 0u64;

    for record in records {
        *architectures.entry(record.architecture.as_str()).or_insert(0) += 1;
        *families.entry(record.family.as_str()).or_insert(0) += 1;
        for q in &record.quantizations {
            *quantizations.entry(q.as_str()).or_insert(0) += 1;
        }
        let bucket = derive_size_category(&record.id).unwrap_or("unknown");
        *size_buckets.entry(bucket).or_insert(0) += 1;

        total_files += record.files.len();
        total_size_bytes += record.total_size_bytes;
        total_downloads += record.downloads;
    }

    let families = top_n_by_count(families, TOP_FAMILIES);

    let mut sorted_by_downloads: Vec<&ModelRecord> = records.iter().collect();
    sorted_by_downloads.sort_by(|a, b| b.downloads.cmp(&a.downloads));
    let top_by_downloads = sorted_by_downloads
        .into_iter()
        .take(TOP_BY_DOWNLOADS)
        .map(|r| TopModelEntry {
            id: &r.id,
            name: &r.name,
            downloads: r.downloads,
        })
        .collect();

    StatisticsArtifact {
        summary: Summary {
            total_models: records.len(),
            total_files,
            total_size_bytes,
            total_downloads,
        },
        architectures,
        families,
        quantizations,
        size_buckets,
        top_by_downloads,
        metadata: GenerationMetadata::new(generated_at, records.len()),
    }
}
