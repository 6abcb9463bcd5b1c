//! Per-candidate enrichment: resolves file listings, fetches per-file
//! metadata, and derives quantization/architecture/size/name fields.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::fetcher::{Fetcher, Outcome};
use crate::hub::client::HubClient;
use crate::types::{derive_display_name, FileRecord, ModelRecord, ModelRef, UNKNOWN_QUANTIZATION};

const MAX_FILES_PER_MODEL: usize = 10;

/// Priority-ordered quantization labels: longest/most-specific match wins,
/// so `Q3_K_S`/`Q3_K_M`/`Q3_K_L` must precede the bare `Q3_K` alternatives.
const QUANTIZATION_PRIORITY: &[&str] = &[
    "Q3_K_S", "Q3_K_M", "Q3_K_L", "Q4_K_S", "Q4_K_M", "Q5_K_S", "Q5_K_M", "IQ1_S", "IQ1_M",
    "IQ2_XXS", "IQ2_XS", "IQ2_S", "IQ3_XXS", "IQ3_S", "IQ3_M", "IQ4_XS", "Q2_K", "Q4_0", "Q4_1",
    "Q5_0", "Q5_1", "Q6_K", "Q8_0", "Q8_K", "F16", "F32",
];

pub fn derive_quantization_from_filename(filename: &str) -> String {
    let upper = filename.to_uppercase();
    for label in QUANTIZATION_PRIORITY {
        if upper.contains(label) {
            return (*label).to_string();
        }
    }
    if upper.contains("FP16") {
        return "F16".to_string();
    }
    if upper.contains("INT8") {
        return "Q8_0".to_string();
    }
    if upper.contains("INT4") {
        return "Q4_0".to_string();
    }
    UNKNOWN_QUANTIZATION.to_string()
}

/// Ordered architecture pattern table: first match wins, so more specific
/// version patterns precede their bare family name.
const ARCHITECTURE_PATTERNS: &[(&[&str], &str)] = &[
    (&["llama-2", "llama-3", "llama"], "Llama"),
    (&["mixtral"], "Mixtral"),
    (&["mistral"], "Mistral"),
    (&["qwen2", "qwen"], "Qwen"),
    (&["gemma-2", "gemma"], "Gemma"),
    (&["phi-3", "phi-2", "phi"], "Phi"),
    (&["deepseek"], "DeepSeek"),
    (&["falcon"], "Falcon"),
    (&["yi-"], "Yi"),
];

pub fn derive_architecture(id: &str, tags: &[String]) -> String {
    let haystack = std::iter::once(id.to_lowercase())
        .chain(tags.iter().map(|t| t.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    for (patterns, architecture) in ARCHITECTURE_PATTERNS {
        if patterns.iter().any(|p| haystack.contains(p)) {
            return (*architecture).to_string();
        }
    }
    "Unknown".to_string()
}

const SIZE_CATEGORY_TABLE: &[(&[&str], &str)] = &[
    (&["1b", "1.3b", "2b", "3b"], "small"),
    (&["7b", "8b", "9b", "11b", "13b"], "medium"),
    (&["20b", "30b", "34b", "40b", "70b"], "large"),
    (&["120b", "175b", "180b"], "xlarge"),
];

pub fn derive_size_category(id: &str) -> Option<&'static str> {
    let lower = id.to_lowercase();
    for (needles, category) in SIZE_CATEGORY_TABLE {
        if needles.iter().any(|n| lower.contains(n)) {
            return Some(category);
        }
    }
    None
}

pub fn size_human(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

pub struct Enricher {
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
}

impl Enricher {
    pub fn new(hub: Arc<dyn HubClient>, fetcher: Arc<Fetcher>) -> Self {
        Self { hub, fetcher }
    }

    /// Enrich every candidate, fanning out with bounded concurrency gated
    /// by the shared fetcher. Candidates that resolve to zero `.gguf` files
    /// are dropped rather than surfaced as errors.
    pub async fn enrich_all(
        &self,
        candidates: Vec<ModelRef>,
        cancel: &CancellationToken,
    ) -> Vec<ModelRecord> {
        let mut join_set = JoinSet::new();
        for candidate in candidates {
            let hub = self.hub.clone();
            let fetcher = self.fetcher.clone();
            let cancel = cancel.clone();
            join_set.spawn(async move { enrich_one(hub.as_ref(), fetcher.as_ref(), candidate, &cancel).await });
        }

        let mut out = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Some(record)) => out.push(record),
                Ok(None) => {}
                Err(join_error) => tracing::warn!(%join_error, "enrichment task panicked"),
            }
        }
        out
    }
}

async fn enrich_one(
    hub: &dyn HubClient,
    fetcher: &Fetcher,
    candidate: ModelRef,
    cancel: &CancellationToken,
) -> Option<ModelRecord> {
    let filenames = match fetch_with_permit(fetcher, cancel, || hub.list_repo_files(&candidate.id)).await {
        Some(Ok(files)) => files,
        Some(Err(error)) => {
            tracing::warn!(model = %candidate.id, %error, "list_repo_files failed during enrichment");
            Vec::new()
        }
        None => Vec::new(),
    };

    let gguf_filenames: Vec<String> = filenames
        .into_iter()
        .filter(|f| f.ends_with(".gguf"))
        .take(MAX_FILES_PER_MODEL)
        .collect();

    if gguf_filenames.is_empty() {
        return None;
    }

    let paths_result =
        fetch_with_permit(fetcher, cancel, || hub.get_paths_info(&candidate.id, &gguf_filenames)).await;

    let files: Vec<FileRecord> = match paths_result {
        Some(Ok(infos)) => gguf_filenames
            .iter()
            .map(|filename| {
                let info = infos.iter().find(|i| i.path == *filename);
                build_file_record(filename, info.map(|i| i.size).unwrap_or(0), info.and_then(|i| {
                    i.last_commit.as_ref().and_then(|c| c.date)
                }))
            })
            .collect(),
        _ => gguf_filenames
            .iter()
            .map(|filename| build_file_record(filename, 0, None))
            .collect(),
    };

    let tags: Vec<String> = candidate
        .attributes
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let author = candidate
        .attributes
        .get("author")
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| candidate.id.split('/').next().unwrap_or("unknown"))
        .to_string();

    let quantizations: std::collections::HashSet<String> =
        files.iter().map(|f| f.quantization.clone()).collect();

    let mut record = ModelRecord {
        id: candidate.id.clone(),
        name: derive_display_name(&candidate.id),
        family: author,
        architecture: derive_architecture(&candidate.id, &tags),
        files,
        downloads: candidate.downloads(),
        tags: tags.into_iter().collect(),
        total_size_bytes: 0,
        quantizations,
        last_modified: candidate
            .attributes
            .get("last_modified")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc)),
        created_at: candidate.created_at(),
        discovery_method: candidate.discovery_method,
        confidence_score: candidate.confidence_score,
        validation: None,
        freshness: None,
    };
    record.recompute_total_size();
    record.sort_files_by_size_desc();
    Some(record)
}

fn build_file_record(
    filename: &str,
    size_bytes: u64,
    last_modified: Option<chrono::DateTime<chrono::Utc>>,
) -> FileRecord {
    FileRecord {
        filename: filename.to_string(),
        size_bytes,
        size_human: size_human(size_bytes),
        quantization: derive_quantization_from_filename(filename),
        download_url: format!("https://huggingface.co/{filename}"),
        last_modified,
    }
}

async fn fetch_with_permit<T, F, Fut>(
    fetcher: &Fetcher,
    cancel: &CancellationToken,
    op: F,
) -> Option<Result<T, SyncError>>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, SyncError>>,
{
    let permit = fetcher.acquire(cancel).await?;
    let result = op().await;
    permit.report(Outcome::from_result(&result)).await;
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_prefers_more_specific_label() {
        assert_eq!(derive_quantization_from_filename("model.Q3_K_S.gguf"), "Q3_K_S");
        assert_eq!(derive_quantization_from_filename("model.Q3_K_M.gguf"), "Q3_K_M");
        assert_eq!(derive_quantization_from_filename("model.fp16.gguf"), "F16");
        assert_eq!(derive_quantization_from_filename("model.int4.gguf"), "Q4_0");
        assert_eq!(derive_quantization_from_filename("model.bin"), UNKNOWN_QUANTIZATION);
    }

    #[test]
    fn architecture_matches_most_specific_pattern_first() {
        assert_eq!(derive_architecture("org/llama-3-8b", &[]), "Llama");
        assert_eq!(derive_architecture("org/mixtral-8x7b", &[]), "Mixtral");
        assert_eq!(derive_architecture("org/unknown-thing", &[]), "Unknown");
    }

    #[test]
    fn size_category_buckets_by_id_substring() {
        assert_eq!(derive_size_category("org/model-7b"), Some("medium"));
        assert_eq!(derive_size_category("org/model-70b"), Some("large"));
        assert_eq!(derive_size_category("org/model-175b"), Some("xlarge"));
        assert_eq!(derive_size_category("org/model"), None);
    }

    #[test]
    fn size_human_formats_units() {
        assert_eq!(size_human(512), "512 B");
        assert_eq!(size_human(2048), "2.00 KB");
    }
}
