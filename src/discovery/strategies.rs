//! The four discovery strategies that feed the merge step.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::discovery::heuristic::likely_has_gguf;
use crate::fetcher::Fetcher;
use crate::hub::client::HubClient;
use crate::hub::types::{ListModelsQuery, ModelSummary};
use crate::types::ModelRef;

const STAGGER: Duration = Duration::from_millis(250);

/// Fixed quantization label set searched by the "quantization tags" strategy.
/// Treated as configuration-in-spirit (no external config file needed for
/// this scale), hardcoded the way the teacher hardcodes its model roster.
pub const QUANTIZATION_SEARCH_LABELS: &[&str] = &[
    "Q4_K_M", "Q5_K_M", "Q8_0", "F16", "IQ3_S", "Q4_0", "Q6_K", "Q3_K_M",
];

/// Named model families searched by the "architecture tags" strategy.
pub const ARCHITECTURE_FAMILIES: &[&str] = &[
    "llama", "mistral", "qwen", "gemma", "phi", "deepseek", "yi", "falcon",
];

/// Publisher accounts known to widely publish GGUF conversions.
pub const GGUF_PUBLISHERS: &[&str] = &[
    "TheBloke", "bartowski", "mradermacher", "QuantFactory", "unsloth",
];

fn to_model_ref(summary: ModelSummary, method: &str, confidence: f64) -> ModelRef {
    let mut model_ref = ModelRef::new(summary.id, method, confidence);
    model_ref
        .attributes
        .insert("downloads".to_string(), summary.downloads.into());
    model_ref
        .attributes
        .insert("likes".to_string(), summary.likes.into());
    model_ref
        .attributes
        .insert("tags".to_string(), serde_json::json!(summary.tags));
    if let Some(author) = summary.author {
        model_ref
            .attributes
            .insert("author".to_string(), author.into());
    }
    if let Some(created_at) = summary.created_at {
        model_ref.attributes.insert(
            "created_at".to_string(),
            created_at.to_rfc3339().into(),
        );
    }
    if let Some(last_modified) = summary.last_modified {
        model_ref.attributes.insert(
            "last_modified".to_string(),
            last_modified.to_rfc3339().into(),
        );
    }
    model_ref
}

/// Strategy 1: every model carrying a `gguf` tag, sorted by downloads
/// descending, no pagination cap. Confidence 1.0.
pub async fn primary(
    hub: &dyn HubClient,
    fetcher: &Fetcher,
    cancel: &CancellationToken,
) -> Result<Vec<ModelRef>, crate::error::SyncError> {
    let Some(permit) = fetcher.acquire(cancel).await else {
        return Ok(Vec::new());
    };
    let query = ListModelsQuery {
        sort: Some("downloads".to_string()),
        direction: Some(-1),
        ..ListModelsQuery::gguf_tagged()
    };
    let result = hub.list_models(query).await;
    permit.report(crate::fetcher::Outcome::from_result(&result)).await;
    let summaries = result?;
    Ok(summaries
        .into_iter()
        .map(|s| to_model_ref(s, "primary", 1.0))
        .collect())
}

/// Strategy 2: per quantization label, search the hub, limit ~100 results,
/// keep only candidates the heuristic flags as GGUF-likely. Confidence 0.8.
pub async fn quantization_tags(
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    cancel: CancellationToken,
) -> Vec<ModelRef> {
    run_labeled_search(
        hub,
        fetcher,
        cancel,
        QUANTIZATION_SEARCH_LABELS,
        100,
        0.8,
        "quantization_tags",
        |label| label.to_string(),
    )
    .await
}

/// Strategy 3: per named family, search `"<family> gguf"`, limit ~50.
/// Confidence 0.7.
pub async fn architecture_tags(
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    cancel: CancellationToken,
) -> Vec<ModelRef> {
    run_labeled_search(
        hub,
        fetcher,
        cancel,
        ARCHITECTURE_FAMILIES,
        50,
        0.7,
        "architecture_tags",
        |family| format!("{family} gguf"),
    )
    .await
}

/// Strategy 4: per known publisher account, list their models, limit ~100
/// each. Confidence 0.9 — the account is a much stronger signal than a
/// free-text search term, so no heuristic filter is applied.
pub async fn organization_crawl(
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    cancel: CancellationToken,
) -> Vec<ModelRef> {
    let mut join_set = JoinSet::new();
    for (i, &author) in GGUF_PUBLISHERS.iter().enumerate() {
        let hub = hub.clone();
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        let author = author.to_string();
        join_set.spawn(async move {
            tokio::time::sleep(STAGGER * i as u32).await;
            let Some(permit) = fetcher.acquire(&cancel).await else {
                return Vec::new();
            };
            let query = ListModelsQuery {
                author: Some(author),
                limit: Some(100),
                ..Default::default()
            };
            let result = hub.list_models(query).await;
            permit.report(crate::fetcher::Outcome::from_result(&result)).await;
            match result {
                Ok(summaries) => summaries
                    .into_iter()
                    .map(|s| to_model_ref(s, "organization_crawl", 0.9))
                    .collect(),
                Err(error) => {
                    tracing::warn!(%error, "organization_crawl strategy task failed");
                    Vec::new()
                }
            }
        });
    }

    let mut out = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(refs) => out.extend(refs),
            Err(join_error) => tracing::warn!(%join_error, "organization_crawl task panicked"),
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
async fn run_labeled_search(
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    cancel: CancellationToken,
    labels: &'static [&'static str],
    limit: u32,
    confidence: f64,
    method: &'static str,
    search_term: impl Fn(&str) -> String + Send + Sync + 'static,
) -> Vec<ModelRef> {
    let search_term = Arc::new(search_term);
    let mut join_set = JoinSet::new();
    for (i, &label) in labels.iter().enumerate() {
        let hub = hub.clone();
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        let search_term = search_term.clone();
        join_set.spawn(async move {
            tokio::time::sleep(STAGGER * i as u32).await;
            let Some(permit) = fetcher.acquire(&cancel).await else {
                return Vec::new();
            };
            let query = ListModelsQuery {
                search: Some(search_term(label)),
                limit: Some(limit),
                ..Default::default()
            };
            let result = hub.list_models(query).await;
            permit.report(crate::fetcher::Outcome::from_result(&result)).await;
            match result {
                Ok(summaries) => summaries
                    .into_iter()
                    .filter(|s| likely_has_gguf(&s.id, &s.tags))
                    .map(|s| to_model_ref(s, method, confidence))
                    .collect::<Vec<_>>(),
                Err(error) => {
                    tracing::warn!(%error, label, "labeled search strategy task failed");
                    Vec::new()
                }
            }
        });
    }

    let mut out = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(refs) => out.extend(refs),
            Err(join_error) => tracing::warn!(%join_error, "labeled search task panicked"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::error::SyncError;
    use crate::hub::types::PathInfo;

    struct FakeHub {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HubClient for FakeHub {
        async fn list_models(&self, query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let suffix = query.search.or(query.author).unwrap_or_default();
            Ok(vec![ModelSummary {
                id: format!("org/model-{suffix}-gguf"),
                downloads: 10,
                likes: 1,
                tags: vec!["gguf".to_string()],
                author: None,
                created_at: None,
                last_modified: None,
                siblings: vec![],
            }])
        }
        async fn model_info(&self, _id: &str) -> Result<ModelSummary, SyncError> {
            unimplemented!()
        }
        async fn list_repo_files(&self, _id: &str) -> Result<Vec<String>, SyncError> {
            unimplemented!()
        }
        async fn get_paths_info(&self, _id: &str, _paths: &[String]) -> Result<Vec<PathInfo>, SyncError> {
            unimplemented!()
        }
        async fn count_gguf_models(&self) -> Result<u64, SyncError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn organization_crawl_hits_every_publisher() {
        let hub: Arc<dyn HubClient> = Arc::new(FakeHub { calls: AtomicUsize::new(0) });
        let fetcher = Arc::new(Fetcher::new(50, 5000));
        let cancel = CancellationToken::new();
        let refs = organization_crawl(hub, fetcher, cancel).await;
        assert_eq!(refs.len(), GGUF_PUBLISHERS.len());
        assert!(refs.iter().all(|r| r.confidence_score == 0.9));
    }

    #[tokio::test]
    async fn quantization_tags_filters_via_heuristic() {
        let hub: Arc<dyn HubClient> = Arc::new(FakeHub { calls: AtomicUsize::new(0) });
        let fetcher = Arc::new(Fetcher::new(50, 5000));
        let cancel = CancellationToken::new();
        let refs = quantization_tags(hub, fetcher, cancel).await;
        assert_eq!(refs.len(), QUANTIZATION_SEARCH_LABELS.len());
        assert!(refs.iter().all(|r| r.confidence_score == 0.8));
    }
}
