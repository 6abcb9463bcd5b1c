//! Multi-strategy discovery engine: runs the four strategies with a small
//! stagger between launches, isolates per-strategy failure, and merges the
//! results into a single deduplicated set.

pub mod heuristic;
pub mod merge;
pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::fetcher::Fetcher;
use crate::hub::client::HubClient;
use crate::types::ModelRef;

pub use merge::DiscoveryMetrics;

const STRATEGY_STAGGER: Duration = Duration::from_millis(500);

pub struct DiscoveryEngine {
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
}

impl DiscoveryEngine {
    pub fn new(hub: Arc<dyn HubClient>, fetcher: Arc<Fetcher>) -> Self {
        Self { hub, fetcher }
    }

    /// Run every strategy, merge, and return the deduplicated set plus
    /// metrics. Succeeds (returns a non-empty set) as long as at least one
    /// strategy produced a result; a strategy that errors contributes an
    /// empty `Vec` rather than aborting the others.
    pub async fn discover(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Vec<ModelRef>, DiscoveryMetrics), SyncError> {
        let primary_result = strategies::primary(self.hub.as_ref(), self.fetcher.as_ref(), cancel).await;
        let primary_refs = match primary_result {
            Ok(refs) => refs,
            Err(error) => {
                tracing::warn!(%error, "primary discovery strategy failed");
                Vec::new()
            }
        };

        tokio::time::sleep(STRATEGY_STAGGER).await;
        let quantization_refs = strategies::quantization_tags(
            self.hub.clone(),
            self.fetcher.clone(),
            cancel.clone(),
        )
        .await;

        tokio::time::sleep(STRATEGY_STAGGER).await;
        let architecture_refs = strategies::architecture_tags(
            self.hub.clone(),
            self.fetcher.clone(),
            cancel.clone(),
        )
        .await;

        tokio::time::sleep(STRATEGY_STAGGER).await;
        let organization_refs = strategies::organization_crawl(
            self.hub.clone(),
            self.fetcher.clone(),
            cancel.clone(),
        )
        .await;

        let all_empty = primary_refs.is_empty()
            && quantization_refs.is_empty()
            && architecture_refs.is_empty()
            && organization_refs.is_empty();
        if all_empty {
            return Err(SyncError::Data(
                "every discovery strategy returned an empty result".to_string(),
            ));
        }

        let (merged, metrics) = merge::merge(vec![
            ("primary".to_string(), primary_refs),
            ("quantization_tags".to_string(), quantization_refs),
            ("architecture_tags".to_string(), architecture_refs),
            ("organization_crawl".to_string(), organization_refs),
        ]);

        Ok((merged, metrics))
    }
}
