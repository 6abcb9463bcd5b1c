//! Completeness verifier (spec §4.F), grounded in `CompletenessVerifier`/
//! `HuggingFaceStatsCollector`/`MissingModelRecovery` in
//! `original_source/scripts/completeness_system.py`. Owns its own
//! `Mutex<Option<(u64, Instant)>>` hub-total cache (3600s TTL), per the
//! redesign note in spec §9 that module-level caches belong to the
//! component that owns the concern.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::fetcher::{Fetcher, Outcome};
use crate::hub::client::HubClient;
use crate::hub::types::ListModelsQuery;
use crate::types::{Alert, AlertSeverity, ModelRecord};

const HUB_COUNT_CACHE_TTL: Duration = Duration::from_secs(3600);
const MISSING_SAMPLE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl CompletenessStatus {
    pub fn from_score(score: f64, warning: f64, excellent: f64) -> Self {
        if score >= excellent {
            CompletenessStatus::Excellent
        } else if score >= warning {
            CompletenessStatus::Good
        } else if score >= 90.0 {
            CompletenessStatus::Warning
        } else {
            CompletenessStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletenessReport {
    pub processed: usize,
    pub processed_with_files: usize,
    pub hub_total: u64,
    pub completeness_score: f64,
    pub status: Option<CompletenessStatus>,
    pub missing_models: Vec<String>,
    pub complete_data_rate: f64,
    pub file_accessibility_rate: f64,
}

pub struct CompletenessVerifier {
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    hub_count_cache: Mutex<Option<(u64, Instant)>>,
    warning_threshold: f64,
    excellent_threshold: f64,
}

impl CompletenessVerifier {
    pub fn new(
        hub: Arc<dyn HubClient>,
        fetcher: Arc<Fetcher>,
        warning_threshold: f64,
        excellent_threshold: f64,
    ) -> Self {
        Self {
            hub,
            fetcher,
            hub_count_cache: Mutex::new(None),
            warning_threshold,
            excellent_threshold,
        }
    }

    /// Total count of hub-reported `gguf`-tagged models, cached for 3600s;
    /// on fetch failure, falls back to the stale cached value if any, else 0.
    pub async fn hub_total(&self, cancel: &CancellationToken) -> u64 {
        {
            let cache = self.hub_count_cache.lock().await;
            if let Some((count, fetched_at)) = *cache
                && fetched_at.elapsed() < HUB_COUNT_CACHE_TTL
            {
                return count;
            }
        }

        let Some(permit) = self.fetcher.acquire(cancel).await else {
            return self.hub_count_cache.lock().await.as_ref().map(|(c, _)| *c).unwrap_or(0);
        };
        let result = self.hub.count_gguf_models().await;
        permit.report(Outcome::from_result(&result)).await;

        match result {
            Ok(count) => {
                *self.hub_count_cache.lock().await = Some((count, Instant::now()));
                count
            }
            Err(error) => {
                tracing::warn!(%error, "failed to fetch hub gguf total, falling back to stale cache");
                self.hub_count_cache.lock().await.as_ref().map(|(c, _)| *c).unwrap_or(0)
            }
        }
    }

    /// Verify completeness of `processed` against the hub's reported total,
    /// and sample the hub's most-recently-modified 100 models to flag ids
    /// absent from the processed set (spec §4.F). `file_accessibility_rate`
    /// is the accessible/total ratio from `AccessibilityCache::check_all`,
    /// or `None` when file verification was skipped (reported as 100%).
    pub async fn verify(
        &self,
        processed: &[ModelRecord],
        file_accessibility_rate: Option<f64>,
        cancel: &CancellationToken,
    ) -> Result<CompletenessReport, SyncError> {
        let hub_total = self.hub_total(cancel).await;
        let processed_with_files = processed.iter().filter(|m| !m.files.is_empty()).count();

        let completeness_score = if hub_total > 0 {
            100.0 * processed_with_files as f64 / hub_total as f64
        } else {
            0.0
        };
        let status = Some(CompletenessStatus::from_score(
            completeness_score,
            self.warning_threshold,
            self.excellent_threshold,
        ));

        let missing_models = self.sample_missing(processed, cancel).await;

        let complete_data_rate = if processed.is_empty() {
            100.0
        } else {
            100.0
                * processed
                    .iter()
                    .filter(|m| m.validation.as_ref().is_some_and(|v| v.completeness_score >= 80.0))
                    .count() as f64
                / processed.len() as f64
        };

        Ok(CompletenessReport {
            processed: processed.len(),
            processed_with_files,
            hub_total,
            completeness_score,
            status,
            missing_models,
            complete_data_rate,
            file_accessibility_rate: file_accessibility_rate.unwrap_or(100.0),
        })
    }

    async fn sample_missing(&self, processed: &[ModelRecord], cancel: &CancellationToken) -> Vec<String> {
        let processed_ids: std::collections::HashSet<&str> =
            processed.iter().map(|m| m.id.as_str()).collect();

        let Some(permit) = self.fetcher.acquire(cancel).await else {
            return Vec::new();
        };
        let query = ListModelsQuery {
            sort: Some("lastModified".to_string()),
            direction: Some(-1),
            limit: Some(MISSING_SAMPLE_SIZE),
            ..ListModelsQuery::gguf_tagged()
        };
        let result = self.hub.list_models(query).await;
        permit.report(Outcome::from_result(&result)).await;

        match result {
            Ok(summaries) => summaries
                .into_iter()
                .map(|s| s.id)
                .filter(|id| !processed_ids.contains(id.as_str()))
                .collect(),
            Err(error) => {
                tracing::warn!(%error, "failed to sample recent hub models for missing-model detection");
                Vec::new()
            }
        }
    }

    /// Alerts emitted on: score below the warning/excellent thresholds,
    /// missing-model count >= 50, or complete-data rate < 80% (spec §4.F).
    pub fn alerts(&self, report: &CompletenessReport) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let now = chrono::Utc::now();

        if report.completeness_score < 90.0 {
            alerts.push(Alert {
                severity: AlertSeverity::Critical,
                title: "completeness score critical".to_string(),
                message: format!("completeness score {:.1}% is below the critical floor", report.completeness_score),
                timestamp: now,
                context: Default::default(),
                suggested_actions: vec![
                    "investigate discovery strategy failures".to_string(),
                    "consider a full sync".to_string(),
                ],
            });
        } else if report.completeness_score < self.warning_threshold {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                title: "completeness score below warning threshold".to_string(),
                message: format!("completeness score {:.1}%", report.completeness_score),
                timestamp: now,
                context: Default::default(),
                suggested_actions: vec!["monitor discovery coverage over the next run".to_string()],
            });
        }

        if report.missing_models.len() >= 50 {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                title: "large number of missing models detected".to_string(),
                message: format!("{} models absent from the processed set", report.missing_models.len()),
                timestamp: now,
                context: Default::default(),
                suggested_actions: vec!["trigger missing-model recovery".to_string()],
            });
        }

        if report.complete_data_rate < 80.0 {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                title: "complete-data rate below threshold".to_string(),
                message: format!("{:.1}% of processed models have complete data", report.complete_data_rate),
                timestamp: now,
                context: Default::default(),
                suggested_actions: vec!["review validation auto-fix coverage".to_string()],
            });
        }

        if report.file_accessibility_rate < 90.0 {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                title: "file accessibility rate below threshold".to_string(),
                message: format!("{:.1}% of files verified accessible", report.file_accessibility_rate),
                timestamp: now,
                context: Default::default(),
                suggested_actions: vec!["re-run file accessibility verification".to_string()],
            });
        }

        alerts
    }
}

/// Attempt recovery of sampled missing-model ids: fetch each's `model_info`
/// and retain those whose siblings include a `.gguf` file (spec §4.F/S5).
pub async fn recover_missing(
    hub: &dyn HubClient,
    fetcher: &Fetcher,
    missing_ids: &[String],
    cancel: &CancellationToken,
) -> (Vec<String>, f64) {
    let mut recovered = Vec::new();
    for id in missing_ids {
        let Some(permit) = fetcher.acquire(cancel).await else {
            break;
        };
        let result = hub.model_info(id).await;
        permit.report(Outcome::from_result(&result)).await;
        if let Ok(summary) = result
            && summary.siblings.iter().any(|s| s.rfilename.ends_with(".gguf"))
        {
            recovered.push(id.clone());
        }
    }
    let recovery_rate = if missing_ids.is_empty() {
        0.0
    } else {
        100.0 * recovered.len() as f64 / missing_ids.len() as f64
    };
    (recovered, recovery_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds_match_spec() {
        assert_eq!(CompletenessStatus::from_score(99.0, 95.0, 98.0), CompletenessStatus::Excellent);
        assert_eq!(CompletenessStatus::from_score(96.0, 95.0, 98.0), CompletenessStatus::Good);
        assert_eq!(CompletenessStatus::from_score(92.0, 95.0, 98.0), CompletenessStatus::Warning);
        assert_eq!(CompletenessStatus::from_score(50.0, 95.0, 98.0), CompletenessStatus::Critical);
    }
}
