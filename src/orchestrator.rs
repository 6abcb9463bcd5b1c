//! Orchestrator (spec §4.H), grounded in `ScheduledUpdateOrchestrator` in
//! `original_source/scripts/scheduled_update_orchestrator.py`. Owns every
//! orchestrator-scoped component (constructed once in `main.rs`, per the
//! no-singletons note in spec §9) and sequences either the retention-mode
//! phase graph (G2 → G1 → G3 → G4) or the full-mode graph (discovery →
//! enrichment → validation → completeness), wrapping each critical phase
//! in a rollback point and recording the result as a `PhaseResult`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::completeness::CompletenessVerifier;
use crate::config::{Config, RetentionMode};
use crate::discovery::DiscoveryEngine;
use crate::enrich::Enricher;
use crate::error::SyncError;
use crate::fetcher::Fetcher;
use crate::hub::client::HubClient;
use crate::io_util::{atomic_write_json_pretty, read_json};
use crate::recovery::RecoveryLayer;
use crate::retention::{cleanup, date_filter, merge as retention_merge, top_models};
use crate::types::{
    ModelRecord, PhaseResult, RetentionMetadata, RetentionReason, RetentionSource, SyncMetadata,
    SyncMode, TopRanking, UpdateReport,
};
use crate::validate::AccessibilityCache;

/// Graph this run should execute — resolved once at the top of `run`
/// from `retention_mode` plus sync-mode arbitration (spec §4.G/§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseGraph {
    Retention,
    Full,
}

pub struct Orchestrator {
    hub: Arc<dyn HubClient>,
    fetcher: Arc<Fetcher>,
    discovery: DiscoveryEngine,
    enricher: Enricher,
    completeness: CompletenessVerifier,
    accessibility: Arc<AccessibilityCache>,
    recovery: RecoveryLayer,
    config: Config,
    data_dir: PathBuf,
    backup_dir: PathBuf,
    reports_dir: PathBuf,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hub: Arc<dyn HubClient>,
        fetcher: Arc<Fetcher>,
        discovery: DiscoveryEngine,
        enricher: Enricher,
        completeness: CompletenessVerifier,
        accessibility: Arc<AccessibilityCache>,
        recovery: RecoveryLayer,
        config: Config,
    ) -> Self {
        let data_dir = PathBuf::from(&config.data_dir);
        let backup_dir = data_dir.join("backups");
        let reports_dir = PathBuf::from("reports");
        Self {
            hub,
            fetcher,
            discovery,
            enricher,
            completeness,
            accessibility,
            recovery,
            config,
            data_dir,
            backup_dir,
            reports_dir,
        }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> UpdateReport {
        let start_time = Utc::now();
        let mut report = UpdateReport::new(start_time);

        if cancel.is_cancelled() {
            report.end_time = Some(Utc::now());
            report.errors_encountered.push("cancelled before start".to_string());
            report.overall_success = false;
            return report;
        }

        let previous_sync: Option<SyncMetadata> = self.load_previous_sync_metadata().await;
        let graph = self.resolve_graph(previous_sync.as_ref());

        let records = match graph {
            PhaseGraph::Retention => self.run_retention_graph(&mut report, cancel).await,
            PhaseGraph::Full => self.run_full_graph(&mut report, previous_sync.as_ref(), cancel).await,
        };

        let Some(mut records) = records else {
            report.end_time = Some(Utc::now());
            self.finalize_success(&mut report, graph);
            self.maybe_emergency_rollback(&mut report).await;
            return report;
        };

        self.validate_and_stamp(&mut records, start_time);
        report.total_models_processed = records.len() as u64;

        let accessibility_rate = if self.config.enable_file_verification {
            self.verify_accessibility(&records).await
        } else {
            None
        };

        match self.completeness.verify(&records, accessibility_rate, cancel).await {
            Ok(completeness_report) => {
                for alert in self.completeness.alerts(&completeness_report) {
                    self.recovery
                        .alerts
                        .maybe_send("completeness", "ScoreBelowThreshold", alert)
                        .await;
                }
                if !completeness_report.missing_models.is_empty() {
                    let (recovered, recovery_rate) = crate::completeness::recover_missing(
                        self.hub.as_ref(),
                        self.fetcher.as_ref(),
                        &completeness_report.missing_models,
                        cancel,
                    )
                    .await;
                    report.models_recovered = recovered.len() as u64;
                    tracing::info!(
                        recovered = recovered.len(),
                        sampled = completeness_report.missing_models.len(),
                        recovery_rate,
                        "missing-model recovery pass complete"
                    );
                }
            }
            Err(error) => tracing::warn!(%error, "completeness verification failed"),
        }

        let sync_mode = match graph {
            PhaseGraph::Retention => SyncMode::Retention,
            PhaseGraph::Full => self.last_sync_mode(previous_sync.as_ref()),
        };

        if !self.config.dry_run {
            if let Err(error) = self.persist_artifacts(&records, start_time, sync_mode, &report).await {
                tracing::error!(%error, "failed writing artifacts");
                report.errors_encountered.push(format!("artifact write failed: {error}"));
            }
        }

        report.end_time = Some(Utc::now());
        self.finalize_success(&mut report, graph);

        if !self.config.dry_run {
            self.persist_report(&report).await;
            self.persist_sync_metadata(&report, sync_mode, start_time).await;
        }

        self.maybe_emergency_rollback(&mut report).await;
        report
    }

    fn resolve_graph(&self, previous_sync: Option<&SyncMetadata>) -> PhaseGraph {
        match self.config.retention_mode {
            RetentionMode::Retention => PhaseGraph::Retention,
            RetentionMode::Full => PhaseGraph::Full,
            // Auto: lean on the steady-state retention graph once a prior
            // successful sync exists; a first run or a forced full sync
            // uses the full discovery graph (decision recorded in DESIGN.md).
            RetentionMode::Auto => {
                if self.config.force_full_sync || previous_sync.is_none() {
                    PhaseGraph::Full
                } else {
                    PhaseGraph::Retention
                }
            }
        }
    }

    /// Full-mode sync-mode arbitration (spec §4.H): incremental unless the
    /// previous sync is missing/stale/failed or a full sync was forced.
    fn last_sync_mode(&self, previous_sync: Option<&SyncMetadata>) -> SyncMode {
        if self.config.force_full_sync {
            return SyncMode::Full;
        }
        match previous_sync {
            Some(previous) if previous.success => {
                let hours_since = (Utc::now() - previous.last_sync_time).num_seconds() as f64 / 3600.0;
                if hours_since <= self.config.full_sync_threshold_hours as f64 {
                    SyncMode::Incremental
                } else {
                    SyncMode::Full
                }
            }
            _ => SyncMode::Full,
        }
    }

    // ---- Retention graph (G2 -> G1 -> G3 -> G4) ----

    async fn run_retention_graph(
        &self,
        report: &mut UpdateReport,
        cancel: &CancellationToken,
    ) -> Option<Vec<ModelRecord>> {
        let retention_dir = self.data_dir.join("retention");
        let top_models_path = retention_dir.join("top_models.json");
        let top_rankings_path = retention_dir.join("top_rankings.json");
        let ranking_history_path = retention_dir.join("ranking_history.json");
        let retention_metadata_path = retention_dir.join("retention_metadata.json");

        let previous_rankings: Vec<TopRanking> =
            read_json(&top_rankings_path).await.ok().flatten().unwrap_or_default();
        let mut history: Vec<(DateTime<Utc>, Vec<TopRanking>)> =
            read_json(&ranking_history_path).await.ok().flatten().unwrap_or_default();

        let _ = self
            .recovery
            .rollback_point(
                "top_models_phase",
                &[top_models_path.clone(), top_rankings_path.clone(), ranking_history_path.clone()],
            )
            .await;

        let now = Utc::now();
        let top_models_count = self.config.top_models_count;
        let (top_result, phase) = self
            .recovery
            .run_phase("top_models", || async {
                let result =
                    top_models::update(self.hub.as_ref(), self.fetcher.as_ref(), top_models_count, &previous_rankings, now, cancel)
                        .await;
                if result.success {
                    let count = result.models.len() as u64;
                    Ok((result, count))
                } else {
                    Err(SyncError::Data("top-models update returned no data".to_string()))
                }
            })
            .await;
        report.api_calls_made += top_result.as_ref().map(|r| r.api_calls as u64).unwrap_or(0);
        report.push_phase(phase);

        let Some(top_result) = top_result else {
            return None;
        };
        report.top_models_updated = top_result.models.len() as u64;

        if self.config.ranking_history_enabled {
            history.push((now, top_result.rankings.clone()));
            top_models::trim_history(&mut history, now, self.config.ranking_history_days);
            let _ = atomic_write_json_pretty(&ranking_history_path, &history).await;
        }
        let _ = atomic_write_json_pretty(&top_rankings_path, &top_result.rankings).await;
        let _ = atomic_write_json_pretty(&top_models_path, &top_result.models).await;

        let _ = self.recovery.rollback_point("date_filter_phase", &[top_models_path.clone()]).await;

        let retention_days = self.config.retention_days;
        let recent_models_priority = self.config.recent_models_priority;
        let (date_result, phase) = self
            .recovery
            .run_phase("date_filter", || async {
                let result =
                    date_filter::extract(self.hub.as_ref(), self.fetcher.as_ref(), retention_days, recent_models_priority, now, cancel)
                        .await;
                if result.success {
                    let count = result.models.len() as u64;
                    Ok((result, count))
                } else {
                    Err(SyncError::Data("date-filtered extraction returned no data".to_string()))
                }
            })
            .await;
        report.api_calls_made += date_result.as_ref().map(|r| r.api_calls as u64).unwrap_or(0);
        report.push_phase(phase);

        let Some(date_result) = date_result else {
            return None;
        };
        report.recent_models_fetched = date_result.models.len() as u64;

        let legacy_root = self.data_dir.parent().unwrap_or(&self.data_dir);
        let _ = self
            .recovery
            .rollback_point("merge_phase", &[legacy_root.join("gguf_models.json"), top_models_path.clone()])
            .await;

        let (merge_result, phase) = self
            .recovery
            .run_phase("merge", || async {
                let merged = retention_merge::merge(date_result.models, top_result.models);
                Ok((merged, 1u64))
            })
            .await;
        report.push_phase(phase);

        let Some(merge_result) = merge_result else {
            return None;
        };
        report.models_merged = merge_result.total_models as u64;
        report.duplicates_removed = merge_result.duplicates_removed as u64;

        let enriched = self.enricher.enrich_all(merge_result.models, cancel).await;

        if self.config.cleanup_enabled {
            self.run_cleanup_phase(report, &enriched, &retention_metadata_path, now).await;
        } else {
            report.push_phase(PhaseResult::ok("cleanup", 0.0, 0));
        }

        Some(enriched)
    }

    async fn run_cleanup_phase(
        &self,
        report: &mut UpdateReport,
        records: &[ModelRecord],
        retention_metadata_path: &std::path::Path,
        now: DateTime<Utc>,
    ) {
        let mut tracked: Vec<RetentionMetadata> =
            read_json(retention_metadata_path).await.ok().flatten().unwrap_or_default();
        reconcile_retention_metadata(&mut tracked, records, now);

        let current_top_k: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
        let cutoff = now - chrono::Duration::days(self.config.retention_days as i64);
        cleanup::mark_eligibility(&mut tracked, &current_top_k, self.config.preserve_download_threshold, cutoff);

        let backup_dir = self.config.enable_backups.then_some(self.backup_dir.as_path());
        let batch_size = self.config.cleanup_batch_size as usize;
        let (cleanup_result, phase) = self
            .recovery
            .run_phase("cleanup", || async {
                let result = cleanup::cleanup(&tracked, &self.data_dir, backup_dir, batch_size)
                    .await
                    .map_err(|e| SyncError::System(e.to_string()))?;
                let count = result.removed_count as u64;
                Ok((result, count))
            })
            .await;
        report.push_phase(phase);

        if let Some(cleanup_result) = cleanup_result {
            report.models_cleaned_up = cleanup_result.removed_count as u64;
            report.storage_freed_mb = cleanup_result.storage_freed_bytes as f64 / (1024.0 * 1024.0);
            tracked.retain(|m| !cleanup_result.removed_ids.contains(&m.model_id));
        }

        let _ = atomic_write_json_pretty(retention_metadata_path, &tracked).await;
    }

    // ---- Full-mode graph (discovery -> enrichment -> validation -> completeness) ----

    async fn run_full_graph(
        &self,
        report: &mut UpdateReport,
        previous_sync: Option<&SyncMetadata>,
        cancel: &CancellationToken,
    ) -> Option<Vec<ModelRecord>> {
        let artifacts_path = self.data_dir.join("models.json");
        let _ = self.recovery.rollback_point("discovery_phase", &[artifacts_path]).await;

        let (discovery_result, phase) = self
            .recovery
            .run_phase("discovery", || async {
                let (refs, metrics) = self.discovery.discover(cancel).await?;
                Ok(((refs, metrics.total_raw as u64), metrics.total_unique as u64))
            })
            .await;
        report.push_phase(phase);

        let Some((candidates, api_calls)) = discovery_result else {
            return None;
        };
        report.api_calls_made += api_calls;

        let started = std::time::Instant::now();
        let mut records = self.enricher.enrich_all(candidates, cancel).await;
        report.push_phase(PhaseResult::ok("enrichment", started.elapsed().as_secs_f64(), records.len() as u64));

        if self.last_sync_mode(previous_sync) == SyncMode::Incremental {
            self.apply_incremental_window(&mut records, previous_sync);
        }

        Some(records)
    }

    /// Keep only recently-modified records when running incrementally; if
    /// the resulting change ratio against the previous run's processed
    /// count exceeds `significant_change_threshold`, escalate back to the
    /// unfiltered full set rather than publish a suspiciously small diff
    /// (spec §4.H).
    fn apply_incremental_window(&self, records: &mut Vec<ModelRecord>, previous_sync: Option<&SyncMetadata>) {
        let full_count = records.len();
        let now = Utc::now();
        let window_hours = self.config.incremental_window_hours as f64;
        let filtered: Vec<ModelRecord> = records
            .iter()
            .filter(|r| {
                r.last_modified
                    .map(|m| (now - m).num_seconds() as f64 / 3600.0 <= window_hours)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let Some(previous) = previous_sync else {
            *records = filtered;
            return;
        };
        let change_ratio = if previous.processed > 0 {
            (filtered.len() as i64 - previous.processed as i64).unsigned_abs() as f64 / previous.processed as f64
        } else {
            1.0
        };

        if change_ratio > self.config.significant_change_threshold {
            tracing::info!(change_ratio, full_count, "incremental change ratio exceeds threshold, publishing full set instead");
        } else {
            *records = filtered;
        }
    }

    // ---- Shared tail: validation, freshness, accessibility, artifacts, state ----

    fn validate_and_stamp(&self, records: &mut [ModelRecord], synced_at: DateTime<Utc>) {
        let now = Utc::now();
        for record in records.iter_mut() {
            record.validation = Some(if self.config.enable_automatic_fixes {
                crate::validate::validate_and_repair(record)
            } else {
                let issues = crate::validate::schema::validate(record);
                crate::types::ValidationAnnotation {
                    is_valid: !issues.iter().any(|i| {
                        i.severity == crate::types::IssueSeverity::Critical
                            || i.severity == crate::types::IssueSeverity::Error
                    }),
                    quality_score: crate::validate::score::quality_score_with_bonus(record, &issues),
                    completeness_score: crate::validate::score::completeness_score(record),
                    issues_count: issues.len() as u32,
                    auto_fixes_applied: 0,
                    validated_at: now,
                }
            });
            crate::freshness::stamp(record, synced_at, now);
        }
    }

    /// Returns the accessible/total ratio as a percentage, or `None` when
    /// there were no files to check.
    async fn verify_accessibility(&self, records: &[ModelRecord]) -> Option<f64> {
        let urls: Vec<String> = records.iter().flat_map(|r| r.files.iter().map(|f| f.download_url.clone())).collect();
        if urls.is_empty() {
            return None;
        }
        let (accessible, total) = self.accessibility.check_all(urls).await;
        Some(100.0 * accessible as f64 / total as f64)
    }

    async fn persist_artifacts(
        &self,
        records: &[ModelRecord],
        start_time: DateTime<Utc>,
        sync_mode: SyncMode,
        report: &UpdateReport,
    ) -> Result<(), std::io::Error> {
        let generated_at = Utc::now();
        crate::artifacts::write_all(records, &self.data_dir, generated_at).await?;

        let sync_mode_label = format!("{sync_mode:?}").to_lowercase();
        let sync_duration = (generated_at - start_time).num_seconds() as f64;
        let freshness_metadata =
            crate::freshness::generate_metadata(records, start_time, sync_duration, &sync_mode_label, report.phases_failed == 0);
        let freshness_indicator = crate::freshness::generate_indicator(&freshness_metadata);

        atomic_write_json_pretty(&self.data_dir.join("freshness_metadata.json"), &freshness_metadata).await?;
        atomic_write_json_pretty(&self.data_dir.join("freshness_indicators.json"), &freshness_indicator).await?;
        Ok(())
    }

    async fn persist_report(&self, report: &UpdateReport) {
        let ts = Utc::now().format("%Y%m%d_%H%M%S");
        let timestamped = self.reports_dir.join(format!("update_report_{ts}.json"));
        let latest = self.reports_dir.join("latest_update_report.json");
        if let Err(error) = atomic_write_json_pretty(&timestamped, report).await {
            tracing::warn!(%error, "failed writing timestamped update report");
        }
        if let Err(error) = atomic_write_json_pretty(&latest, report).await {
            tracing::warn!(%error, "failed writing latest update report");
        }
    }

    async fn persist_sync_metadata(&self, report: &UpdateReport, sync_mode: SyncMode, start_time: DateTime<Utc>) {
        let metadata = SyncMetadata {
            last_sync_time: start_time,
            sync_mode,
            processed: report.total_models_processed,
            added: 0,
            updated: report.total_models_processed,
            removed: report.models_cleaned_up,
            duration_seconds: report.end_time.map(|end| (end - start_time).num_seconds() as f64).unwrap_or(0.0),
            success: report.overall_success,
            error_message: report.errors_encountered.first().cloned(),
        };
        let _ = atomic_write_json_pretty(&self.data_dir.join("last_sync_metadata.json"), &metadata).await;
    }

    async fn load_previous_sync_metadata(&self) -> Option<SyncMetadata> {
        read_json(&self.data_dir.join("last_sync_metadata.json")).await.ok().flatten()
    }

    /// `overall_success` (spec §4.H): retention mode requires `top_models`,
    /// `date_filter`, and `merge` to have all succeeded, plus zero failed
    /// phases overall; full mode requires `discovery` and `enrichment`.
    fn finalize_success(&self, report: &mut UpdateReport, graph: PhaseGraph) {
        let critical_ok = match graph {
            PhaseGraph::Retention => {
                report.phase_succeeded("top_models") && report.phase_succeeded("date_filter") && report.phase_succeeded("merge")
            }
            PhaseGraph::Full => report.phase_succeeded("discovery") && report.phase_succeeded("enrichment"),
        };
        report.overall_success = critical_ok && report.phases_failed == 0;
    }

    async fn maybe_emergency_rollback(&self, report: &mut UpdateReport) {
        if report.overall_success || !self.config.preserve_data_on_failure {
            return;
        }
        let Some(point) = self.recovery.rollback.latest().await else {
            return;
        };
        match self.recovery.rollback.restore(&point).await {
            Ok(()) => {
                report.rollback_performed = true;
                report.rollback_successful = true;
            }
            Err(error) => {
                tracing::error!(%error, "emergency rollback failed");
                report.rollback_performed = true;
                report.rollback_successful = false;
            }
        }
    }
}

/// Reconcile tracked retention metadata against the freshly merged/enriched
/// set: new ids get a fresh entry, known ids get `last_updated`/`download_count`
/// refreshed. `first_seen` is preserved for existing entries (spec §4.G4).
fn reconcile_retention_metadata(tracked: &mut Vec<RetentionMetadata>, records: &[ModelRecord], now: DateTime<Utc>) {
    let mut index_by_id: std::collections::HashMap<String, usize> =
        tracked.iter().enumerate().map(|(i, m)| (m.model_id.clone(), i)).collect();

    for record in records {
        let source = if record.discovery_method.iter().any(|m| m == "date_filtered" || m == "date_filtered_no_date") {
            RetentionSource::Recent
        } else {
            RetentionSource::Top
        };
        match index_by_id.get(&record.id) {
            Some(&index) => {
                tracked[index].last_updated = now;
                tracked[index].download_count = record.downloads;
                tracked[index].file_size_bytes = record.total_size_bytes;
            }
            None => {
                index_by_id.insert(record.id.clone(), tracked.len());
                tracked.push(RetentionMetadata {
                    model_id: record.id.clone(),
                    first_seen: now,
                    last_updated: now,
                    source,
                    download_count: record.downloads,
                    retention_reason: RetentionReason::ExistingModel,
                    cleanup_eligible: false,
                    file_size_bytes: record.total_size_bytes,
                    file_paths: Vec::new(),
                });
            }
        }
    }
}
