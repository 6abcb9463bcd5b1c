//! G4: cleanup, grounded in `RetentionCleanupManager` in
//! `original_source/scripts/retention_cleanup_manager.py`. Uses the shared
//! atomic-write helper from [`crate::io_util`] for the per-model backup
//! manifest, the same pattern [`crate::recovery::rollback`] uses.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{RetentionMetadata, RetentionReason};

const INTER_BATCH_PAUSE: Duration = Duration::from_millis(50);

/// Mark every tracked model's `cleanup_eligible`/`retention_reason` per the
/// preservation rules (spec §4.G4). Returns the updated metadata in place.
pub fn mark_eligibility(
    tracked: &mut [RetentionMetadata],
    current_top_k: &HashSet<String>,
    preserve_threshold: u64,
    cutoff: DateTime<Utc>,
) {
    for model in tracked.iter_mut() {
        if current_top_k.contains(&model.model_id) {
            model.cleanup_eligible = false;
            model.retention_reason = RetentionReason::TopK;
        } else if model.download_count >= preserve_threshold {
            model.cleanup_eligible = false;
            model.retention_reason = RetentionReason::HighDownloads;
        } else if model.last_updated >= cutoff {
            model.cleanup_eligible = false;
            model.retention_reason = RetentionReason::Recent;
        } else if model.first_seen >= cutoff {
            model.cleanup_eligible = false;
            model.retention_reason = RetentionReason::RecentlyDiscovered;
        } else {
            model.cleanup_eligible = true;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub removed_count: usize,
    pub preserved_count: usize,
    pub storage_freed_bytes: u64,
    pub removed_ids: Vec<String>,
}

/// Remove cleanup-eligible models in batches, optionally backing each one
/// up first. `data_dir` roots the relative file paths stored per model.
pub async fn cleanup(
    tracked: &[RetentionMetadata],
    data_dir: &Path,
    backup_dir: Option<&Path>,
    batch_size: usize,
) -> Result<CleanupReport, std::io::Error> {
    let eligible: Vec<&RetentionMetadata> = tracked.iter().filter(|m| m.cleanup_eligible).collect();
    let preserved_count = tracked.len() - eligible.len();

    let mut report = CleanupReport {
        preserved_count,
        ..Default::default()
    };

    for batch in eligible.chunks(batch_size.max(1)) {
        for model in batch {
            if let Some(backup_dir) = backup_dir {
                backup_model(model, data_dir, backup_dir).await?;
            }
            let freed = remove_model_files(model, data_dir).await?;
            report.storage_freed_bytes += freed;
            report.removed_count += 1;
            report.removed_ids.push(model.model_id.clone());
        }
        if report.removed_count < eligible.len() {
            tokio::time::sleep(INTER_BATCH_PAUSE).await;
        }
    }

    Ok(report)
}

async fn backup_model(model: &RetentionMetadata, data_dir: &Path, backup_dir: &Path) -> Result<(), std::io::Error> {
    let safe_id = model.model_id.replace('/', "_");
    let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let model_backup_dir = backup_dir.join(format!("{safe_id}_{ts}"));
    tokio::fs::create_dir_all(&model_backup_dir).await?;

    for relative_path in &model.file_paths {
        let source = data_dir.join(relative_path);
        if tokio::fs::metadata(&source).await.is_err() {
            continue;
        }
        let file_name = Path::new(relative_path)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(relative_path));
        let _ = tokio::fs::copy(&source, model_backup_dir.join(file_name)).await;
    }

    crate::io_util::atomic_write_json_pretty(
        &model_backup_dir.join("metadata.json"),
        model,
    )
    .await
}

async fn remove_model_files(model: &RetentionMetadata, data_dir: &Path) -> Result<u64, std::io::Error> {
    let mut freed = 0u64;
    for relative_path in &model.file_paths {
        let path = data_dir.join(relative_path);
        if let Ok(meta) = tokio::fs::metadata(&path).await {
            freed += meta.len();
        }
        let _ = tokio::fs::remove_file(&path).await;
    }
    Ok(freed)
}
