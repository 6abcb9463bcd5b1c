//! Rollback points (spec §4.B, §4.H, P10): a tagged snapshot of files,
//! restorable atomically. Kept as a bounded ring buffer (last 10); eviction
//! deletes the associated backup directory.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

const MAX_ROLLBACK_POINTS: usize = 10;

#[derive(Debug, Clone)]
pub struct RollbackPoint {
    pub tag: String,
    pub backup_dir: PathBuf,
    /// (original path, backup path) pairs.
    pub file_backups: Vec<(PathBuf, PathBuf)>,
}

pub struct RollbackManager {
    backups_root: PathBuf,
    points: Mutex<Vec<RollbackPoint>>,
}

impl RollbackManager {
    pub fn new(backups_root: impl Into<PathBuf>) -> Self {
        Self {
            backups_root: backups_root.into(),
            points: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot every file in `files` under a fresh timestamped backup
    /// directory. Missing source files are skipped (nothing to back up yet).
    pub async fn create_rollback_point(
        &self,
        tag: &str,
        files: &[PathBuf],
    ) -> Result<RollbackPoint, std::io::Error> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros();
        let backup_dir = self.backups_root.join(format!("pre_update_{ts}"));
        tokio::fs::create_dir_all(&backup_dir).await?;

        let mut file_backups = Vec::new();
        for (i, file) in files.iter().enumerate() {
            if tokio::fs::metadata(file).await.is_err() {
                continue;
            }
            let backup_path = backup_dir.join(format!(
                "{i}_{}",
                file.file_name().and_then(|n| n.to_str()).unwrap_or("file")
            ));
            tokio::fs::copy(file, &backup_path).await?;
            file_backups.push((file.clone(), backup_path));
        }

        let manifest: Vec<serde_json::Value> = file_backups
            .iter()
            .map(|(orig, backup)| {
                serde_json::json!({"original": orig.to_string_lossy(), "backup": backup.to_string_lossy()})
            })
            .collect();
        crate::io_util::atomic_write_json_pretty(
            &backup_dir.join("backup_manifest.json"),
            &serde_json::json!({"tag": tag, "files": manifest}),
        )
        .await?;

        let point = RollbackPoint {
            tag: tag.to_string(),
            backup_dir,
            file_backups,
        };

        let mut points = self.points.lock().await;
        points.push(point.clone());
        if points.len() > MAX_ROLLBACK_POINTS {
            let evicted = points.remove(0);
            let _ = tokio::fs::remove_dir_all(&evicted.backup_dir).await;
        }

        Ok(point)
    }

    /// Restore every file in `point.file_backups` to its backed-up state,
    /// byte-identically (P10).
    pub async fn restore(&self, point: &RollbackPoint) -> Result<(), std::io::Error> {
        for (original, backup) in &point.file_backups {
            tokio::fs::copy(backup, original).await?;
        }
        Ok(())
    }

    pub async fn latest(&self) -> Option<RollbackPoint> {
        self.points.lock().await.last().cloned()
    }
}

pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
