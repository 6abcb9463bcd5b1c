//! Shared data model (spec §3). Internal records are plain Rust structs;
//! JSON is only touched at the artifact-write and hub-response-parse
//! boundaries, per the redesign note in spec §9.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate identifier produced by discovery, before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRef {
    /// `<owner>/<name>`.
    pub id: String,
    /// Every strategy tag that produced this id, unioned across sightings.
    pub discovery_method: Vec<String>,
    /// Highest confidence among all sightings.
    pub confidence_score: f64,
    /// Open attribute bag (download count, tags, author, timestamps, ...).
    pub attributes: HashMap<String, serde_json::Value>,
    /// Number of distinct strategies that surfaced this id.
    pub discovery_count: u32,
}

impl ModelRef {
    pub fn new(id: impl Into<String>, method: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            discovery_method: vec![method.into()],
            confidence_score: confidence,
            attributes: HashMap::new(),
            discovery_count: 1,
        }
    }

    pub fn downloads(&self) -> u64 {
        self.attributes
            .get("downloads")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessStatus {
    Fresh,
    Stale,
    VeryStale,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessAnnotation {
    pub last_synced: DateTime<Utc>,
    pub freshness_status: FreshnessStatus,
    pub hours_since_modified: Option<f64>,
    pub hours_since_synced: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Schema,
    DataIntegrity,
    FileAccess,
    Completeness,
    Quality,
    Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// A single validation finding. Transient: never persisted per model,
/// folded into [`ValidationAnnotation`] once validation completes.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub field: String,
    pub message: String,
    pub suggested_fix: Option<String>,
    pub auto_fixable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationAnnotation {
    pub is_valid: bool,
    pub quality_score: f64,
    pub completeness_score: f64,
    pub issues_count: u32,
    pub auto_fixes_applied: u32,
    pub validated_at: DateTime<Utc>,
}

/// The closed quantization label set (spec §4.D), plus `Unknown`.
pub const QUANTIZATION_LABELS: &[&str] = &[
    "Q2_K", "Q3_K_S", "Q3_K_M", "Q3_K_L", "Q4_0", "Q4_1", "Q4_K_S", "Q4_K_M", "Q5_0", "Q5_1",
    "Q5_K_S", "Q5_K_M", "Q6_K", "Q8_0", "Q8_K", "IQ1_S", "IQ1_M", "IQ2_XXS", "IQ2_XS", "IQ2_S",
    "IQ3_XXS", "IQ3_S", "IQ3_M", "IQ4_XS", "F16", "F32",
];

pub const UNKNOWN_QUANTIZATION: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub filename: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub quantization: String,
    pub download_url: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Schema invariants from spec §3: filename ends `.gguf`, url is https.
    pub fn schema_valid(&self) -> bool {
        self.filename.ends_with(".gguf") && self.download_url.starts_with("https://")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
    pub family: String,
    pub architecture: String,
    pub files: Vec<FileRecord>,
    pub downloads: u64,
    pub tags: HashSet<String>,
    pub total_size_bytes: u64,
    pub quantizations: HashSet<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub discovery_method: Vec<String>,
    pub confidence_score: f64,
    pub validation: Option<ValidationAnnotation>,
    pub freshness: Option<FreshnessAnnotation>,
}

impl ModelRecord {
    /// `total_size_bytes == sum(files.size_bytes)` (spec P8).
    pub fn recompute_total_size(&mut self) {
        self.total_size_bytes = self.files.iter().map(|f| f.size_bytes).sum();
    }

    pub fn sort_files_by_size_desc(&mut self) {
        self.files.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    }

    pub fn display_name(&self) -> String {
        derive_display_name(&self.id)
    }
}

/// Last path segment of `id`, `-`/`_` replaced with spaces, title-cased.
pub fn derive_display_name(id: &str) -> String {
    let last = id.rsplit('/').next().unwrap_or(id);
    last.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRanking {
    pub model_id: String,
    pub rank: u32,
    pub download_count: u64,
    pub previous_rank: Option<u32>,
    pub rank_change: i32,
    pub days_in_top: u32,
    pub first_top_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionSource {
    Recent,
    Top,
    Merged,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionReason {
    Recent,
    TopK,
    HighDownloads,
    RecentlyDiscovered,
    ExistingModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionMetadata {
    pub model_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub source: RetentionSource,
    pub download_count: u64,
    pub retention_reason: RetentionReason,
    pub cleanup_eligible: bool,
    pub file_size_bytes: u64,
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Incremental,
    Full,
    Retention,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub last_sync_time: DateTime<Utc>,
    pub sync_mode: SyncMode,
    pub processed: u64,
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
    pub duration_seconds: f64,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResult {
    pub phase_name: String,
    pub success: bool,
    pub duration_seconds: f64,
    pub data_count: u64,
    pub error_message: Option<String>,
    pub metrics: HashMap<String, serde_json::Value>,
}

impl PhaseResult {
    pub fn ok(phase_name: impl Into<String>, duration_seconds: f64, data_count: u64) -> Self {
        Self {
            phase_name: phase_name.into(),
            success: true,
            duration_seconds,
            data_count,
            error_message: None,
            metrics: HashMap::new(),
        }
    }

    pub fn failed(phase_name: impl Into<String>, duration_seconds: f64, error: impl Into<String>) -> Self {
        Self {
            phase_name: phase_name.into(),
            success: false,
            duration_seconds,
            data_count: 0,
            error_message: Some(error.into()),
            metrics: HashMap::new(),
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub phases: Vec<PhaseResult>,
    pub total_models_processed: u64,
    pub top_models_updated: u64,
    pub recent_models_fetched: u64,
    pub models_merged: u64,
    pub duplicates_removed: u64,
    pub models_cleaned_up: u64,
    pub storage_freed_mb: f64,
    pub models_recovered: u64,
    pub api_calls_made: u64,
    pub phases_completed: u32,
    pub phases_failed: u32,
    pub errors_encountered: Vec<String>,
    pub rollback_performed: bool,
    pub rollback_successful: bool,
    pub overall_success: bool,
}

impl UpdateReport {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: None,
            phases: Vec::new(),
            total_models_processed: 0,
            top_models_updated: 0,
            recent_models_fetched: 0,
            models_merged: 0,
            duplicates_removed: 0,
            models_cleaned_up: 0,
            storage_freed_mb: 0.0,
            models_recovered: 0,
            api_calls_made: 0,
            phases_completed: 0,
            phases_failed: 0,
            errors_encountered: Vec::new(),
            rollback_performed: false,
            rollback_successful: false,
            overall_success: false,
        }
    }

    pub fn push_phase(&mut self, phase: PhaseResult) {
        if phase.success {
            self.phases_completed += 1;
        } else {
            self.phases_failed += 1;
            if let Some(ref msg) = phase.error_message {
                self.errors_encountered.push(msg.clone());
            }
        }
        self.phases.push(phase);
    }

    pub fn phase_succeeded(&self, name: &str) -> bool {
        self.phases
            .iter()
            .any(|p| p.phase_name == name && p.success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub context: HashMap<String, serde_json::Value>,
    pub suggested_actions: Vec<String>,
}

/// Stamped onto every artifact the writer emits (spec §4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_models: usize,
    pub schema_version: &'static str,
}

impl GenerationMetadata {
    pub fn new(generated_at: DateTime<Utc>, total_models: usize) -> Self {
        Self {
            generated_at,
            total_models,
            schema_version: "1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_title_cases_and_splits() {
        assert_eq!(derive_display_name("org/my-cool_model"), "My Cool Model");
        assert_eq!(derive_display_name("solo"), "Solo");
    }

    #[test]
    fn file_record_schema_validation() {
        let good = FileRecord {
            filename: "model.Q4_K_M.gguf".into(),
            size_bytes: 10,
            size_human: "10 B".into(),
            quantization: "Q4_K_M".into(),
            download_url: "https://example.com/model.gguf".into(),
            last_modified: None,
        };
        assert!(good.schema_valid());

        let bad = FileRecord {
            download_url: "http://example.com/model.gguf".into(),
            ..good
        };
        assert!(!bad.schema_valid());
    }

    #[test]
    fn recompute_total_size_sums_files() {
        let mut m = ModelRecord {
            id: "a/b".into(),
            name: "B".into(),
            family: "a".into(),
            architecture: "Unknown".into(),
            files: vec![
                FileRecord {
                    filename: "a.gguf".into(),
                    size_bytes: 10,
                    size_human: String::new(),
                    quantization: "F16".into(),
                    download_url: "https://x/a.gguf".into(),
                    last_modified: None,
                },
                FileRecord {
                    filename: "b.gguf".into(),
                    size_bytes: 5,
                    size_human: String::new(),
                    quantization: "F16".into(),
                    download_url: "https://x/b.gguf".into(),
                    last_modified: None,
                },
            ],
            downloads: 0,
            tags: HashSet::new(),
            total_size_bytes: 0,
            quantizations: HashSet::new(),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        };
        m.recompute_total_size();
        assert_eq!(m.total_size_bytes, 15);
    }
}
