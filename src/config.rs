//! Configuration layer. CLI flag parsing is out of scope (spec §1); this
//! module only defines the recognized options (spec §6) and how they are
//! sourced: environment variables first (teacher pattern, `Config::from_env`),
//! optionally layered with an on-disk TOML file via `Config::load`.

use std::env;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    Full,
    Retention,
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hub_base_url: String,
    pub hub_token: Option<String>,
    pub data_dir: String,

    pub retention_mode: RetentionMode,
    pub retention_days: u32,
    pub top_models_count: u32,
    pub preserve_download_threshold: u64,

    pub cleanup_enabled: bool,
    pub cleanup_batch_size: u32,

    pub enable_backups: bool,
    pub backup_retention_days: u32,

    pub force_full_sync: bool,
    pub incremental_window_hours: u32,
    pub full_sync_threshold_hours: u32,
    pub significant_change_threshold: f64,

    pub max_concurrency: usize,
    pub requests_per_second: f64,
    pub max_retries: u32,
    pub timeout_seconds: u64,

    pub min_completeness_score: f64,
    pub warning_threshold: f64,
    pub excellent_threshold: f64,

    pub enable_file_verification: bool,
    pub enable_automatic_fixes: bool,

    pub preserve_data_on_failure: bool,

    pub dry_run: bool,
    pub wall_clock_budget_hours: f64,

    pub recent_models_priority: bool,
    pub ranking_history_enabled: bool,
    pub ranking_history_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub_base_url: "https://huggingface.co".to_string(),
            hub_token: None,
            data_dir: "data".to_string(),

            retention_mode: RetentionMode::Auto,
            retention_days: 30,
            top_models_count: 20,
            preserve_download_threshold: 1000,

            cleanup_enabled: true,
            cleanup_batch_size: 100,

            enable_backups: true,
            backup_retention_days: 10,

            force_full_sync: false,
            incremental_window_hours: 48,
            full_sync_threshold_hours: 168,
            significant_change_threshold: 0.1,

            max_concurrency: 50,
            requests_per_second: 0.0,
            max_retries: 5,
            timeout_seconds: 30,

            min_completeness_score: 90.0,
            warning_threshold: 95.0,
            excellent_threshold: 98.0,

            enable_file_verification: true,
            enable_automatic_fixes: true,

            preserve_data_on_failure: true,

            dry_run: false,
            wall_clock_budget_hours: 6.0,

            recent_models_priority: true,
            ranking_history_enabled: true,
            ranking_history_days: 90,
        }
    }
}

impl Config {
    /// Hub hourly request budget (spec §4.A): 5000 authenticated, 1000 anonymous.
    pub fn hourly_limit(&self) -> u32 {
        if self.hub_token.is_some() { 5000 } else { 1000 }
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(v) = env::var("GGUF_SYNC_HUB_BASE_URL") {
            config.hub_base_url = v;
        }
        config.hub_token = env::var("HF_TOKEN").ok().or_else(|| env::var("GGUF_SYNC_HUB_TOKEN").ok());
        if let Ok(v) = env::var("GGUF_SYNC_DATA_DIR") {
            config.data_dir = v;
        }
        if let Ok(v) = env::var("GGUF_SYNC_RETENTION_MODE") {
            config.retention_mode = match v.as_str() {
                "full" => RetentionMode::Full,
                "retention" => RetentionMode::Retention,
                _ => RetentionMode::Auto,
            };
        }
        if let Some(v) = env_parse::<u32>("GGUF_SYNC_RETENTION_DAYS") {
            config.retention_days = v.clamp(1, 365);
        }
        if let Some(v) = env_parse::<u32>("GGUF_SYNC_TOP_MODELS_COUNT") {
            config.top_models_count = v.clamp(1, 1000);
        }
        if let Some(v) = env_parse::<u64>("GGUF_SYNC_PRESERVE_DOWNLOAD_THRESHOLD") {
            config.preserve_download_threshold = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_CLEANUP_ENABLED") {
            config.cleanup_enabled = v;
        }
        if let Some(v) = env_parse::<u32>("GGUF_SYNC_CLEANUP_BATCH_SIZE") {
            config.cleanup_batch_size = v.max(1);
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_ENABLE_BACKUPS") {
            config.enable_backups = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_FORCE_FULL_SYNC") {
            config.force_full_sync = v;
        }
        if let Some(v) = env_parse::<usize>("GGUF_SYNC_MAX_CONCURRENCY") {
            config.max_concurrency = v.max(1);
        }
        if let Some(v) = env_parse::<u32>("GGUF_SYNC_MAX_RETRIES") {
            config.max_retries = v;
        }
        if let Some(v) = env_parse::<u64>("GGUF_SYNC_TIMEOUT_SECONDS") {
            config.timeout_seconds = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_ENABLE_FILE_VERIFICATION") {
            config.enable_file_verification = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_ENABLE_AUTOMATIC_FIXES") {
            config.enable_automatic_fixes = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_PRESERVE_DATA_ON_FAILURE") {
            config.preserve_data_on_failure = v;
        }
        if let Some(v) = env_parse::<bool>("GGUF_SYNC_DRY_RUN") {
            config.dry_run = v;
        }

        config
    }

    /// Layer a TOML config file on top of `self` (file values win), mirroring
    /// the teacher's env-first approach extended with an optional file layer
    /// for this system's much larger set of tunables.
    pub fn load(&self, path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let file_config: PartialConfig = toml::from_str(&text)?;
        Ok(file_config.merge_onto(self.clone()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Mirrors [`Config`] with every field optional, so a TOML file only needs
/// to specify the options it wants to override.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
struct PartialConfig {
    hub_base_url: Option<String>,
    hub_token: Option<String>,
    data_dir: Option<String>,
    retention_mode: Option<RetentionMode>,
    retention_days: Option<u32>,
    top_models_count: Option<u32>,
    preserve_download_threshold: Option<u64>,
    cleanup_enabled: Option<bool>,
    cleanup_batch_size: Option<u32>,
    enable_backups: Option<bool>,
    backup_retention_days: Option<u32>,
    force_full_sync: Option<bool>,
    incremental_window_hours: Option<u32>,
    full_sync_threshold_hours: Option<u32>,
    significant_change_threshold: Option<f64>,
    max_concurrency: Option<usize>,
    requests_per_second: Option<f64>,
    max_retries: Option<u32>,
    timeout_seconds: Option<u64>,
    min_completeness_score: Option<f64>,
    warning_threshold: Option<f64>,
    excellent_threshold: Option<f64>,
    enable_file_verification: Option<bool>,
    enable_automatic_fixes: Option<bool>,
    preserve_data_on_failure: Option<bool>,
    dry_run: Option<bool>,
    wall_clock_budget_hours: Option<f64>,
    recent_models_priority: Option<bool>,
    ranking_history_enabled: Option<bool>,
    ranking_history_days: Option<u32>,
}

impl PartialConfig {
    fn merge_onto(self, mut base: Config) -> Config {
        macro_rules! merge {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    base.$field = v;
                }
            };
        }
        merge!(hub_base_url);
        if self.hub_token.is_some() {
            base.hub_token = self.hub_token;
        }
        merge!(data_dir);
        merge!(retention_mode);
        merge!(retention_days);
        merge!(top_models_count);
        merge!(preserve_download_threshold);
        merge!(cleanup_enabled);
        merge!(cleanup_batch_size);
        merge!(enable_backups);
        merge!(backup_retention_days);
        merge!(force_full_sync);
        merge!(incremental_window_hours);
        merge!(full_sync_threshold_hours);
        merge!(significant_change_threshold);
        merge!(max_concurrency);
        merge!(requests_per_second);
        merge!(max_retries);
        merge!(timeout_seconds);
        merge!(min_completeness_score);
        merge!(warning_threshold);
        merge!(excellent_threshold);
        merge!(enable_file_verification);
        merge!(enable_automatic_fixes);
        merge!(preserve_data_on_failure);
        merge!(dry_run);
        merge!(wall_clock_budget_hours);
        merge!(recent_models_priority);
        merge!(ranking_history_enabled);
        merge!(ranking_history_days);
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_limit_depends_on_token() {
        let mut c = Config::default();
        assert_eq!(c.hourly_limit(), 1000);
        c.hub_token = Some("tok".into());
        assert_eq!(c.hourly_limit(), 5000);
    }

    #[test]
    fn load_layers_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "retention_days = 7\ntop_models_count = 5\n").unwrap();

        let base = Config::default();
        let merged = base.load(&path).unwrap();
        assert_eq!(merged.retention_days, 7);
        assert_eq!(merged.top_models_count, 5);
        assert_eq!(merged.max_concurrency, base.max_concurrency);
    }
}
