use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64_opt(profile: &str, key: &str) -> Option<f64> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerSettings,
    pub storage: StorageConfig,
    pub cleaning: CleaningDefaults,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ODEX_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ODEX_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerSettings::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            cleaning: CleaningDefaults::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  scheduler:   worker_threads={}", self.scheduler.worker_threads);
        tracing::info!("  storage:     data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  cleaning:    row_missing_threshold={}, column_missing_threshold={}",
            self.cleaning.row_missing_threshold,
            self.cleaning
                .column_missing_threshold
                .map(|t| t.to_string())
                .unwrap_or_else(|| "(disabled)".to_string())
        );
    }

    /// Return a JSON view of the resolved configuration.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": { "worker_threads": self.scheduler.worker_threads },
            "storage": { "data_dir": self.storage.data_dir },
            "cleaning": {
                "row_missing_threshold": self.cleaning.row_missing_threshold,
                "column_missing_threshold": self.cleaning.column_missing_threshold,
            },
        })
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Number of `do_work` bodies allowed to run at once. 0 = available parallelism.
    pub worker_threads: usize,
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            worker_threads: profiled_env_usize(p, "WORKER_THREADS", 0),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }
}

// ── Cleaning ──────────────────────────────────────────────────

/// Default thresholds handed to the missing-values step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningDefaults {
    /// Rows whose missing fraction exceeds this are dropped.
    pub row_missing_threshold: f64,
    /// Columns whose missing fraction exceeds this are dropped. `None` keeps all columns.
    pub column_missing_threshold: Option<f64>,
}

impl CleaningDefaults {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            row_missing_threshold: profiled_env_f64_opt(p, "ROW_MISSING_THRESHOLD").unwrap_or(0.0),
            column_missing_threshold: profiled_env_f64_opt(p, "COLUMN_MISSING_THRESHOLD"),
        }
    }
}
