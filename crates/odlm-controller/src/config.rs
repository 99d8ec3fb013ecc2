use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Objects applied to the store at start-up
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Controller validations
        if self.controller.workers == 0 {
            return Err("controller.workers must be > 0".into());
        }
        if self.controller.pass_timeout_ms == 0 {
            return Err("controller.pass_timeout_ms must be > 0".into());
        }
        if self.controller.event_buffer == 0 {
            return Err("controller.event_buffer must be > 0".into());
        }
        // Retry validations
        if self.retry.base_delay_ms == 0 {
            return Err("retry.base_delay_ms must be > 0".into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err("retry.base_delay_ms must be <= retry.max_delay_ms".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Number of reconcile workers draining the queue
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Soft deadline for a single reconcile pass
    #[serde(default = "default_pass_timeout_ms")]
    pub pass_timeout_ms: u64,
    /// Whole-pass reruns after a conflicting status write
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Capacity of the watch event bus
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_workers() -> usize {
    4
}
fn default_pass_timeout_ms() -> u64 {
    30_000
}
fn default_conflict_retries() -> u32 {
    3
}
fn default_event_buffer() -> usize {
    1024
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            pass_timeout_ms: default_pass_timeout_ms(),
            conflict_retries: default_conflict_retries(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ControllerSettings {
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_millis(self.pass_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Transient failures tolerated before the config is marked Failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_max_retries() -> u32 {
    10
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    /// Directory of JSON manifests (one object or an array per file)
    #[serde(default)]
    pub manifests_dir: Option<PathBuf>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "odlm.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., ODLM__CONTROLLER__WORKERS=8
        builder = builder.add_source(
            Environment::with_prefix("ODLM")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
