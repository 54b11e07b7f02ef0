use crate::constants;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Comma-separated list of scratch directories.
    #[serde(default = "default_tmpdirs")]
    pub tmpdirs: String,
    #[serde(default = "default_capacity_threshold")]
    pub capacity_threshold: f64,
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Files older than this are swept at startup; 0 disables the sweep.
    #[serde(default = "default_cleanup_max_age_hours")]
    pub max_age_hours: u64,
    #[serde(default = "default_cleanup_prefixes")]
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_tmpdirs() -> String {
    std::env::temp_dir().to_string_lossy().to_string()
}
fn default_capacity_threshold() -> f64 {
    constants::DEFAULT_CAPACITY_THRESHOLD
}
fn default_staleness_secs() -> u64 {
    constants::DEFAULT_STALENESS_SECS
}
fn default_cleanup_max_age_hours() -> u64 {
    constants::DEFAULT_CLEANUP_MAX_AGE_HOURS
}
fn default_cleanup_prefixes() -> Vec<String> {
    vec![constants::DEFAULT_UPLOAD_PREFIX.to_string()]
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            tmpdirs: default_tmpdirs(),
            capacity_threshold: default_capacity_threshold(),
            staleness_secs: default_staleness_secs(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_cleanup_max_age_hours(),
            prefixes: default_cleanup_prefixes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl WorkspaceConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

impl CleanupConfig {
    /// `None` when the startup sweep is disabled.
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_hours > 0)
            .then(|| Duration::from_secs(self.max_age_hours.saturating_mul(3600)))
    }
}

impl Config {
    /// Load configuration with layered precedence:
    /// 1. Environment variables `SCRATCHPOOL_<SECTION>_<KEY>` (highest priority)
    /// 2. Explicit config file (from `--config` flag)
    /// 3. Global config: `~/.scratchpool/config.toml`
    /// 4. Built-in defaults (lowest priority)
    ///
    /// Only fields explicitly set in a higher-priority file override lower layers.
    pub fn load_with_file(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layers(
            global_config_path().as_deref(),
            config_file,
            |key| std::env::var(key).ok(),
        )
    }

    fn load_layers<F>(
        global_file: Option<&Path>,
        config_file: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(global_path) = global_file
            && global_path.exists()
        {
            let raw = load_toml_value(global_path)?;
            merge_toml_values(&mut merged, &raw);
        }

        if let Some(cf) = config_file {
            if !cf.exists() {
                return Err(ConfigError::NotFound {
                    path: cf.display().to_string(),
                });
            }
            let raw = load_toml_value(cf)?;
            merge_toml_values(&mut merged, &raw);
        }

        // Deserialize the merged value into Config (fills remaining fields with defaults)
        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config, env);
        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> Result<(), ConfigError> {
        self.workspace.tmpdirs = self.workspace.tmpdirs.trim().to_string();
        if !self.workspace.capacity_threshold.is_finite() {
            tracing::warn!(
                field = "workspace.capacity_threshold",
                value = self.workspace.capacity_threshold,
                fallback = default_capacity_threshold(),
                "invalid non-finite config value; falling back to default"
            );
            self.workspace.capacity_threshold = default_capacity_threshold();
        }
        if self.workspace.staleness_secs == 0 {
            tracing::warn!(
                field = "workspace.staleness_secs",
                fallback = default_staleness_secs(),
                "config value below minimum; falling back to default"
            );
            self.workspace.staleness_secs = default_staleness_secs();
        }

        let mut prefixes = Vec::with_capacity(self.cleanup.prefixes.len());
        for prefix in &self.cleanup.prefixes {
            let prefix = prefix.trim();
            if prefix.is_empty() {
                continue;
            }
            if prefix.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue {
                    field: "cleanup.prefixes".into(),
                    reason: format!("prefix {prefix:?} contains a path separator"),
                });
            }
            if !prefixes.iter().any(|p: &String| p == prefix) {
                prefixes.push(prefix.to_string());
            }
        }
        self.cleanup.prefixes = prefixes;

        let level = self.logging.level.trim().to_ascii_lowercase();
        self.logging.level = if level.is_empty() {
            default_log_level()
        } else {
            level
        };
        Ok(())
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(constants::DEFAULT_DATA_DIR)
            .join(constants::CONFIG_FILE_NAME)
    })
}

/// Load a TOML file as a raw `toml::Value` (preserving only explicitly-set fields).
fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are written.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

/// Apply environment variable overrides to config fields.
/// Convention: `SCRATCHPOOL_<SECTION>_<KEY>` in UPPER_SNAKE_CASE.
/// Unparseable numeric values are ignored.
fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("SCRATCHPOOL_WORKSPACE_TMPDIRS") {
        config.workspace.tmpdirs = v;
    }
    if let Some(v) = env("SCRATCHPOOL_WORKSPACE_CAPACITY_THRESHOLD")
        && let Ok(n) = v.trim().parse()
    {
        config.workspace.capacity_threshold = n;
    }
    if let Some(v) = env("SCRATCHPOOL_WORKSPACE_STALENESS_SECS")
        && let Ok(n) = v.trim().parse()
    {
        config.workspace.staleness_secs = n;
    }
    if let Some(v) = env("SCRATCHPOOL_CLEANUP_MAX_AGE_HOURS")
        && let Ok(n) = v.trim().parse()
    {
        config.cleanup.max_age_hours = n;
    }
    if let Some(v) = env("SCRATCHPOOL_CLEANUP_PREFIXES") {
        config.cleanup.prefixes = parse_csv_env_list(&v);
    }
    if let Some(v) = env("SCRATCHPOOL_LOGGING_LEVEL") {
        config.logging.level = v;
    }
}

fn parse_csv_env_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}
