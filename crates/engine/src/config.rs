use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub bridge: BridgeConfig,
    pub host: HostConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    /// Check every backend response against the registry's return shape.
    pub validate_responses: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            validate_responses: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Steam install candidates. Empty means wherever Steam is installed.
    pub steam_dirs: Vec<PathBuf>,
    pub setup_marker: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DaemonConfig {
    pub socket: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket: std::env::temp_dir().join("launcherctl.sock"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LoggingFormatConfig,
    pub levels: LoggingLevelsConfig,
    pub redaction: RedactionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LoggingFormatConfig {
    pub show_time: bool,
    pub location: LoggingLocationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LoggingLocationConfig {
    pub show_file: bool,
    pub show_line: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingLevelsConfig {
    pub debug: bool,
    pub info: bool,
    pub warning: bool,
    pub error: bool,
}

impl Default for LoggingLevelsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            info: false,
            warning: true,
            error: true,
        }
    }
}

impl LoggingLevelsConfig {
    /// Most verbose enabled level as an `EnvFilter` directive.
    pub fn filter_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.info {
            "info"
        } else if self.warning {
            "warn"
        } else if self.error {
            "error"
        } else {
            "off"
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct RedactionConfig {
    #[serde(default = "true_default")]
    pub enabled: bool,
    #[serde(default)]
    pub patterns: Vec<RedactionPattern>,
}

fn true_default() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedactionPattern {
    pub name: String,
    pub regex: String,
    pub placeholder: String,
}

static CONFIG: RwLock<Option<&'static AppConfig>> = RwLock::new(None);

/// Process-wide configuration, loaded on first use.
pub fn get_config() -> Result<&'static AppConfig, ConfigError> {
    if let Some(cfg) = *CONFIG.read().unwrap_or_else(|e| e.into_inner()) {
        return Ok(cfg);
    }

    let mut write = CONFIG.write().unwrap_or_else(|e| e.into_inner());
    if let Some(cfg) = *write {
        return Ok(cfg);
    }

    let cfg: &'static AppConfig = Box::leak(Box::new(load_config()?));
    *write = Some(cfg);
    Ok(cfg)
}

#[cfg(test)]
pub fn reset_config() {
    let mut write = CONFIG.write().unwrap_or_else(|e| e.into_inner());
    *write = None;
}

/// Directory holding `global_config.yaml`: the working directory when it
/// has one, otherwise this crate's directory.
fn config_dir() -> PathBuf {
    if Path::new("global_config.yaml").exists() {
        PathBuf::from(".")
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_dir())
}

pub fn load_config_from(dir: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        // Defaults
        .add_source(File::from(dir.join("global_config.yaml")).required(false))
        // Production overrides
        .add_source(File::from(dir.join("production_config.yaml")).required(false))
        // Local overrides
        .add_source(File::from(dir.join(".global_config.yaml")).required(false))
        // Nested env vars, e.g. LAUNCHER__BRIDGE__VALIDATE_RESPONSES=false
        .add_source(Environment::with_prefix("LAUNCHER").separator("__"));

    builder.build()?.try_deserialize()
}
