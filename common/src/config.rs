// Configuration management with layered configuration (defaults, file, env)

use crate::locator::{DEFAULT_FALLBACK_PATHS, DEFAULT_SCRATCH_PATH};
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Deployment variables understood for compatibility with existing compose
/// files, mapped onto their configuration keys.
pub const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("CRONICLE_URL", "scheduler.url"),
    ("CRONICLE_API_KEY", "scheduler.api_key"),
    ("CRONICLE_HOST", "scheduler.target_host"),
    ("TZ", "scheduler.timezone"),
    ("DOCKER_EXEC_CONTAINER", "runtime.container"),
    ("DOCKER_BIN", "runtime.binary_path"),
    ("SCRIPTS_DIR", "scripts.scripts_dir"),
    ("OUTPUTS_DIR", "scripts.outputs_dir"),
];

/// Longest allowed session (one year)
pub const MAX_SESSION_HOURS: u64 = 8760;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub runtime: RuntimeConfig,
    pub scripts: ScriptsConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connection and event defaults for the external job scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub url: String,
    /// Empty means "not configured"; event creation is refused in that case
    #[serde(default)]
    pub api_key: String,
    /// Scheduler server/group the events are pinned to
    pub target_host: String,
    pub timezone: String,
    pub category: String,
    /// Inline shell script plugin id
    pub plugin: String,
    pub health_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

/// Where and how scripts are executed on the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub container: String,
    pub binary_path: String,
    #[serde(default = "default_fallback_paths")]
    pub fallback_paths: Vec<String>,
    #[serde(default = "default_scratch_path")]
    pub scratch_path: String,
    pub interpreter: String,
}

fn default_fallback_paths() -> Vec<String> {
    DEFAULT_FALLBACK_PATHS.iter().map(|s| s.to_string()).collect()
}

fn default_scratch_path() -> String {
    DEFAULT_SCRATCH_PATH.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    pub scripts_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_hours: u64,
    #[serde(default)]
    pub users: Vec<AllowedUser>,
}

/// Allow-list entry. Either `password` or `password_hash` (bcrypt) is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedUser {
    pub first: String,
    pub last: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Settings {
    /// Load configuration with layered precedence:
    /// defaults → file → deployment variables → `APP__*` env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        Self::load_with_env(config_dir, |key| std::env::var(key).ok())
    }

    /// Load configuration, reading deployment variables through `lookup`
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = config_dir.as_ref();

        // Deployment variables sit between the files and APP__* variables
        let legacy = legacy_overrides(lookup)
            .into_iter()
            .try_fold(Config::builder(), |builder, (key, value)| {
                builder.set_override(key, value)
            })?
            .build()?;

        let builder = Config::builder()
            // Start with built-in defaults
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(legacy)
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        let url = self.scheduler.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!(
                "Scheduler URL must start with http:// or https://, got '{}'",
                self.scheduler.url
            ));
        }
        if self.scheduler.target_host.trim().is_empty() {
            return Err("Scheduler target_host cannot be empty".to_string());
        }
        if Tz::from_str(&self.scheduler.timezone).is_err() {
            return Err(format!("Invalid timezone: {}", self.scheduler.timezone));
        }
        if self.scheduler.plugin.trim().is_empty() {
            return Err("Scheduler plugin cannot be empty".to_string());
        }
        if self.scheduler.health_timeout_seconds == 0 || self.scheduler.request_timeout_seconds == 0
        {
            return Err("Scheduler timeouts must be greater than 0".to_string());
        }

        if self.runtime.container.trim().is_empty() {
            return Err("Runtime container cannot be empty".to_string());
        }
        if self.runtime.binary_path.trim().is_empty() {
            return Err("Runtime binary_path cannot be empty".to_string());
        }
        if !self.runtime.scratch_path.starts_with('/') {
            return Err("Runtime scratch_path must be an absolute path".to_string());
        }
        if self.runtime.interpreter.trim().is_empty() {
            return Err("Runtime interpreter cannot be empty".to_string());
        }

        if self.scripts.extension.trim().is_empty() {
            return Err("Scripts extension cannot be empty".to_string());
        }

        if self.auth.jwt_secret.is_empty() {
            return Err("JWT secret cannot be empty".to_string());
        }
        if self.auth.session_hours == 0 || self.auth.session_hours > MAX_SESSION_HOURS {
            return Err(format!(
                "Auth session_hours must be between 1 and {}",
                MAX_SESSION_HOURS
            ));
        }
        for user in &self.auth.users {
            if user.password.is_none() && user.password_hash.is_none() {
                return Err(format!(
                    "User '{} {}' needs either password or password_hash",
                    user.first, user.last
                ));
            }
        }

        Ok(())
    }

    /// Whether an API key is available for event creation
    pub fn has_api_key(&self) -> bool {
        !self.scheduler.api_key.trim().is_empty()
    }
}

/// Map the deployment's historic variable names onto configuration keys
pub fn legacy_overrides<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    LEGACY_ENV_KEYS
        .iter()
        .filter_map(|(var, key)| {
            let value = lookup(var)?;
            let value = if *key == "scheduler.url" {
                value.trim_end_matches('/').to_string()
            } else {
                value
            };
            Some((*key, value))
        })
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8501,
            },
            scheduler: SchedulerConfig {
                url: "http://cronicle:3012".to_string(),
                api_key: String::new(),
                target_host: "main".to_string(),
                timezone: "Australia/Perth".to_string(),
                category: "general".to_string(),
                plugin: "shellplug".to_string(),
                health_timeout_seconds: 10,
                request_timeout_seconds: 20,
            },
            runtime: RuntimeConfig {
                container: "pythonhub_portal".to_string(),
                binary_path: "/usr/local/bin/docker".to_string(),
                fallback_paths: default_fallback_paths(),
                scratch_path: default_scratch_path(),
                interpreter: "python".to_string(),
            },
            scripts: ScriptsConfig {
                scripts_dir: PathBuf::from("/scripts"),
                outputs_dir: PathBuf::from("/outputs"),
                extension: "py".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                session_hours: 12,
                users: Vec::new(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}
