//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Shared primitives and utilities for the catalog runtime."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Fragments that mark a copied-in sample secret rather than a real one.
const PLACEHOLDER_SECRET_MARKERS: &[&str] = &[
    "change-me",
    "changeme",
    "change_me",
    "replace-me",
    "placeholder",
];

fn default_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default api address")
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_owned()]
}

fn default_database_url() -> String {
    "sqlite://oss-catalog.db".to_owned()
}

fn default_max_connections() -> u32 {
    5
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_hash_memory_kib() -> u32 {
    19_456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_hash_parallelism() -> u32 {
    1
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_admin_username() -> String {
    "admin".to_owned()
}

fn default_password_file() -> PathBuf {
    PathBuf::from("admin.initial.password")
}

/// Primary configuration object for the catalog service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub password_hash: PasswordHashConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no candidate existed and built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "OSSCAT_CONFIG";
    pub const ENV_TOKEN_SECRET: &str = "OSSCAT_TOKEN_SECRET";

    /// Load configuration from disk, respecting the `OSSCAT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Falls back to defaults when none of the candidates exist. The token
    /// secret may be supplied through `OSSCAT_TOKEN_SECRET` in either case.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        let env_secret = std::env::var(Self::ENV_TOKEN_SECRET).ok();

        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path, env_secret)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path, env_secret)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        let mut config = AppConfig::default();
        config.apply_token_secret(env_secret);
        config.validate()?;
        Ok(LoadedAppConfig {
            config,
            source: None,
        })
    }

    fn from_path(path: &Path, env_secret: Option<String>) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let mut config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_token_secret(env_secret);
        config.validate()?;
        Ok(config)
    }

    fn apply_token_secret(&mut self, secret: Option<String>) {
        if let Some(secret) = secret.filter(|s| !s.trim().is_empty()) {
            self.auth.token_secret = secret;
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        if self.database.url.trim().is_empty() {
            return Err(anyhow!("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        if self.bootstrap.admin_username.trim().is_empty() {
            return Err(anyhow!("bootstrap.admin_username must not be empty"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Token signing settings. Loaded once at start and handed to the token service.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_secret: String,
    #[serde(default = "default_token_ttl")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl: default_token_ttl(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(anyhow!(
                "auth.token_secret must be at least {} bytes (set it in the config file or {})",
                MIN_TOKEN_SECRET_LEN,
                AppConfig::ENV_TOKEN_SECRET
            ));
        }
        if is_placeholder_secret(&self.token_secret) {
            return Err(anyhow!(
                "auth.token_secret is a placeholder; generate a random secret and set it in {} or a private config file",
                AppConfig::ENV_TOKEN_SECRET
            ));
        }
        if self.token_ttl.is_zero() {
            return Err(anyhow!("auth.token_ttl must be greater than zero"));
        }
        Ok(())
    }
}

fn is_placeholder_secret(secret: &str) -> bool {
    let lowered = secret.to_ascii_lowercase();
    if PLACEHOLDER_SECRET_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return true;
    }
    let mut bytes = secret.bytes();
    match bytes.next() {
        Some(first) => bytes.all(|b| b == first),
        None => true,
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHashConfig {
    #[serde(default = "default_hash_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_hash_iterations")]
    pub iterations: u32,
    #[serde(default = "default_hash_parallelism")]
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_hash_memory_kib(),
            iterations: default_hash_iterations(),
            parallelism: default_hash_parallelism(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_password_file")]
    pub password_file: PathBuf,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            password_file: default_password_file(),
        }
    }
}
