//! Configuration for florafind-server
//!
//! Settings are flat and keyed by the variable names used in the deployment
//! manifest (`POSTGRES_SERVER`, `SECRET_KEY`, `PLANTNET_API_KEY`, ...). Sources
//! are layered: built-in defaults, then an optional config file, then the
//! process environment.

use crate::auth::JwtAlgorithm;
use crate::secret::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Main service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Storage backend selector
    #[serde(default)]
    pub storage_backend: StorageBackend,

    pub postgres_server: Option<String>,
    pub postgres_user: Option<String>,
    pub postgres_password: Option<SecretString>,
    pub postgres_db: Option<String>,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// Maximum connections in pool
    #[serde(default = "default_pool_size")]
    pub database_max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub database_connect_timeout_secs: u64,

    /// JWT signing key
    pub secret_key: Option<SecretString>,

    /// JWT signing algorithm name
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_access_expire_minutes")]
    pub access_token_expire_minutes: i64,

    #[serde(default = "default_refresh_expire_days")]
    pub refresh_token_expire_days: i64,

    #[serde(default = "default_reset_expire_minutes")]
    pub password_reset_token_expire_minutes: i64,

    /// Number of previous passwords a user may not reuse
    #[serde(default = "default_password_history_size")]
    pub password_history_size: usize,

    /// Base URL used in links sent by e-mail
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    pub plantnet_api_url: Option<String>,
    pub plantnet_api_key: Option<SecretString>,

    #[serde(default = "default_plantnet_max_images")]
    pub plantnet_max_images: usize,

    /// Per-image size limit in bytes
    #[serde(default = "default_plantnet_max_image_size")]
    pub plantnet_max_image_size: usize,

    #[serde(default = "default_true")]
    pub plantnet_include_related: bool,

    #[serde(default = "default_plantnet_language")]
    pub plantnet_language: String,

    #[serde(default = "default_plantnet_nb_results")]
    pub plantnet_nb_results: u32,

    #[serde(default = "default_plantnet_timeout")]
    pub plantnet_timeout_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

/// Which storage implementation to run against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL, configured through the `POSTGRES_*` variables
    #[default]
    Postgres,
    /// In-memory storage (for development/testing)
    Memory,
}

/// A single configuration problem found by [`Settings::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    /// A required variable is unset or blank
    Missing { var: &'static str, secret: bool },
    /// `ALGORITHM` names an algorithm we cannot sign with
    UnsupportedAlgorithm(String),
    /// A numeric setting is outside its accepted range
    OutOfRange { var: &'static str, reason: String },
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigProblem::Missing { var, secret: true } => {
                write!(f, "missing required secret {}", var)
            }
            ConfigProblem::Missing { var, secret: false } => {
                write!(f, "missing required variable {}", var)
            }
            ConfigProblem::UnsupportedAlgorithm(name) => write!(
                f,
                "ALGORITHM {:?} is not supported (expected HS256, HS384 or HS512)",
                name
            ),
            ConfigProblem::OutOfRange { var, reason } => write!(f, "{} {}", var, reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Configuration loaded but is not usable
    #[error("invalid configuration: {}", format_problems(.0))]
    Invalid(Vec<ConfigProblem>),
}

fn format_problems(problems: &[ConfigProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Storage configuration derived from validated settings
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Memory,
    Postgres {
        /// Connection URL (contains the password)
        url: SecretString,
        max_connections: u32,
        connect_timeout_secs: u64,
    },
}

/// Token and password policy derived from validated settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: SecretString,
    pub algorithm: JwtAlgorithm,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub password_reset_token_expire_minutes: i64,
    pub password_history_size: usize,
    pub frontend_url: String,
    pub sender_email: String,
}

/// PlantNet client configuration derived from validated settings
#[derive(Debug, Clone)]
pub struct PlantNetConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub max_images: usize,
    pub max_image_size: usize,
    pub include_related: bool,
    pub language: String,
    pub nb_results: u32,
    pub timeout_secs: u64,
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

/// Longest accepted token lifetime: ten years
const MAX_TOKEN_TTL_DAYS: i64 = 3650;
const MAX_TOKEN_TTL_MINUTES: i64 = MAX_TOKEN_TTL_DAYS * 24 * 60;

fn default_access_expire_minutes() -> i64 {
    30
}

fn default_refresh_expire_days() -> i64 {
    7
}

fn default_reset_expire_minutes() -> i64 {
    15
}

fn default_password_history_size() -> usize {
    5
}

fn default_frontend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_sender_email() -> String {
    "no-reply@florafind.app".to_string()
}

fn default_plantnet_max_images() -> usize {
    5
}

fn default_plantnet_max_image_size() -> usize {
    50 * 1024 * 1024
}

fn default_plantnet_language() -> String {
    "es".to_string()
}

fn default_plantnet_nb_results() -> u32 {
    5
}

fn default_plantnet_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

fn present_secret(value: &Option<SecretString>) -> bool {
    value.as_ref().map_or(false, |v| !v.is_empty())
}

impl Settings {
    /// Load configuration from an optional file and the process environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with(path, config::Environment::default())
    }

    /// Load configuration from an explicit set of variables instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load_with(None, config::Environment::default().source(Some(vars)))
    }

    fn load_with(path: Option<&str>, env: config::Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(env);

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check every requirement at once so operators see all problems in one run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.storage_backend == StorageBackend::Postgres {
            for (var, value) in [
                ("POSTGRES_SERVER", &self.postgres_server),
                ("POSTGRES_USER", &self.postgres_user),
                ("POSTGRES_DB", &self.postgres_db),
            ] {
                if !present(value) {
                    problems.push(ConfigProblem::Missing { var, secret: false });
                }
            }
            if !present_secret(&self.postgres_password) {
                problems.push(ConfigProblem::Missing {
                    var: "POSTGRES_PASSWORD",
                    secret: true,
                });
            }
            if self.database_max_connections == 0 {
                problems.push(ConfigProblem::OutOfRange {
                    var: "DATABASE_MAX_CONNECTIONS",
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if !present_secret(&self.secret_key) {
            problems.push(ConfigProblem::Missing {
                var: "SECRET_KEY",
                secret: true,
            });
        }
        if self.algorithm.parse::<JwtAlgorithm>().is_err() {
            problems.push(ConfigProblem::UnsupportedAlgorithm(self.algorithm.clone()));
        }

        for (var, value, max) in [
            (
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                self.access_token_expire_minutes,
                MAX_TOKEN_TTL_MINUTES,
            ),
            (
                "REFRESH_TOKEN_EXPIRE_DAYS",
                self.refresh_token_expire_days,
                MAX_TOKEN_TTL_DAYS,
            ),
            (
                "PASSWORD_RESET_TOKEN_EXPIRE_MINUTES",
                self.password_reset_token_expire_minutes,
                MAX_TOKEN_TTL_MINUTES,
            ),
        ] {
            if value <= 0 {
                problems.push(ConfigProblem::OutOfRange {
                    var,
                    reason: "must be positive".to_string(),
                });
            } else if value > max {
                problems.push(ConfigProblem::OutOfRange {
                    var,
                    reason: format!("must be at most {}", max),
                });
            }
        }

        if !present(&self.plantnet_api_url) {
            problems.push(ConfigProblem::Missing {
                var: "PLANTNET_API_URL",
                secret: false,
            });
        }
        if !present_secret(&self.plantnet_api_key) {
            problems.push(ConfigProblem::Missing {
                var: "PLANTNET_API_KEY",
                secret: true,
            });
        }
        if self.plantnet_max_images == 0 {
            problems.push(ConfigProblem::OutOfRange {
                var: "PLANTNET_MAX_IMAGES",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.listen_addr().is_err() {
            problems.push(ConfigProblem::OutOfRange {
                var: "HOST",
                reason: format!("{:?} is not a valid IP address", self.host),
            });
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// `postgresql://{user}:{password}@{server}:{port}/{db}`
    pub fn database_url(&self) -> Option<SecretString> {
        let user = self.postgres_user.as_deref()?;
        let password = self.postgres_password.as_ref()?;
        let server = self.postgres_server.as_deref()?;
        let db = self.postgres_db.as_deref()?;
        Some(SecretString::new(format!(
            "postgresql://{}:{}@{}:{}/{}",
            user,
            password.expose(),
            server,
            self.postgres_port,
            db
        )))
    }

    pub fn storage_config(&self) -> Result<StorageConfig, ConfigError> {
        match self.storage_backend {
            StorageBackend::Memory => Ok(StorageConfig::Memory),
            StorageBackend::Postgres => {
                let url = self.database_url().ok_or_else(|| {
                    ConfigError::Invalid(vec![ConfigProblem::Missing {
                        var: "POSTGRES_PASSWORD",
                        secret: true,
                    }])
                })?;
                Ok(StorageConfig::Postgres {
                    url,
                    max_connections: self.database_max_connections,
                    connect_timeout_secs: self.database_connect_timeout_secs,
                })
            }
        }
    }

    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let secret_key = self
            .secret_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(vec![ConfigProblem::Missing {
                    var: "SECRET_KEY",
                    secret: true,
                }])
            })?;
        let algorithm = self.algorithm.parse::<JwtAlgorithm>().map_err(|_| {
            ConfigError::Invalid(vec![ConfigProblem::UnsupportedAlgorithm(
                self.algorithm.clone(),
            )])
        })?;

        Ok(AuthConfig {
            secret_key,
            algorithm,
            access_token_expire_minutes: self.access_token_expire_minutes,
            refresh_token_expire_days: self.refresh_token_expire_days,
            password_reset_token_expire_minutes: self.password_reset_token_expire_minutes,
            password_history_size: self.password_history_size,
            frontend_url: self.frontend_url.trim_end_matches('/').to_string(),
            sender_email: self.sender_email.clone(),
        })
    }

    pub fn plantnet_config(&self) -> Result<PlantNetConfig, ConfigError> {
        let api_url = self
            .plantnet_api_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(vec![ConfigProblem::Missing {
                    var: "PLANTNET_API_URL",
                    secret: false,
                }])
            })?;
        let api_key = self
            .plantnet_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(vec![ConfigProblem::Missing {
                    var: "PLANTNET_API_KEY",
                    secret: true,
                }])
            })?;

        Ok(PlantNetConfig {
            api_url,
            api_key,
            max_images: self.plantnet_max_images,
            max_image_size: self.plantnet_max_image_size,
            include_related: self.plantnet_include_related,
            language: self.plantnet_language.clone(),
            nb_results: self.plantnet_nb_results,
            timeout_secs: self.plantnet_timeout_secs,
        })
    }
}
