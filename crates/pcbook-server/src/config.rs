//! Server configuration.
//!
//! Resolution order (lowest to highest):
//! 1. Built-in defaults
//! 2. JSON config file (`--config`)
//! 3. Environment variables / CLI flags, applied by the binary

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Role;
use crate::storage::{StoreError, User, UserStore};

/// Default upload ceiling: 1 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 1 << 20;

/// Secret used when none is configured. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to hash password for {username}: {reason}")]
    Seed { username: String, reason: String },

    #[error("Failed to seed users: {0}")]
    Store(#[from] StoreError),
}

/// Closed interval of accepted rating scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10.0,
        }
    }
}

impl ScoreRange {
    /// Finite and within `[min, max]`.
    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && score >= self.min && score <= self.max
    }
}

/// An account created at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl SeedUser {
    fn new(username: &str, password: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// HMAC secret for access tokens.
    pub jwt_secret: String,

    /// Access token lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Directory uploaded images are written to.
    pub image_dir: PathBuf,

    /// Upload ceiling in bytes.
    pub max_image_bytes: usize,

    pub score_range: ScoreRange,

    pub seed_users: Vec<SeedUser>,

    /// PEM certificate chain; TLS is enabled when both cert and key are set.
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    /// PEM CA bundle; when set, clients must present a certificate it signed.
    pub tls_client_ca: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 15 * 60,
            image_dir: PathBuf::from("img"),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            score_range: ScoreRange::default(),
            seed_users: vec![
                SeedUser::new("user1", "123456", Role::Admin),
                SeedUser::new("user2", "123456", Role::User),
            ],
            tls_cert: None,
            tls_key: None,
            tls_client_ca: None,
        }
    }
}

impl ServerConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token_ttl_secs must be positive".into()));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::Invalid("max_image_bytes must be positive".into()));
        }
        let range = self.score_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
            return Err(ConfigError::Invalid(format!(
                "score_range [{}, {}] is not a valid interval",
                range.min, range.max
            )));
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err(ConfigError::Invalid(
                "tls_cert and tls_key must be set together".into(),
            ));
        }
        if self.tls_client_ca.is_some() && self.tls_cert.is_none() {
            return Err(ConfigError::Invalid(
                "tls_client_ca requires tls_cert and tls_key".into(),
            ));
        }
        Ok(())
    }

    pub const fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Create every seed account in `store`.
pub fn seed_users(store: &dyn UserStore, users: &[SeedUser]) -> Result<(), ConfigError> {
    for seed in users {
        let user = User::new(&seed.username, &seed.password, seed.role).map_err(|e| {
            ConfigError::Seed {
                username: seed.username.clone(),
                reason: e.to_string(),
            }
        })?;
        store.save(&user)?;
        info!(username = %seed.username, role = %seed.role, "Seeded user");
    }
    Ok(())
}
