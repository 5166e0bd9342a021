use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::reconcile::Pacing;

/// Environment prefix shared by every setting (`JOBS_API_URL`, ...).
pub const ENV_PREFIX: &str = "JOBS_";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Base URL of the jobs API (e.g., "https://jobs-api.example.com")
    pub api_url: String,

    /// Shared secret sent as `x-api-key` on privileged operations
    pub api_key: ApiKey,

    /// Canonical listing file. The bundled data set is used when unset.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Directory receiving application snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Timeout for reconciliation, application retrieval and single-shot calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for verification probes
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Pause between individual deletions
    #[serde(default = "default_delete_interval_ms")]
    pub delete_interval_ms: u64,

    /// Pause between listing creates
    #[serde(default = "default_create_interval_ms")]
    pub create_interval_ms: u64,
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_delete_interval_ms() -> u64 {
    500
}

fn default_create_interval_ms() -> u64 {
    300
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Build from explicit key/value pairs (keys carry the `JOBS_` prefix).
    pub fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(pairs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            delete_interval: Duration::from_millis(self.delete_interval_ms),
            create_interval: Duration::from_millis(self.create_interval_ms),
        }
    }
}

/// The shared secret. Never printed in full.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
