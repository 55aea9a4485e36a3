//! Configuration types for report-poller
//!
//! Configuration is read from a TOML file. Every section except `[http]`'s
//! `reports_url` has a usable default.
//!
//! ```toml
//! [database]
//! host = "db.internal"
//! port = 3306
//! database = "stat"
//! username = "loader"
//! password = "secret"
//!
//! [http]
//! reports_url = "https://api.example.com/v5/reports"
//! timeout = 30
//! try_count = 10
//!
//! [scheduler]
//! max_cycles = 1000
//! scan_interval = 1
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Main configuration for a polling run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Login store connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Report API settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Polling loop settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Filesystem locations (templates, result files, log file)
    #[serde(default)]
    pub paths: PathsConfig,

    /// Which logins to load
    #[serde(default)]
    pub source: SourceConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.http.reports_url.trim().is_empty() {
            return Err(Error::config("reports URL is not set", "http.reports_url"));
        }
        url::Url::parse(&self.http.reports_url).map_err(|e| {
            Error::config(format!("invalid reports URL: {}", e), "http.reports_url")
        })?;
        if self.http.try_count == 0 {
            return Err(Error::config("must be at least 1", "http.try_count"));
        }
        if self.scheduler.max_cycles == 0 {
            return Err(Error::config("must be at least 1", "scheduler.max_cycles"));
        }
        if self.scheduler.max_in_flight == Some(0) {
            return Err(Error::config(
                "must be at least 1 when set",
                "scheduler.max_in_flight",
            ));
        }
        Ok(())
    }
}

/// Login store connection settings
///
/// Either give a full `url` (any scheme the `sqlx` Any driver accepts, e.g.
/// `mysql://` or `sqlite:`) or the individual MySQL connection fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL, takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,

    /// Database host (default: "localhost")
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port (None = driver default)
    #[serde(default)]
    pub port: Option<u16>,

    /// Database (schema) name
    #[serde(default)]
    pub database: String,

    /// User name
    #[serde(default)]
    pub username: String,

    /// Password
    #[serde(default)]
    pub password: String,

    /// Connection pool size (default: 5)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: None,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the login store
    ///
    /// Credentials are percent-encoded, so passwords may contain any character.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let invalid = |e: String| Error::config(e, "database");
        let mut url = url::Url::parse(&format!("mysql://{}", self.host))
            .map_err(|e| invalid(format!("invalid database host: {}", e)))?;
        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| invalid("invalid database username".to_string()))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("invalid database password".to_string()))?;
        }
        if let Some(port) = self.port {
            url.set_port(Some(port))
                .map_err(|_| invalid("invalid database port".to_string()))?;
        }
        url.set_path(&self.database);
        Ok(url.to_string())
    }
}

/// Report API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint receiving report requests
    #[serde(default)]
    pub reports_url: String,

    /// Overall per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Maximum number of attempts per task (default: 10)
    #[serde(default = "default_try_count")]
    pub try_count: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            reports_url: String::new(),
            timeout: default_timeout(),
            try_count: default_try_count(),
        }
    }
}

/// Polling loop settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of scan cycles before the batch is abandoned (default: 1000)
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// Pause between scan cycles (default: 1 second)
    #[serde(default = "default_scan_interval", with = "duration_serde")]
    pub scan_interval: Duration,

    /// Upper bound on concurrently running tasks (None = unbounded)
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            scan_interval: default_scan_interval(),
            max_in_flight: None,
        }
    }
}

/// Filesystem locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory for result files, one subdirectory per login (default: "./input")
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Request header template (default: "./templates/header.json")
    #[serde(default = "default_header_template")]
    pub header_template: PathBuf,

    /// Request body template (default: "./templates/body.json")
    #[serde(default = "default_body_template")]
    pub body_template: PathBuf,

    /// Log file (default: "app.log")
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            header_template: default_header_template(),
            body_template: default_body_template(),
            log_file: default_log_file(),
        }
    }
}

/// Which logins to load from the store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Load only the logins of this integration, sharing its token.
    /// When unset, logins of all active integrations are loaded.
    #[serde(default)]
    pub integration_id: Option<i64>,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_try_count() -> u32 {
    10
}

fn default_max_cycles() -> u32 {
    1000
}

fn default_scan_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./input")
}

fn default_header_template() -> PathBuf {
    PathBuf::from("./templates/header.json")
}

fn default_body_template() -> PathBuf {
    PathBuf::from("./templates/body.json")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("app.log")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
