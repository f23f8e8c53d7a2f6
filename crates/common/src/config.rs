//! Suite configuration
//!
//! Built once at start-up (file, then `SIGNAGE_*` environment overrides)
//! and handed by reference to every component that needs it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Device under test, as listed in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    pub name: String,
    pub id: i64,
}

/// Credentials of the account the suite logs in with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUser {
    pub email: String,
    pub password: String,
}

/// Suite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// URL scheme of the API (`https` in production)
    pub scheme: String,

    /// Platform host name; the API lives under `api.<server_name>`
    pub server_name: String,

    /// API version number, rendered as `/v<api_version>`
    pub api_version: String,

    pub user_email: String,
    pub user_password: String,

    /// Platform the devices and campaigns belong to
    pub platform_id: i64,

    /// Sleep between polling attempts
    pub polling_interval_secs: u64,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    /// Scratch directory for downloaded artifacts
    pub tmp_path: PathBuf,

    /// Devices every scenario is run against
    pub devices: Vec<DeviceTarget>,

    /// Named campaigns used by content scenarios
    pub campaigns: BTreeMap<String, i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            server_name: String::new(),
            api_version: "1".to_string(),
            user_email: String::new(),
            user_password: String::new(),
            platform_id: 0,
            devices: Vec::new(),
            campaigns: BTreeMap::new(),
            polling_interval_secs: 2,
            timeout_secs: 30,
            tmp_path: PathBuf::from("tmp"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: Self = toml::from_str(&content)?;
            debug!("Loaded settings from {}", path.display());
            Ok(settings)
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override scalar settings from `SIGNAGE_*` environment variables
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SIGNAGE_SCHEME") {
            self.scheme = v;
        }
        if let Some(v) = lookup("SIGNAGE_SERVER_NAME") {
            self.server_name = v;
        }
        if let Some(v) = lookup("SIGNAGE_API_VERSION") {
            self.api_version = v;
        }
        if let Some(v) = lookup("SIGNAGE_USER_EMAIL") {
            self.user_email = v;
        }
        if let Some(v) = lookup("SIGNAGE_USER_PASSWORD") {
            self.user_password = v;
        }
        if let Some(v) = lookup("SIGNAGE_PLATFORM_ID") {
            self.platform_id = parse_var("SIGNAGE_PLATFORM_ID", &v)?;
        }
        if let Some(v) = lookup("SIGNAGE_POLLING_INTERVAL") {
            self.polling_interval_secs = parse_var("SIGNAGE_POLLING_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("SIGNAGE_TMP_PATH") {
            self.tmp_path = PathBuf::from(v);
        }
        Ok(self)
    }

    /// Reject settings no scenario can run with
    pub fn validate(&self) -> Result<()> {
        if self.server_name.is_empty() {
            return Err(Error::InvalidConfig("server_name is empty".to_string()));
        }
        if self.polling_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "polling_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the server's API
    pub fn api_url(&self) -> String {
        format!("{}://api.{}/v{}", self.scheme, self.server_name, self.api_version)
    }

    pub fn user(&self) -> TestUser {
        TestUser {
            email: self.user_email.clone(),
            password: self.user_password.clone(),
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve a campaign ID by its configured name
    pub fn campaign_id(&self, name: &str) -> Result<i64> {
        self.campaigns
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidConfig(format!("unknown campaign: {}", name)))
    }

    /// Path inside the scratch directory
    pub fn tmp_file(&self, name: &str) -> PathBuf {
        self.tmp_path.join(name)
    }

    /// Create the scratch directory if it does not exist yet
    pub fn ensure_tmp_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.tmp_path)?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}
