//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/duetrack/config.toml` by default.
//!
//! `portal.user_id` and `portal.password` support secret references
//! (`pass::...`, `env::...`), see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use duetrack_core::FormatOptions;
use duetrack_portal::{Credentials, PortalConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Name of the default deadline file in the data directory.
pub const DEFAULT_DATA_FILE: &str = "deadlines.json";

/// Shown in place of a plain-text password.
pub const REDACTED: &str = "<redacted>";

/// Configuration for the duetrack client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Courses hidden from listings. They are still fetched and stored.
    pub ignored_courses: Vec<String>,

    pub portal: PortalSettings,

    pub storage: StorageSettings,

    pub display: DisplaySettings,
}

/// Portal connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    /// Portal origin, e.g. `https://submitty.cs.rpi.edu/`.
    pub base_url: Option<String>,

    /// Supports `pass::` and `env::` prefixes.
    pub user_id: Option<String>,

    /// Supports `pass::` and `env::` prefixes.
    pub password: Option<String>,

    /// Course button prefix of the semester to scrape (e.g. `F19`).
    pub semester_prefix: Option<String>,

    pub login_path: Option<String>,

    pub home_path: Option<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            user_id: None,
            password: None,
            semester_prefix: None,
            login_path: None,
            home_path: None,
            timeout: PortalConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PortalSettings {
    /// Builds the portal configuration.
    pub fn to_portal_config(&self) -> Result<PortalConfig, String> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            format!(
                "portal URL not configured. Add to {}:\n  \
                 [portal]\n  \
                 base_url = \"https://submitty.example.edu/\"",
                ClientConfig::default_path().display()
            )
        })?;

        let mut config = PortalConfig::new(base_url)
            .map_err(|e| format!("invalid portal base_url `{base_url}`: {e}"))?
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(ref prefix) = self.semester_prefix {
            config = config.with_semester_prefix(prefix);
        }
        if let Some(ref path) = self.login_path {
            config = config.with_login_path(path);
        }
        if let Some(ref path) = self.home_path {
            config = config.with_home_path(path);
        }
        Ok(config)
    }

    /// Resolves the login credentials.
    ///
    /// Command-line values win over the configured ones. Each value goes
    /// through [`secret::resolve`].
    pub fn resolve_credentials(
        &self,
        user_id: Option<&str>,
        password: Option<&str>,
    ) -> ClientResult<Credentials> {
        let raw_user = user_id.or(self.user_id.as_deref()).ok_or_else(|| {
            ClientError::Config(
                "portal user_id is not set (use --user-id or [portal] user_id)".to_string(),
            )
        })?;
        let raw_password = password.or(self.password.as_deref()).ok_or_else(|| {
            ClientError::Config(
                "portal password is not set (use --password, DUETRACK_PASSWORD or [portal] password)"
                    .to_string(),
            )
        })?;

        let user = resolve_setting("user_id", raw_user)?;
        let password = resolve_setting("password", raw_password)?;
        Ok(Credentials::new(user, password))
    }
}

/// Resolves one setting, naming it in the error.
pub fn resolve_setting(field: &'static str, value: &str) -> ClientResult<String> {
    secret::resolve(value).map_err(|source| ClientError::Secret { field, source })
}

/// Where deadlines are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Deadline file (`.json` or `.csv`).
    pub data_file: Option<PathBuf>,
}

impl StorageSettings {
    /// The configured data file, or `deadlines.json` in the data directory.
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join(DEFAULT_DATA_FILE))
    }
}

/// Display settings for output formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Maximum assignment name length (truncated with ellipsis).
    pub max_title_length: Option<usize>,

    /// Wrap names in terminal hyperlinks.
    pub hyperlinks: bool,

    /// Show the submission status after each deadline.
    pub show_status: bool,

    /// Deadlines closer than this are highlighted.
    pub soon_threshold_hours: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let defaults = FormatOptions::default();
        Self {
            max_title_length: defaults.max_title_length,
            hyperlinks: defaults.hyperlinks,
            show_status: defaults.show_status,
            soon_threshold_hours: defaults.soon_threshold_hours,
        }
    }
}

impl DisplaySettings {
    /// Converts to formatter options, `max_title_length` overriding the file.
    pub fn to_format_options(&self, max_title_length: Option<usize>) -> FormatOptions {
        FormatOptions {
            max_title_length: max_title_length.or(self.max_title_length),
            soon_threshold_hours: self.soon_threshold_hours,
            hyperlinks: self.hyperlinks,
            show_status: self.show_status,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {e}"))
    }

    /// A copy safe to print: a plain-text password is replaced by
    /// [`REDACTED`]. Secret references are kept since they hold no secret.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(password) = config
            .portal
            .password
            .as_mut()
            .filter(|password| !secret::is_reference(password))
        {
            *password = REDACTED.to_string();
        }
        config
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duetrack")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duetrack")
    }
}
