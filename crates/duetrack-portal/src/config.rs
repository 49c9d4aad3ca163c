//! Portal connection settings.

use std::time::Duration;

use url::Url;

/// Configuration for a portal session.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Origin of the portal, e.g. `https://submitty.cs.rpi.edu/`.
    pub base_url: Url,

    /// Path of the login page, relative to `base_url`.
    pub login_path: String,

    /// Path of the course list, relative to `base_url`.
    pub home_path: String,

    /// Only courses whose button label starts with this prefix are scraped.
    pub semester_prefix: String,

    /// Request timeout.
    pub timeout: Duration,

    pub user_agent: String,
}

impl PortalConfig {
    pub const DEFAULT_LOGIN_PATH: &'static str = "authentication/login";

    pub const DEFAULT_HOME_PATH: &'static str = "home";

    pub const DEFAULT_SEMESTER_PREFIX: &'static str = "S19";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the portal at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        // Relative joins replace the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
            home_path: Self::DEFAULT_HOME_PATH.to_string(),
            semester_prefix: Self::DEFAULT_SEMESTER_PREFIX.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("duetrack/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    pub fn with_semester_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.semester_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Absolute URL of the login page.
    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(&self.login_path)
    }

    /// Absolute URL of the course list.
    pub fn home_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(&self.home_path)
    }

    /// Resolves a link found on a portal page.
    pub fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_creation() {
        let config = PortalConfig::new("https://portal.example.edu").unwrap();
        assert_eq!(config.base_url.as_str(), "https://portal.example.edu/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("duetrack/"));
    }

    #[test]
    fn urls_are_joined_under_base_path() {
        let config = PortalConfig::new("https://portal.example.edu/submitty")
            .unwrap()
            .with_home_path("home");
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://portal.example.edu/submitty/authentication/login"
        );
        assert_eq!(
            config.home_url().unwrap().as_str(),
            "https://portal.example.edu/submitty/home"
        );
        assert_eq!(
            config.resolve("/f19/csci1200").unwrap().as_str(),
            "https://portal.example.edu/f19/csci1200"
        );
    }

    #[test]
    fn builder_methods() {
        let config = PortalConfig::new("https://portal.example.edu/")
            .unwrap()
            .with_semester_prefix("F19")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test");
        assert_eq!(config.semester_prefix, "F19");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test");
    }

    #[test]
    fn invalid_url() {
        assert!(PortalConfig::new("not a url").is_err());
    }
}
