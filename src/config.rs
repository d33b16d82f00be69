use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_HEARTBEAT_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Account service endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Register,
    VerifyEmail,
    Login,
    /// Current user and permissions.
    Me,
    Logout,
    ForgotPassword,
    ResetPassword,
    /// Presence update sent by the heartbeat.
    Heartbeat,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::VerifyEmail => "verify-email",
            Self::Login => "login",
            Self::Me => "me",
            Self::Logout => "logout",
            Self::ForgotPassword => "forgot-password",
            Self::ResetPassword => "reset-password",
            Self::Heartbeat => "heartbeat",
        }
    }
}

/// Session client configuration.
///
/// The account service base URL is a constructor parameter; everything else
/// has a default and can be overridden with the `with_*` methods.
///
/// ```rust,ignore
/// use admin_session::SessionConfig;
///
/// let config = SessionConfig::new("https://shop.example.com/api/account".parse()?)
///     .with_heartbeat_interval(std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SessionConfig {
    pub(crate) base_url: Url,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) request_timeout: Duration,
}

impl SessionConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `ACCOUNT_API_URL`: account service base URL
    ///
    /// # Optional env vars
    /// - `ACCOUNT_HEARTBEAT_SECS`: heartbeat period in seconds (default 60)
    /// - `ACCOUNT_REQUEST_TIMEOUT_SECS`: per-request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is missing or malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url: Url = var("ACCOUNT_API_URL")
            .ok_or_else(|| Error::Config("ACCOUNT_API_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("ACCOUNT_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(secs) = var("ACCOUNT_HEARTBEAT_SECS") {
            let secs = parse_secs("ACCOUNT_HEARTBEAT_SECS", &secs)?;
            config = config.with_heartbeat_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = var("ACCOUNT_REQUEST_TIMEOUT_SECS") {
            let secs = parse_secs("ACCOUNT_REQUEST_TIMEOUT_SECS", &secs)?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Absolute URL of an account service endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot be joined (e.g. `data:` URLs).
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, Error> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| Error::Config(format!("{}: {e}", endpoint.path())))
    }
}

// `Url::join` replaces the last segment unless the base ends with '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_secs(name: &str, value: &str) -> Result<u64, Error> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{name} must be greater than zero"))),
        Ok(secs) => Ok(secs),
        Err(e) => Err(Error::Config(format!("{name}: {e}"))),
    }
}
