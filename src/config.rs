use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Meme API client configuration.
///
/// The base URL is the only required field, so it is a constructor parameter.
/// Everything else has a default and can be overridden with `with_*` methods.
///
/// ```rust,ignore
/// use meme_api_client::ClientConfig;
///
/// let config = ClientConfig::new("https://api.memes.example/v1".parse()?)
///     .with_timeout(Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) refresh_path: String,
    pub(crate) login_path: String,
    pub(crate) register_path: String,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: "/auth/refresh".into(),
            login_path: "/auth/login".into(),
            register_path: "/auth/register".into(),
            timeout: Duration::from_secs(60),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `MEME_API_BASE_URL`: API root (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `MEME_API_TIMEOUT_SECS`: Per-request timeout in seconds
    /// - `MEME_API_USER_AGENT`: `User-Agent` header value
    /// - `MEME_API_REFRESH_PATH`: Override token refresh endpoint path
    /// - `MEME_API_LOGIN_PATH`: Override login endpoint path
    /// - `MEME_API_REGISTER_PATH`: Override registration endpoint path
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or invalid, or the
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url: Url = lookup("MEME_API_BASE_URL")
            .ok_or_else(|| Error::Config("MEME_API_BASE_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("MEME_API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(secs) = lookup("MEME_API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "MEME_API_TIMEOUT_SECS: expected a positive integer, got '{secs}'"
                    ))
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = lookup("MEME_API_USER_AGENT") {
            config = config.with_user_agent(agent);
        }
        if let Some(path) = lookup("MEME_API_REFRESH_PATH") {
            config = config.with_refresh_path(path);
        }
        if let Some(path) = lookup("MEME_API_LOGIN_PATH") {
            config = config.with_login_path(path);
        }
        if let Some(path) = lookup("MEME_API_REGISTER_PATH") {
            config = config.with_register_path(path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_register_path(mut self, path: impl Into<String>) -> Self {
        self.register_path = path.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// API root URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Token refresh endpoint path.
    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    /// Login endpoint path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Registration endpoint path.
    #[must_use]
    pub fn register_path(&self) -> &str {
        &self.register_path
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve `path` against the base URL, keeping any base path prefix
    /// (`https://host/v1` + `/memes` = `https://host/v1/memes`). Any query or
    /// fragment on the base URL is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot carry a path
    /// (`mailto:`, `data:`).
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                Error::Config(format!("base URL '{}' cannot have paths", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }
}
