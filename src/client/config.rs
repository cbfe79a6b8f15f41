//! Client configuration options.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Base URL of the production API.
pub const DEFAULT_BASE_URL: &str = "https://api.platts.com";

/// Default number of pages above which a full fetch logs a size warning.
pub const DEFAULT_LARGE_FETCH_THRESHOLD: u32 = 10;

/// Username and password used to obtain access tokens.
#[derive(Clone)]
pub struct Credentials {
    /// API username
    pub username: String,
    /// API password
    pub password: SecretString,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Returns `true` if both fields are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Transport-level basic auth, sent in addition to the bearer token.
///
/// Some corporate gateways sit in front of the API and expect their own
/// credentials on every request.
#[derive(Clone)]
pub struct TransportAuth {
    /// Gateway username
    pub username: String,
    /// Gateway password, if any
    pub password: Option<SecretString>,
}

impl TransportAuth {
    /// Create basic auth settings.
    pub fn basic(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password: password.map(SecretString::from),
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(
            &self.username,
            self.password.as_ref().map(|p| p.expose_secret().to_string()),
        )
    }
}

impl fmt::Debug for TransportAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Proxy servers for plain and TLS traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proxies {
    /// Proxy for `http://` URLs
    pub http: Option<String>,
    /// Proxy for `https://` URLs
    pub https: Option<String>,
}

impl Proxies {
    /// Returns `true` if no proxy is configured.
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

/// Configuration for the SPGCI client.
///
/// Built once at startup and handed to [`SpgciClient::new`](crate::SpgciClient::new);
/// every request reads it, nothing mutates it afterwards.
///
/// # Example
///
/// ```
/// use spgci_rs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("username", "password")
///     .with_request_delay(Duration::from_millis(250))
///     .with_verify_ssl(false);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Credentials exchanged for access tokens
    pub credentials: Credentials,
    /// Base URL of the API, without a trailing slash
    pub base_url: String,
    /// Whether TLS certificates are verified
    pub verify_ssl: bool,
    /// Proxy servers
    pub proxies: Proxies,
    /// Optional transport-level basic auth
    pub transport_auth: Option<TransportAuth>,
    /// Fixed delay slept before every data request
    pub request_delay: Duration,
    /// User-Agent header value identifying this client
    pub user_agent: String,
    /// Pre-issued access token; skips the token exchange when set
    pub token: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Page count above which a full fetch logs a size warning
    pub large_fetch_threshold: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::new("", ""),
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_ssl: true,
            proxies: Proxies::default(),
            transport_auth: None,
            request_delay: Duration::ZERO,
            user_agent: format!("spgci-rs/{}", env!("CARGO_PKG_VERSION")),
            token: None,
            timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            large_fetch_threshold: DEFAULT_LARGE_FETCH_THRESHOLD,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            ..Default::default()
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Reads `SPGCI_USERNAME`, `SPGCI_PASSWORD`, `SPGCI_BASE_URL`,
    /// `HTTP_PROXY` and `HTTPS_PROXY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the username or password is missing.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = non_empty_var("SPGCI_USERNAME")
            .ok_or_else(|| Error::Config("SPGCI_USERNAME is not set".to_string()))?;
        let password = non_empty_var("SPGCI_PASSWORD")
            .ok_or_else(|| Error::Config("SPGCI_PASSWORD is not set".to_string()))?;

        let mut config = Self::new(username, password).with_proxies(Proxies {
            http: non_empty_var("HTTP_PROXY"),
            https: non_empty_var("HTTPS_PROXY"),
        });

        if let Some(base_url) = non_empty_var("SPGCI_BASE_URL") {
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the base URL. A trailing slash is removed.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the proxy servers.
    pub fn with_proxies(mut self, proxies: Proxies) -> Self {
        self.proxies = proxies;
        self
    }

    /// Set transport-level basic auth.
    pub fn with_transport_auth(mut self, auth: TransportAuth) -> Self {
        self.transport_auth = Some(auth);
        self
    }

    /// Set the fixed delay slept before every data request.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a pre-issued access token instead of exchanging credentials.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the page count above which a full fetch logs a size warning.
    pub fn with_large_fetch_threshold(mut self, pages: u32) -> Self {
        self.large_fetch_threshold = pages;
        self
    }

    /// Build the shared HTTP client described by this configuration.
    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .danger_accept_invalid_certs(!self.verify_ssl);

        if let Some(ref proxy) = self.proxies.http {
            builder = builder.proxy(reqwest::Proxy::http(proxy)?);
        }
        if let Some(ref proxy) = self.proxies.https {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }

        Ok(builder.build()?)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration for automatic retries.
///
/// Authentication failures are retried a bounded number of times to cover
/// a token that expired between acquisition and use. Per-second throttling
/// is retried with a fixed backoff, by default without limit. Daily quota
/// exhaustion is never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after an authentication failure
    pub auth_retries: u32,
    /// Fixed wait before retrying a throttled request
    pub throttle_backoff: Duration,
    /// Cap on throttle retries for data requests; `None` retries forever
    pub max_throttle_retries: Option<u32>,
    /// Throttle retries when exchanging credentials for a token
    pub token_throttle_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            auth_retries: 1,
            throttle_backoff: Duration::from_secs(1),
            max_throttle_retries: None,
            token_throttle_retries: 1,
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            auth_retries: 0,
            max_throttle_retries: Some(0),
            token_throttle_retries: 0,
            ..Default::default()
        }
    }

    /// Set the number of retries after an authentication failure.
    pub fn with_auth_retries(mut self, retries: u32) -> Self {
        self.auth_retries = retries;
        self
    }

    /// Set the fixed throttle backoff.
    pub fn with_throttle_backoff(mut self, duration: Duration) -> Self {
        self.throttle_backoff = duration;
        self
    }

    /// Cap the number of throttle retries for data requests.
    pub fn with_max_throttle_retries(mut self, max: u32) -> Self {
        self.max_throttle_retries = Some(max);
        self
    }

    /// Set the throttle retries used during the token exchange.
    pub fn with_token_throttle_retries(mut self, retries: u32) -> Self {
        self.token_throttle_retries = retries;
        self
    }

    /// Check whether another throttle retry is allowed after `attempts` retries.
    pub fn may_retry_throttle(&self, attempts: u32) -> bool {
        self.max_throttle_retries.map_or(true, |max| attempts < max)
    }
}
