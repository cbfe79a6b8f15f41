//! Access token acquisition and caching.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::client::{ClientConfig, Credentials, TransportAuth};
use crate::{Error, Result};

/// Path of the credential exchange endpoint, relative to the base URL.
pub const AUTH_PATH: &str = "auth/api";

/// Obtains access tokens from the login endpoint and caches them.
///
/// A token is cached under the exact `(username, password, base_url)`
/// triple used to obtain it. Looking up the same triple again returns the
/// cached token without a network call. The cache holds a single entry:
/// fetching a token for a different triple replaces it.
///
/// Tokens carry no client-side expiry. When the server rejects one, the
/// request executor calls [`invalidate`](Self::invalidate) and the next
/// lookup performs a fresh exchange.
///
/// Exchanges are serialized: concurrent first lookups on clones of one
/// client share a single login.
pub struct TokenManager {
    http: reqwest::Client,
    user_agent: String,
    transport_auth: Option<TransportAuth>,
    throttle_backoff: Duration,
    throttle_retries: u32,
    cache: RwLock<Option<CachedToken>>,
    exchange_lock: Mutex<()>,
}

struct CachedToken {
    key: CacheKey,
    token: SecretString,
}

struct CacheKey {
    username: String,
    password: SecretString,
    base_url: String,
}

impl CacheKey {
    fn new(credentials: &Credentials, base_url: &str) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            base_url: base_url.to_string(),
        }
    }

    fn matches(&self, credentials: &Credentials, base_url: &str) -> bool {
        self.username == credentials.username
            && self.base_url == base_url
            && self.password.expose_secret() == credentials.password.expose_secret()
    }
}

impl TokenManager {
    /// Create a token manager sharing the client's HTTP connection pool.
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            user_agent: config.user_agent.clone(),
            transport_auth: config.transport_auth.clone(),
            throttle_backoff: config.retry.throttle_backoff,
            throttle_retries: config.retry.token_throttle_retries,
            cache: RwLock::new(None),
            exchange_lock: Mutex::new(()),
        }
    }

    /// Get an access token for the credential triple.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if the credentials are rejected
    /// - [`Error::PerSecondLimit`] if still throttled after the retry
    /// - [`Error::DailyLimit`] if the daily quota is exhausted
    /// - [`Error::Http`] for transport failures
    pub async fn get_token(
        &self,
        credentials: &Credentials,
        base_url: &str,
    ) -> Result<SecretString> {
        if let Some(token) = self.cached(credentials, base_url).await {
            return Ok(token);
        }

        let _exchange = self.exchange_lock.lock().await;
        if let Some(token) = self.cached(credentials, base_url).await {
            return Ok(token);
        }

        let mut throttled = 0;
        let token = loop {
            match self.exchange(credentials, base_url).await {
                Err(Error::PerSecondLimit) if throttled < self.throttle_retries => {
                    throttled += 1;
                    tracing::warn!(
                        backoff_ms = self.throttle_backoff.as_millis() as u64,
                        "token request throttled, retrying"
                    );
                    tokio::time::sleep(self.throttle_backoff).await;
                }
                other => break other?,
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(CachedToken {
            key: CacheKey::new(credentials, base_url),
            token: token.clone(),
        });

        Ok(token)
    }

    /// Drop the cached token if it belongs to this credential triple.
    pub async fn invalidate(&self, credentials: &Credentials, base_url: &str) {
        let mut cache = self.cache.write().await;
        if cache
            .as_ref()
            .is_some_and(|c| c.key.matches(credentials, base_url))
        {
            tracing::debug!(username = %credentials.username, "evicting cached access token");
            *cache = None;
        }
    }

    /// Drop any cached token.
    pub async fn clear(&self) {
        *self.cache.write().await = None;
    }

    /// Returns `true` if a token is cached for this credential triple.
    pub async fn is_cached(&self, credentials: &Credentials, base_url: &str) -> bool {
        self.cached(credentials, base_url).await.is_some()
    }

    async fn cached(&self, credentials: &Credentials, base_url: &str) -> Option<SecretString> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.key.matches(credentials, base_url))
            .map(|c| c.token.clone())
    }

    async fn exchange(&self, credentials: &Credentials, base_url: &str) -> Result<SecretString> {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), AUTH_PATH);
        tracing::debug!(%url, username = %credentials.username, "requesting access token");

        let mut request = self
            .http
            .post(&url)
            .header(USER_AGENT, &self.user_agent)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret()),
            ]);
        if let Some(ref auth) = self.transport_auth {
            request = auth.apply(request);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                if is_certificate_error(&err) {
                    tracing::warn!(
                        "TLS certificate verification failed. You can likely avoid this issue \
                         with `ClientConfig::with_verify_ssl(false)`"
                    );
                }
                return Err(err.into());
            }
        };

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Authentication(format!(
                    "Invalid username or password ({}): {}",
                    status.as_u16(),
                    body
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Error::from_rate_limit(response.headers())),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::from_api_response(s.as_u16(), body))
            }
            _ => {
                let token_response: TokenResponse = response.json().await?;
                Ok(SecretString::from(token_response.access_token))
            }
        }
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("user_agent", &self.user_agent)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Walk the error chain looking for a certificate verification failure.
fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(cause) = source {
        let msg = cause.to_string().to_ascii_lowercase();
        if msg.contains("certificate") || msg.contains("verify") {
            return true;
        }
        source = cause.source();
    }
    false
}
