//! HTTP client implementation for the SPGCI API.

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use url::Url;

use crate::api::{MarketDataService, NaturalGasService, RefineryDataService};
use crate::auth::TokenManager;
use crate::{Error, Result};

use super::config::ClientConfig;
use super::decode::Decode;
use super::paginated::{DataResponse, Paginate, Table};
use super::query::{DataRequest, QueryParams};
use super::response::RawResponse;

/// The main client for interacting with the SPGCI API.
///
/// The client owns one HTTP connection pool and one token cache, both
/// shared by every service handle it hands out. Cloning the client is
/// cheap and shares the same state.
///
/// # Example
///
/// ```no_run
/// use spgci_rs::{ClientConfig, SpgciClient};
/// use spgci_rs::api::SymbolCurrentQuery;
///
/// # async fn example() -> spgci_rs::Result<()> {
/// let client = SpgciClient::new(ClientConfig::new("username", "password"))?;
///
/// let table = client
///     .market_data()
///     .assessments_by_symbol_current(&SymbolCurrentQuery::symbols(["PCAAS00"]))
///     .await?
///     .into_table();
/// # Ok(())
/// # }
/// ```
pub struct SpgciClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) tokens: TokenManager,
    pub(crate) config: ClientConfig,
}

impl SpgciClient {
    /// Create a client from a configuration.
    ///
    /// No network call is made; the first request performs the login.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = config.build_http_client()?;
        let tokens = TokenManager::new(http.clone(), &config);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                tokens,
                config,
            }),
        })
    }

    /// Create a client from `SPGCI_*` environment variables and `.env`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get the market data service.
    pub fn market_data(&self) -> MarketDataService {
        MarketDataService::new(self.inner.clone())
    }

    /// Get the North American natural gas service.
    pub fn natural_gas(&self) -> NaturalGasService {
        NaturalGasService::new(self.inner.clone())
    }

    /// Get the world refinery data service.
    pub fn refinery_data(&self) -> RefineryDataService {
        RefineryDataService::new(self.inner.clone())
    }

    /// Resolve the access token used for data requests.
    ///
    /// Returns the configured token override if set, otherwise the cached
    /// token for the configured credentials, logging in if necessary.
    pub async fn token(&self) -> Result<SecretString> {
        self.inner.resolve_token().await
    }

    /// Drop the cached token for the configured credentials.
    pub async fn invalidate_token(&self) {
        self.inner
            .tokens
            .invalidate(&self.inner.config.credentials, &self.inner.config.base_url)
            .await;
    }

    /// Get the token manager.
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Perform an authenticated GET with retries and return the buffered
    /// response. `path` is relative to the base URL.
    pub async fn execute_get(&self, path: &str, params: &QueryParams) -> Result<RawResponse> {
        let url = self.inner.endpoint_url(path)?;
        self.inner.execute_get(&url, params).await
    }

    /// Fetch `path`, decode its rows and, with `auto_paginate`, every
    /// following page.
    ///
    /// This is the building block for endpoints without a dedicated
    /// service method.
    pub async fn fetch_all<T, D, P>(
        &self,
        path: &str,
        params: QueryParams,
        decoder: &D,
        paginate: &P,
        auto_paginate: bool,
    ) -> Result<Table<T>>
    where
        D: Decode<T> + ?Sized,
        P: Paginate + ?Sized,
    {
        self.inner
            .fetch_all(path, params, decoder, paginate, auto_paginate)
            .await
    }

    /// Serve a [`DataRequest`], honouring its `raw` and `paginate` flags.
    pub async fn get_data<T, D, P>(
        &self,
        request: DataRequest,
        decoder: &D,
        paginate: &P,
    ) -> Result<DataResponse<T>>
    where
        D: Decode<T> + ?Sized,
        P: Paginate + ?Sized,
    {
        self.inner.get_data(request, decoder, paginate).await
    }
}

impl ClientInner {
    /// Absolute URL of an endpoint path.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&url)?)
    }

    pub(crate) async fn resolve_token(&self) -> Result<SecretString> {
        if let Some(ref token) = self.config.token {
            return Ok(token.clone());
        }
        self.tokens
            .get_token(&self.config.credentials, &self.config.base_url)
            .await
    }

    /// Make a GET request, retrying authentication failures and
    /// per-second throttling as configured.
    pub(crate) async fn execute_get(&self, url: &Url, params: &QueryParams) -> Result<RawResponse> {
        let retry = &self.config.retry;
        let mut auth_failures = 0;
        let mut throttled = 0;

        loop {
            match self.send_get(url, params).await {
                Err(Error::Authentication(message)) if auth_failures < retry.auth_retries => {
                    auth_failures += 1;
                    tracing::warn!(%url, %message, attempt = auth_failures, "authentication failed, retrying");
                }
                Err(Error::PerSecondLimit) if retry.may_retry_throttle(throttled) => {
                    throttled += 1;
                    tracing::warn!(
                        %url,
                        attempt = throttled,
                        backoff_ms = retry.throttle_backoff.as_millis() as u64,
                        "per-second rate limit reached, retrying"
                    );
                    tokio::time::sleep(retry.throttle_backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn send_get(&self, url: &Url, params: &QueryParams) -> Result<RawResponse> {
        let token = self.resolve_token().await?;

        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        let url = with_query(url, params);
        tracing::debug!(%url, "GET");

        let mut request = self
            .http
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        if let Some(ref auth) = self.config.transport_auth {
            request = auth.apply(request);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Classify a data response.
    async fn handle_response(&self, response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.tokens
                    .invalidate(&self.config.credentials, &self.config.base_url)
                    .await;
                Err(Error::Authentication(format!(
                    "Invalid username, password or token ({})",
                    status.as_u16()
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(Error::from_rate_limit(response.headers())),
            StatusCode::OK => RawResponse::read(response).await,
            s => {
                let url = response.url().clone();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(%url, status = s.as_u16(), %body, "request failed");
                Err(Error::from_api_response(s.as_u16(), body))
            }
        }
    }
}

/// Append `params` to the URL's own query, escaping spaces as `%20`.
fn with_query(url: &Url, params: &QueryParams) -> Url {
    let mut url = url.clone();
    if params.is_empty() {
        return url;
    }
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, params.encode()),
        _ => params.encode(),
    };
    url.set_query(Some(&query));
    url
}

impl Clone for SpgciClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for SpgciClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpgciClient")
            .field("config", &self.inner.config)
            .finish()
    }
}
