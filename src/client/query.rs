//! Query parameters and caller-facing request options.

use std::fmt::Display;

/// Ordered query string parameters.
///
/// Setting a key that already exists replaces its value in place, so the
/// pagination loop can overwrite the page parameter without reordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style [`set_opt`](Self::set_opt).
    pub fn with_opt<V: Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.set_opt(key, value);
        self
    }

    /// Set a parameter, replacing any existing value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Set a parameter only when a value is present.
    pub fn set_opt<V: Display>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Get the value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as a query string, escaping spaces as `%20` rather than `+`.
    ///
    /// OData endpoints reject `+` in the query string.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// A data request as seen by a dataset method.
///
/// Carries the endpoint path relative to the base URL, the query
/// parameters, and the two output knobs every dataset method accepts:
/// `paginate` (fetch every page) and `raw` (skip decoding and return the
/// first page's transport response).
///
/// # Example
///
/// ```
/// use spgci_rs::DataRequest;
///
/// let request = DataRequest::new("market-data/v3/value/current/symbol")
///     .filter(Some("symbol: \"PCAAS00\"".to_string()))
///     .page(1)
///     .page_size(1000)
///     .paginate(true);
///
/// assert_eq!(request.params().get("pageSize"), Some("1000"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataRequest {
    path: String,
    params: QueryParams,
    paginate: bool,
    raw: bool,
}

impl DataRequest {
    /// Create a request for an endpoint path relative to the base URL.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.params.set(key, value);
        self
    }

    /// Add a query parameter if a value is present.
    pub fn param_opt<V: Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.set_opt(key, value);
        self
    }

    /// Replace all query parameters.
    pub fn params_from(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Set the server-side filter expression; empty expressions are not sent.
    pub fn filter(self, expr: Option<String>) -> Self {
        let expr = expr.filter(|e| !e.trim().is_empty());
        self.param_opt("filter", expr)
    }

    /// Request a particular page.
    pub fn page(self, page: u32) -> Self {
        self.param("page", page)
    }

    /// Request a particular page size.
    pub fn page_size(self, page_size: u32) -> Self {
        self.param("pageSize", page_size)
    }

    /// Fetch every page instead of only the first.
    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    /// Return the first page's transport response without decoding.
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Endpoint path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Whether all pages will be fetched.
    pub fn is_paginated(&self) -> bool {
        self.paginate
    }

    /// Whether raw output was requested.
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub(crate) fn into_parts(self) -> (String, QueryParams, bool, bool) {
        (self.path, self.params, self.paginate, self.raw)
    }
}
