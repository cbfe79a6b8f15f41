//! Pagination across multi-page API results.
//!
//! Every dataset endpoint returns one page at a time together with some
//! metadata describing how many pages exist. Where that metadata lives
//! differs by endpoint, so the page count is computed by a pluggable
//! [`Paginate`] strategy. The pagination driver
//! ([`SpgciClient::fetch_all`](crate::SpgciClient::fetch_all)) fetches the
//! first page, asks the strategy for a [`Paginator`], and, when asked to,
//! fetches the remaining pages one after another into a single [`Table`].

use std::fmt;

use serde_json::Value;
use url::Url;

use super::decode::{Decode, Record};
use super::query::{DataRequest, QueryParams};
use super::{ClientInner, RawResponse};
use crate::{Error, Result};

/// How subsequent pages are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStyle {
    /// The page parameter is a 1-based page number.
    #[default]
    Default,
    /// The page parameter is a row offset: `(page - 1) * pageSize`.
    OData,
}

/// Pagination state computed from a first-page response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    /// Whether pages beyond the first exist
    pub has_more_pages: bool,
    /// Query parameter addressing a page
    pub key: String,
    /// Total number of pages
    pub total_pages: u32,
    /// Link to the next page, when the server provides one
    pub next_link: Option<String>,
    /// How the page parameter is interpreted
    pub style: PaginationStyle,
}

impl Paginator {
    /// A result that fits on one page.
    pub fn single_page() -> Self {
        Self {
            has_more_pages: false,
            key: "page".to_string(),
            total_pages: 1,
            next_link: None,
            style: PaginationStyle::Default,
        }
    }

    /// Page-number pagination over `total_pages` pages using `key`.
    pub fn pages(key: impl Into<String>, total_pages: u32) -> Self {
        Self {
            has_more_pages: total_pages > 1,
            key: key.into(),
            total_pages,
            next_link: None,
            style: PaginationStyle::Default,
        }
    }

    /// Offset pagination over `total_pages` pages using `key`.
    pub fn odata(key: impl Into<String>, total_pages: u32) -> Self {
        Self {
            style: PaginationStyle::OData,
            ..Self::pages(key, total_pages)
        }
    }

    /// Attach a next-page link.
    pub fn with_next_link(mut self, link: impl Into<String>) -> Self {
        self.next_link = Some(link.into());
        self
    }
}

/// Computes a [`Paginator`] from a first-page response.
pub trait Paginate {
    /// Inspect the first page's metadata.
    fn paginate(&self, response: &RawResponse) -> Result<Paginator>;
}

impl<F> Paginate for F
where
    F: Fn(&RawResponse) -> Result<Paginator>,
{
    fn paginate(&self, response: &RawResponse) -> Result<Paginator> {
        self(response)
    }
}

/// Endpoints that never paginate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPagination;

impl Paginate for NoPagination {
    fn paginate(&self, _response: &RawResponse) -> Result<Paginator> {
        Ok(Paginator::single_page())
    }
}

/// Page count read directly from the body at a JSON pointer.
///
/// Most endpoints use `/metadata/totalPages`; reference-data endpoints use
/// `/metadata/total_pages`.
#[derive(Debug, Clone, Copy)]
pub struct TotalPages {
    pointer: &'static str,
}

impl TotalPages {
    /// Read the page count at `pointer`, e.g. `/metadata/totalPages`.
    pub const fn new(pointer: &'static str) -> Self {
        Self { pointer }
    }
}

impl Default for TotalPages {
    fn default() -> Self {
        Self::new("/metadata/totalPages")
    }
}

impl Paginate for TotalPages {
    fn paginate(&self, response: &RawResponse) -> Result<Paginator> {
        let body: Value = response.json()?;
        let total = read_u64(&body, self.pointer)?;
        Ok(paginator_for(total))
    }
}

/// Page count derived from a row count and a page size.
#[derive(Debug, Clone, Copy)]
pub struct CountPages {
    count: &'static str,
    page_size: &'static str,
}

impl CountPages {
    /// Divide the count at `count` by the page size at `page_size`, rounding up.
    pub const fn new(count: &'static str, page_size: &'static str) -> Self {
        Self { count, page_size }
    }
}

impl Default for CountPages {
    fn default() -> Self {
        Self::new("/metadata/count", "/metadata/pageSize")
    }
}

impl Paginate for CountPages {
    fn paginate(&self, response: &RawResponse) -> Result<Paginator> {
        let body: Value = response.json()?;
        let count = read_u64(&body, self.count)?;
        let size = read_u64(&body, self.page_size)?;
        Ok(paginator_for(pages_for(count, size)))
    }
}

/// OData pagination: `@odata.count` rows, `pageSize` from the request URL,
/// pages addressed by a `$skip` offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ODataPages;

impl ODataPages {
    /// Offset parameter name.
    pub const KEY: &'static str = "$skip";
}

impl Paginate for ODataPages {
    fn paginate(&self, response: &RawResponse) -> Result<Paginator> {
        let Some(size) = response.query_param("pageSize") else {
            return Ok(Paginator::odata(Self::KEY, 1));
        };
        let size: u64 = size
            .parse()
            .map_err(|_| Error::Decode(format!("invalid pageSize `{}`", size)))?;

        let body: Value = response.json()?;
        let count = read_u64(&body, "/@odata.count")?;
        let total = u32::try_from(pages_for(count, size)).unwrap_or(u32::MAX);

        let mut paginator = Paginator::odata(Self::KEY, total);
        if let Some(link) = body.get("@odata.nextLink").and_then(|v| v.as_str()) {
            paginator = paginator.with_next_link(link);
        }
        Ok(paginator)
    }
}

fn read_u64(body: &Value, pointer: &str) -> Result<u64> {
    let value = body
        .pointer(pointer)
        .ok_or_else(|| Error::Decode(format!("pagination metadata missing `{}`", pointer)))?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .ok_or_else(|| Error::Decode(format!("`{}` is not a non-negative number", pointer)))
}

fn pages_for(count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

fn paginator_for(total: u64) -> Paginator {
    if total <= 1 {
        return Paginator::single_page();
    }
    Paginator::pages("page", u32::try_from(total).unwrap_or(u32::MAX))
}

/// A non-fatal notice produced while building a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Only the first page was returned because pagination was off.
    MorePagesAvailable {
        /// Total pages on the server
        total_pages: u32,
    },
    /// A full fetch of many pages is about to start.
    LargeFetch {
        /// Pages that will be fetched
        total_pages: u32,
    },
    /// Raw output was requested together with pagination.
    RawIgnoresPagination,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::MorePagesAvailable { total_pages } => write!(
                f,
                "Fetched page [1] of [{}]. set `paginate=true` to fetch all pages.",
                total_pages
            ),
            Advisory::LargeFetch { total_pages } => write!(
                f,
                "With `paginate=true` this will fetch {} pages. Set `paginate=false` to disable.",
                total_pages
            ),
            Advisory::RawIgnoresPagination => write!(
                f,
                "Cannot set `paginate=true` along with `raw=true`. Returning only the page requested."
            ),
        }
    }
}

fn advise(advisories: &mut Vec<Advisory>, advisory: Advisory) {
    tracing::warn!("{}", advisory);
    advisories.push(advisory);
}

/// Rows accumulated across one or more pages.
///
/// Rows keep the server's order within a page and pages are appended in
/// increasing page order.
#[derive(Debug, Clone)]
pub struct Table<T = Record> {
    rows: Vec<T>,
    pages_fetched: u32,
    total_pages: u32,
    advisories: Vec<Advisory>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            pages_fetched: 0,
            total_pages: 0,
            advisories: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    /// Create a table from a single batch of rows.
    pub fn from_rows(rows: Vec<T>) -> Self {
        Self {
            rows,
            pages_fetched: 1,
            total_pages: 1,
            advisories: Vec::new(),
        }
    }

    fn append_page(&mut self, rows: Vec<T>) {
        self.rows.extend(rows);
        self.pages_fetched += 1;
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows, in order.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Take ownership of the rows.
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// Iterate over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    /// Pages whose rows are in this table.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Pages available on the server.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Returns `true` if every page available on the server was fetched.
    pub fn is_complete(&self) -> bool {
        self.pages_fetched >= self.total_pages
    }

    /// Non-fatal notices emitted while building the table.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

impl Table<Record> {
    /// Column names in order of first appearance across all rows.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// Values of one column; `None` where a row lacks it.
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|row| row.get(name)).collect()
    }

    /// Deserialize every row into a typed record.
    pub fn into_typed<U: serde::de::DeserializeOwned>(self) -> Result<Table<U>> {
        let rows = self
            .rows
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(Error::from))
            .collect::<Result<Vec<U>>>()?;

        Ok(Table {
            rows,
            pages_fetched: self.pages_fetched,
            total_pages: self.total_pages,
            advisories: self.advisories,
        })
    }
}

impl<T> IntoIterator for Table<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Output of a dataset method: decoded rows, or the untouched first page.
#[derive(Debug, Clone)]
pub enum DataResponse<T = Record> {
    /// Decoded rows
    Table(Table<T>),
    /// The first page's transport response
    Raw {
        /// The response
        response: RawResponse,
        /// Non-fatal notices
        advisories: Vec<Advisory>,
    },
}

impl<T> DataResponse<T> {
    /// The decoded table, if rows were requested.
    pub fn into_table(self) -> Option<Table<T>> {
        match self {
            DataResponse::Table(table) => Some(table),
            DataResponse::Raw { .. } => None,
        }
    }

    /// The raw response, if raw output was requested.
    pub fn into_raw(self) -> Option<RawResponse> {
        match self {
            DataResponse::Raw { response, .. } => Some(response),
            DataResponse::Table(_) => None,
        }
    }

    /// Non-fatal notices emitted while serving the request.
    pub fn advisories(&self) -> &[Advisory] {
        match self {
            DataResponse::Table(table) => table.advisories(),
            DataResponse::Raw { advisories, .. } => advisories,
        }
    }
}

/// Rewrite `url` so its query addresses an OData page by row offset.
///
/// `params` are merged into the URL's own query first. The offset is
/// `(page - 1) * pageSize`, where `pageSize` comes from the merged query.
pub(crate) fn odata_page_url(url: &Url, params: &QueryParams, key: &str, page: u32) -> Result<Url> {
    let mut query: QueryParams = url.query_pairs().into_owned().collect();
    for (k, v) in params.iter() {
        query.set(k, v);
    }

    let page_size: u64 = query
        .get("pageSize")
        .ok_or_else(|| {
            Error::InvalidInput("OData pagination requires a pageSize query parameter".to_string())
        })?
        .parse()
        .map_err(|_| Error::InvalidInput("pageSize must be a whole number".to_string()))?;

    query.set(key, u64::from(page.saturating_sub(1)) * page_size);

    let mut next = url.clone();
    next.set_query(Some(&query.encode()));
    Ok(next)
}

impl ClientInner {
    /// Fetch the first page of `path` and, if `auto_paginate` is set, every
    /// following page, concatenating the decoded rows.
    pub(crate) async fn fetch_all<T, D, P>(
        &self,
        path: &str,
        mut params: QueryParams,
        decoder: &D,
        paginate: &P,
        auto_paginate: bool,
    ) -> Result<Table<T>>
    where
        D: Decode<T> + ?Sized,
        P: Paginate + ?Sized,
    {
        let url = self.endpoint_url(path)?;
        let first = self.execute_get(&url, &params).await?;
        self.collect_pages(&url, &mut params, first, decoder, paginate, auto_paginate)
            .await
    }

    /// Serve a caller-facing [`DataRequest`], honouring its `raw` and
    /// `paginate` flags.
    pub(crate) async fn get_data<T, D, P>(
        &self,
        request: DataRequest,
        decoder: &D,
        paginate: &P,
    ) -> Result<DataResponse<T>>
    where
        D: Decode<T> + ?Sized,
        P: Paginate + ?Sized,
    {
        let (path, mut params, auto_paginate, raw) = request.into_parts();
        let url = self.endpoint_url(&path)?;
        let first = self.execute_get(&url, &params).await?;

        if raw {
            let mut advisories = Vec::new();
            if auto_paginate {
                advise(&mut advisories, Advisory::RawIgnoresPagination);
            }
            return Ok(DataResponse::Raw {
                response: first,
                advisories,
            });
        }

        let table = self
            .collect_pages(&url, &mut params, first, decoder, paginate, auto_paginate)
            .await?;
        Ok(DataResponse::Table(table))
    }

    async fn collect_pages<T, D, P>(
        &self,
        url: &Url,
        params: &mut QueryParams,
        first: RawResponse,
        decoder: &D,
        paginate: &P,
        auto_paginate: bool,
    ) -> Result<Table<T>>
    where
        D: Decode<T> + ?Sized,
        P: Paginate + ?Sized,
    {
        let mut table = Table::from_rows(decoder.decode(&first)?);
        let paginator = paginate.paginate(&first)?;

        if !paginator.has_more_pages {
            return Ok(table);
        }

        let total = paginator.total_pages;
        table.total_pages = total;

        if !auto_paginate {
            advise(
                &mut table.advisories,
                Advisory::MorePagesAvailable { total_pages: total },
            );
            return Ok(table);
        }

        if total > self.config.large_fetch_threshold {
            advise(&mut table.advisories, Advisory::LargeFetch { total_pages: total });
        }

        for page in 2..=total {
            let response = match paginator.style {
                PaginationStyle::OData => {
                    let page_url = odata_page_url(url, params, &paginator.key, page)?;
                    self.execute_get(&page_url, &QueryParams::new()).await?
                }
                PaginationStyle::Default => {
                    params.set(paginator.key.as_str(), page);
                    self.execute_get(url, params).await?
                }
            };

            table.append_page(decoder.decode(&response)?);
            tracing::debug!(page, total, rows = table.len(), "fetched page");
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use serde_json::json;

    fn page_at(url: &str, body: Value) -> RawResponse {
        RawResponse::new(
            StatusCode::OK,
            Url::parse(url).unwrap(),
            HeaderMap::new(),
            body.to_string(),
        )
    }

    fn page(body: Value) -> RawResponse {
        page_at("https://api.example.com/x", body)
    }

    #[test]
    fn test_total_pages() {
        let p = TotalPages::default()
            .paginate(&page(json!({"metadata": {"totalPages": 4}})))
            .unwrap();
        assert!(p.has_more_pages);
        assert_eq!(p.total_pages, 4);
        assert_eq!(p.key, "page");
        assert_eq!(p.style, PaginationStyle::Default);

        let p = TotalPages::new("/metadata/total_pages")
            .paginate(&page(json!({"metadata": {"total_pages": 1}})))
            .unwrap();
        assert_eq!(p, Paginator::single_page());
    }

    #[test]
    fn test_total_pages_zero_is_single_page() {
        let p = TotalPages::default()
            .paginate(&page(json!({"metadata": {"totalPages": 0}})))
            .unwrap();
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_total_pages_missing_metadata() {
        let err = TotalPages::default()
            .paginate(&page(json!({"results": []})))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_count_pages_ceiling() {
        let paginate = CountPages::new("/metaData/count", "/metaData/pageSize");

        let p = paginate
            .paginate(&page(json!({"metaData": {"count": 2001, "pageSize": 1000}})))
            .unwrap();
        assert_eq!(p.total_pages, 3);

        let p = paginate
            .paginate(&page(json!({"metaData": {"count": 2000, "pageSize": 1000}})))
            .unwrap();
        assert_eq!(p.total_pages, 2);

        let p = paginate
            .paginate(&page(json!({"metaData": {"count": 999, "pageSize": 1000}})))
            .unwrap();
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_odata_pages() {
        let resp = page_at(
            "https://api.example.com/odata/capacity?%24skip=0&pageSize=100",
            json!({"@odata.count": 250, "value": []}),
        );
        let p = ODataPages.paginate(&resp).unwrap();
        assert_eq!(p, Paginator::odata("$skip", 3));
    }

    #[test]
    fn test_odata_without_page_size_is_single_page() {
        let resp = page_at(
            "https://api.example.com/odata/capacity",
            json!({"@odata.count": 250, "value": []}),
        );
        let p = ODataPages.paginate(&resp).unwrap();
        assert!(!p.has_more_pages);
    }

    #[test]
    fn test_odata_page_url_offsets() {
        let url = Url::parse(
            "https://api.example.com/odata/capacity?%24skip=0&pageSize=100&%24filter=Year%20eq%202020",
        )
        .unwrap();

        let next = odata_page_url(&url, &QueryParams::new(), "$skip", 3).unwrap();
        assert_eq!(
            next.query(),
            Some("%24skip=200&pageSize=100&%24filter=Year%20eq%202020")
        );
    }

    #[test]
    fn test_odata_page_url_requires_page_size() {
        let url = Url::parse("https://api.example.com/odata/capacity").unwrap();
        let err = odata_page_url(&url, &QueryParams::new(), "$skip", 2).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_table_columns_union() {
        let mut a = Record::new();
        a.insert("symbol".into(), json!("A"));
        a.insert("value".into(), json!(1));
        let mut b = Record::new();
        b.insert("symbol".into(), json!("B"));
        b.insert("bate".into(), json!("c"));

        let table = Table::from_rows(vec![a, b]);
        assert_eq!(table.columns(), vec!["symbol", "value", "bate"]);
        assert_eq!(table.column("bate"), vec![None, Some(&json!("c"))]);
    }

    #[test]
    fn test_advisory_messages() {
        assert_eq!(
            Advisory::MorePagesAvailable { total_pages: 5 }.to_string(),
            "Fetched page [1] of [5]. set `paginate=true` to fetch all pages."
        );
        assert!(Advisory::LargeFetch { total_pages: 12 }
            .to_string()
            .contains("12 pages"));
    }
}
