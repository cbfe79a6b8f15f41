//! Market data service for Platts assessments and reference data.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::client::{
    ClientInner, DataRequest, DataResponse, Decode, NestedResults, NoPagination, RawResponse,
    Record, Results, TotalPages,
};
use crate::filter::{Comparison, FilterBuilder};
use crate::models::{AssessmentFrequency, Assessment, ContractType, Mdc};
use crate::{Error, Result};

const VALUE_PATH: &str = "market-data/v3/value/";
const SEARCH_PATH: &str = "market-data/reference-data/v3/search";
const MDC_PATH: &str = "market-data/reference-data/v3/mdc";

/// Extra fields requested from the current-value endpoints.
const CHANGE_FIELDS: &str = "deltaPrice,deltaPercent,pValue,pDate";

/// Default page size for assessment queries.
pub const DEFAULT_ASSESSMENT_PAGE_SIZE: u32 = 10_000;
/// Default page size for symbol searches.
pub const DEFAULT_SYMBOL_PAGE_SIZE: u32 = 1_000;

const ASSESSMENTS: NestedResults = NestedResults::new("data", &["symbol"]).strip_prefix("change.");
const PAGES: TotalPages = TotalPages::new("/metadata/totalPages");
const REF_PAGES: TotalPages = TotalPages::new("/metadata/total_pages");

/// Service for Platts symbols and assessments.
///
/// # Example
///
/// ```no_run
/// use spgci_rs::api::HistoricalQuery;
/// use chrono::NaiveDate;
///
/// # async fn example(client: spgci_rs::SpgciClient) -> spgci_rs::Result<()> {
/// let mut query = HistoricalQuery::symbols(["PCAAS00", "PCAAT00"]);
/// query.assess_date.gte = NaiveDate::from_ymd_opt(2024, 1, 1);
/// query.paginate = true;
///
/// let rows = client
///     .market_data()
///     .assessments_by_symbol_historical(&query)
///     .await?
///     .into_table();
/// # Ok(())
/// # }
/// ```
pub struct MarketDataService {
    inner: Arc<ClientInner>,
}

/// Equality and range conditions on a date column.
#[derive(Debug, Clone, Default)]
pub struct DateFilter {
    /// Exactly this date
    pub eq: Option<NaiveDate>,
    /// After this date
    pub gt: Option<NaiveDate>,
    /// On or after this date
    pub gte: Option<NaiveDate>,
    /// Before this date
    pub lt: Option<NaiveDate>,
    /// On or before this date
    pub lte: Option<NaiveDate>,
}

impl DateFilter {
    /// Dates from `start` to `end`, both inclusive.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            gte: Some(start),
            lte: Some(end),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, field: &str, filter: FilterBuilder) -> FilterBuilder {
        filter
            .eq_opt(field, self.eq)
            .compare_opt(field, Comparison::Gt, self.gt)
            .compare_opt(field, Comparison::Ge, self.gte)
            .compare_opt(field, Comparison::Lt, self.lt)
            .compare_opt(field, Comparison::Le, self.lte)
    }
}

/// Query for current assessments by symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolCurrentQuery {
    /// Symbols to fetch
    pub symbols: Vec<String>,
    /// Restrict to these bates
    pub bates: Vec<String>,
    /// Hand-written filter expression AND-ed with the above
    pub filter_exp: Option<String>,
    /// Page to request; defaults to 1
    pub page: Option<u32>,
    /// Rows per page
    pub page_size: Option<u32>,
    /// Fetch every page
    pub paginate: bool,
    /// Return the first page's response undecoded
    pub raw: bool,
}

impl SymbolCurrentQuery {
    /// Query current assessments for `symbols`.
    pub fn symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Query for historical assessments by symbol.
#[derive(Debug, Clone, Default)]
pub struct HistoricalQuery {
    /// Symbols to fetch
    pub symbols: Vec<String>,
    /// Restrict to these bates
    pub bates: Vec<String>,
    /// Conditions on `assessDate`
    pub assess_date: DateFilter,
    /// Conditions on `modDate`
    pub modified_date: DateFilter,
    /// Hand-written filter expression AND-ed with the above
    pub filter_exp: Option<String>,
    /// Page to request; defaults to 1
    pub page: Option<u32>,
    /// Rows per page
    pub page_size: Option<u32>,
    /// Fetch every page
    pub paginate: bool,
    /// Return the first page's response undecoded
    pub raw: bool,
}

impl HistoricalQuery {
    /// Query the history of `symbols`.
    pub fn symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Query for assessments of every symbol in a Market Data Category.
#[derive(Debug, Clone, Default)]
pub struct MdcQuery {
    /// Market Data Category code
    pub mdc: Mdc,
    /// Restrict to these bates
    pub bates: Vec<String>,
    /// Conditions on `assessDate`; ignored by the current-value endpoint
    pub assess_date: DateFilter,
    /// Conditions on `modDate`; ignored by the current-value endpoint
    pub modified_date: DateFilter,
    /// Hand-written filter expression AND-ed with the above
    pub filter_exp: Option<String>,
    /// Page to request; defaults to 1
    pub page: Option<u32>,
    /// Rows per page
    pub page_size: Option<u32>,
    /// Fetch every page
    pub paginate: bool,
    /// Return the first page's response undecoded
    pub raw: bool,
}

impl MdcQuery {
    /// Query assessments in `mdc`.
    pub fn new(mdc: impl Into<Mdc>) -> Self {
        Self {
            mdc: mdc.into(),
            ..Default::default()
        }
    }
}

/// Symbol search over the reference data.
#[derive(Debug, Clone, Default)]
pub struct SymbolSearchQuery {
    /// Free-text search
    pub q: Option<String>,
    /// Commodities
    pub commodity: Vec<String>,
    /// Contract types
    pub contract_type: Vec<ContractType>,
    /// Currencies
    pub currency: Vec<String>,
    /// Units of measure
    pub uom: Vec<String>,
    /// Symbols
    pub symbol: Vec<String>,
    /// Delivery region basis
    pub delivery_region_basis: Vec<String>,
    /// Curve codes
    pub curve_code: Vec<String>,
    /// Market Data Categories
    pub mdc: Vec<String>,
    /// Assessment frequencies
    pub assessment_frequency: Vec<AssessmentFrequency>,
    /// Hand-written filter expression AND-ed with the above
    pub filter_exp: Option<String>,
    /// Page to request; defaults to 1
    pub page: Option<u32>,
    /// Rows per page
    pub page_size: Option<u32>,
    /// Fetch every page
    pub paginate: bool,
    /// Return the first page's response undecoded
    pub raw: bool,
}

impl SymbolSearchQuery {
    /// Free-text symbol search.
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }
}

impl MarketDataService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get the latest assessments for a list of symbols.
    pub async fn assessments_by_symbol_current(
        &self,
        query: &SymbolCurrentQuery,
    ) -> Result<DataResponse<Assessment>> {
        let filter = FilterBuilder::platts()
            .any_of("symbol", &query.symbols)
            .any_of("bate", &query.bates)
            .build(query.filter_exp.as_deref());

        let request = DataRequest::new(format!("{}current/symbol", VALUE_PATH))
            .filter(filter)
            .page(query.page.unwrap_or(1))
            .page_size(query.page_size.unwrap_or(DEFAULT_ASSESSMENT_PAGE_SIZE))
            .param("field", CHANGE_FIELDS)
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &ASSESSMENTS, &PAGES).await
    }

    /// Get the assessment history of a list of symbols.
    pub async fn assessments_by_symbol_historical(
        &self,
        query: &HistoricalQuery,
    ) -> Result<DataResponse<Assessment>> {
        let filter = FilterBuilder::platts()
            .any_of("symbol", &query.symbols)
            .any_of("bate", &query.bates);
        let filter = query.assess_date.apply("assessDate", filter);
        let filter = query
            .modified_date
            .apply("modDate", filter)
            .build(query.filter_exp.as_deref());

        let request = DataRequest::new(format!("{}history/symbol", VALUE_PATH))
            .filter(filter)
            .page(query.page.unwrap_or(1))
            .page_size(query.page_size.unwrap_or(DEFAULT_ASSESSMENT_PAGE_SIZE))
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &ASSESSMENTS, &PAGES).await
    }

    /// Get the latest assessments of every symbol in a Market Data Category.
    pub async fn assessments_by_mdc_current(
        &self,
        query: &MdcQuery,
    ) -> Result<DataResponse<Assessment>> {
        let filter = mdc_filter(query)?.build(query.filter_exp.as_deref());

        let request = DataRequest::new(format!("{}current/mdc", VALUE_PATH))
            .filter(filter)
            .page(query.page.unwrap_or(1))
            .page_size(query.page_size.unwrap_or(DEFAULT_ASSESSMENT_PAGE_SIZE))
            .param("field", CHANGE_FIELDS)
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &ASSESSMENTS, &PAGES).await
    }

    /// Get the assessment history of every symbol in a Market Data Category.
    pub async fn assessments_by_mdc_historical(
        &self,
        query: &MdcQuery,
    ) -> Result<DataResponse<Assessment>> {
        let filter = mdc_filter(query)?;
        let filter = query.assess_date.apply("assessDate", filter);
        let filter = query
            .modified_date
            .apply("modDate", filter)
            .build(query.filter_exp.as_deref());

        let request = DataRequest::new(format!("{}history/mdc", VALUE_PATH))
            .filter(filter)
            .page(query.page.unwrap_or(1))
            .page_size(query.page_size.unwrap_or(DEFAULT_ASSESSMENT_PAGE_SIZE))
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &ASSESSMENTS, &PAGES).await
    }

    /// Search the symbol reference data.
    ///
    /// Rows list `symbol` and `description` first, then every other column
    /// in server order.
    pub async fn symbols(&self, query: &SymbolSearchQuery) -> Result<DataResponse<Record>> {
        let filter = FilterBuilder::platts()
            .any_of("commodity", &query.commodity)
            .any_of("contract_type", query.contract_type.iter().copied())
            .any_of("currency", &query.currency)
            .any_of("uom", &query.uom)
            .any_of("delivery_region_basis", &query.delivery_region_basis)
            .any_of("curve_code", &query.curve_code)
            .any_of("symbol", &query.symbol)
            .any_of("mdc", &query.mdc)
            .any_of(
                "assessment_frequency",
                query.assessment_frequency.iter().copied(),
            )
            .build(query.filter_exp.as_deref());

        let request = DataRequest::new(SEARCH_PATH)
            .param_opt("q", query.q.as_deref())
            .filter(filter)
            .page(query.page.unwrap_or(1))
            .page_size(query.page_size.unwrap_or(DEFAULT_SYMBOL_PAGE_SIZE))
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &search_records, &REF_PAGES).await
    }

    /// List Market Data Categories.
    ///
    /// With `subscribed_only` only the categories the account can access
    /// are returned.
    pub async fn mdcs(&self, subscribed_only: bool, raw: bool) -> Result<DataResponse<Record>> {
        let request = DataRequest::new(MDC_PATH)
            .param("subscribed_only", subscribed_only)
            .raw(raw);

        self.inner.get_data(request, &Results, &NoPagination).await
    }
}

fn mdc_filter(query: &MdcQuery) -> Result<FilterBuilder> {
    if query.mdc.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("an MDC code is required".to_string()));
    }
    Ok(FilterBuilder::platts()
        .eq("MDC", &query.mdc)
        .any_of("bate", &query.bates))
}

/// Symbol search rows with the identifying columns first.
fn search_records(response: &RawResponse) -> Result<Vec<Record>> {
    let rows: Vec<Record> = Results.decode(response)?;
    Ok(rows
        .into_iter()
        .map(|mut row| {
            let mut ordered = Record::new();
            for key in ["symbol", "description"] {
                ordered.insert(key.to_string(), row.remove(key).unwrap_or(Value::Null));
            }
            ordered.extend(row);
            ordered
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use serde_json::json;
    use url::Url;

    #[test]
    fn test_date_filter_clauses() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let filter = DateFilter::between(d(1), d(31))
            .apply("assessDate", FilterBuilder::platts())
            .build(None);
        assert_eq!(
            filter.as_deref(),
            Some("assessDate >= \"2024-01-01\" AND assessDate <= \"2024-01-31\"")
        );
    }

    #[test]
    fn test_mdc_filter_requires_code() {
        let err = mdc_filter(&MdcQuery::new(" ")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let mut query = MdcQuery::new("ET");
        query.bates = vec!["c".to_string()];
        assert_eq!(
            mdc_filter(&query).unwrap().build(None).as_deref(),
            Some("MDC: \"ET\" AND bate in (\"c\")")
        );
    }

    #[test]
    fn test_search_records_column_order() {
        let resp = RawResponse::new(
            StatusCode::OK,
            Url::parse("https://api.example.com/x").unwrap(),
            HeaderMap::new(),
            json!({"results": [{"uom": "BBL", "description": "Dubai", "symbol": "PCAAT00"}]})
                .to_string(),
        );
        let rows = search_records(&resp).unwrap();
        let cols: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(cols, vec!["symbol", "description", "uom"]);
    }
}
