//! World refinery database service (OData).

use std::sync::Arc;

use crate::client::{ClientInner, DataRequest, DataResponse, ODataPages, ODataValue, Record};
use crate::filter::{Comparison, FilterBuilder};
use crate::Result;

const PATH: &str = "odata/refinery-data/v2.2/";

/// Default page size for refinery queries.
pub const DEFAULT_REFINERY_PAGE_SIZE: u32 = 1_000;

/// Service for the world refinery database.
///
/// These endpoints speak OData: pages are addressed with a `$skip` row
/// offset and filters use the OData dialect.
pub struct RefineryDataService {
    inner: Arc<ClientInner>,
}

/// Query for refinery capacity changes.
#[derive(Debug, Clone, Default)]
pub struct CapacityQuery {
    /// Years
    pub year: Vec<i32>,
    /// After this year
    pub year_gt: Option<i32>,
    /// In or after this year
    pub year_gte: Option<i32>,
    /// Before this year
    pub year_lt: Option<i32>,
    /// In or before this year
    pub year_lte: Option<i32>,
    /// Quarters
    pub quarter: Vec<i32>,
    /// Refinery identifiers
    pub refinery_id: Vec<i64>,
    /// Owner names
    pub owner: Vec<String>,
    /// Capacity identifiers
    pub capacity_id: Vec<i64>,
    /// Capacity status identifiers
    pub capacity_status_id: Vec<i64>,
    /// Process unit names
    pub process_unit: Vec<String>,
    /// Country names
    pub country: Vec<String>,
    /// Region names
    pub region: Vec<String>,
    /// Hand-written filter expression AND-ed with the above
    pub filter_exp: Option<String>,
    /// Rows to skip
    pub skip: u64,
    /// Rows per page
    pub page_size: Option<u32>,
    /// Fetch every page
    pub paginate: bool,
    /// Return the first page's response undecoded
    pub raw: bool,
}

impl CapacityQuery {
    fn filter(&self) -> Option<String> {
        FilterBuilder::odata()
            .matches("Year", self.year.iter().copied())
            .matches("Quarter", self.quarter.iter().copied())
            .matches("RefineryId", self.refinery_id.iter().copied())
            .matches("Owner/Name", &self.owner)
            .matches("CapacityId", self.capacity_id.iter().copied())
            .matches("CapacityStatusId", self.capacity_status_id.iter().copied())
            .matches("ProcessUnit/Name", &self.process_unit)
            .matches("Refinery/Country/Name", &self.country)
            .matches("Refinery/Region/Name", &self.region)
            .compare_opt("Year", Comparison::Gt, self.year_gt)
            .compare_opt("Year", Comparison::Ge, self.year_gte)
            .compare_opt("Year", Comparison::Lt, self.year_lt)
            .compare_opt("Year", Comparison::Le, self.year_lte)
            .build(self.filter_exp.as_deref())
    }
}

impl RefineryDataService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get historical refinery capacity changes.
    pub async fn capacity(&self, query: &CapacityQuery) -> Result<DataResponse<Record>> {
        let request = DataRequest::new(format!("{}capacity", PATH))
            .param("$skip", query.skip)
            .page_size(query.page_size.unwrap_or(DEFAULT_REFINERY_PAGE_SIZE))
            .param("$count", "true")
            .param("$expand", "*")
            .param_opt("$filter", query.filter())
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &ODataValue, &ODataPages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_filter() {
        let query = CapacityQuery {
            year_gte: Some(2022),
            process_unit: vec!["Atmos Distillation".into(), "Dist Hydrocracking".into()],
            country: vec!["Japan".into()],
            filter_exp: Some("Quarter eq 1".into()),
            ..Default::default()
        };
        assert_eq!(
            query.filter().as_deref(),
            Some(
                "ProcessUnit/Name in ('Atmos Distillation','Dist Hydrocracking') \
                 AND Refinery/Country/Name eq 'Japan' AND Year ge 2022 AND (Quarter eq 1)"
            )
        );
    }
}
