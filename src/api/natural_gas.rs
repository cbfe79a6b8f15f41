//! North American natural gas supply and demand service.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::client::{ClientInner, CountPages, DataRequest, DataResponse, Record, Results};
use crate::filter::FilterBuilder;
use crate::Result;

use super::market_data::DateFilter;

const PATH: &str = "analytics/natural-gas/north-america/supply-demand/v1/";

/// Default page size for pipeline flow queries.
pub const DEFAULT_FLOW_PAGE_SIZE: u32 = 2_000;

const PAGES: CountPages = CountPages::new("/metadata/count", "/metadata/pageSize");

/// Service for North American natural gas pipeline analytics.
pub struct NaturalGasService {
    inner: Arc<ClientInner>,
}

/// Query for pipeline flow data.
#[derive(Debug, Clone, Default)]
pub struct PipelineFlowQuery {
    /// Pipeline identifier
    pub pipeline_id: Option<i64>,
    /// Pipeline component identifier
    pub component_id: Option<i64>,
    /// Gas days; several values match any of them
    pub gas_dates: Vec<NaiveDate>,
    /// Range conditions on `gasDate`
    pub gas_date: DateFilter,
    /// Nomination cycles
    pub nomination_cycle: Vec<String>,
    /// Location types
    pub location_type: Vec<String>,
    /// Flow directions
    pub flow_dir: Vec<String>,
    /// Interruptible flow indicators
    pub interruptible_flow: Vec<String>,
    /// Only active rows
    pub data_active: Option<bool>,
    /// Data source
    pub data_source: Option<String>,
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

impl PipelineFlowQuery {
    /// Flows of one pipeline.
    pub fn pipeline(pipeline_id: i64) -> Self {
        Self {
            pipeline_id: Some(pipeline_id),
            ..Default::default()
        }
    }

    fn filter(&self) -> Option<String> {
        let filter = FilterBuilder::platts()
            .eq_opt("pipelineId", self.pipeline_id)
            .eq_opt("componentId", self.component_id)
            .matches("gasDate", self.gas_dates.iter().copied())
            .matches("nominationCycle", &self.nomination_cycle)
            .matches("locationType", &self.location_type)
            .matches("flowDir", &self.flow_dir)
            .matches("interruptibleFlow", &self.interruptible_flow)
            .eq_opt("dataActive", self.data_active)
            .eq_opt("dataSource", self.data_source.as_deref());
        self.gas_date
            .apply("gasDate", filter)
            .build(self.filter_exp.as_deref())
    }
}

impl NaturalGasService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get pipeline flow data.
    pub async fn pipeline_flows(&self, query: &PipelineFlowQuery) -> Result<DataResponse<Record>> {
        let request = DataRequest::new(format!("{}pipeline-flow-data", PATH))
            .page_size(query.page_size.unwrap_or(DEFAULT_FLOW_PAGE_SIZE))
            .filter(query.filter())
            .page(query.page.unwrap_or(1))
            .paginate(query.paginate)
            .raw(query.raw);

        self.inner.get_data(request, &Results, &PAGES).await
    }
}
