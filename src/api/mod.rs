//! API service modules for SPGCI datasets.
//!
//! Each service covers one dataset family. Every method takes a query
//! struct carrying the dataset's filters plus the uniform `page`,
//! `page_size`, `filter_exp`, `paginate` and `raw` knobs, and returns a
//! [`DataResponse`](crate::DataResponse).

mod market_data;
mod natural_gas;
mod refinery_data;

pub use market_data::{
    DateFilter, HistoricalQuery, MarketDataService, MdcQuery, SymbolCurrentQuery,
    SymbolSearchQuery, DEFAULT_ASSESSMENT_PAGE_SIZE, DEFAULT_SYMBOL_PAGE_SIZE,
};
pub use natural_gas::{NaturalGasService, PipelineFlowQuery, DEFAULT_FLOW_PAGE_SIZE};
pub use refinery_data::{CapacityQuery, RefineryDataService, DEFAULT_REFINERY_PAGE_SIZE};
