//! # spgci-rs
//!
//! A Rust client for the S&P Global Commodity Insights (SPGCI) data API.
//!
//! The crate wraps the three concerns every SPGCI dataset call shares:
//!
//! - **Authentication**: credentials are exchanged for a bearer token on
//!   first use; the token is cached and evicted when the server rejects it
//! - **Request execution**: authenticated GETs with retries on token
//!   rejection and per-second throttling; daily quota exhaustion surfaces
//!   immediately
//! - **Pagination**: first page, page count from the response metadata,
//!   then every remaining page in order, concatenated into one [`Table`]
//!
//! Dataset services ([`api`]) are thin layers that build a
//! [`DataRequest`] and pick a decoder and a pagination strategy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spgci_rs::api::SymbolCurrentQuery;
//! use spgci_rs::{ClientConfig, SpgciClient};
//!
//! #[tokio::main]
//! async fn main() -> spgci_rs::Result<()> {
//!     let client = SpgciClient::new(ClientConfig::new("username", "password"))?;
//!
//!     let mut query = SymbolCurrentQuery::symbols(["PCAAS00", "PCAAT00"]);
//!     query.paginate = true;
//!
//!     let response = client.market_data().assessments_by_symbol_current(&query).await?;
//!     if let Some(table) = response.into_table() {
//!         for row in &table {
//!             println!("{} {} {:?}", row.symbol, row.bate, row.value);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration from the environment
//!
//! ```rust,no_run
//! # fn main() -> spgci_rs::Result<()> {
//! // Reads SPGCI_USERNAME, SPGCI_PASSWORD and friends, loading `.env` first.
//! let client = spgci_rs::SpgciClient::from_env()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom endpoints
//!
//! Endpoints without a dedicated service method can be called through
//! [`SpgciClient::get_data`] with any decoder and pagination strategy:
//!
//! ```rust,no_run
//! use spgci_rs::client::{CountPages, Results};
//! use spgci_rs::{DataRequest, Record};
//!
//! # async fn example(client: spgci_rs::SpgciClient) -> spgci_rs::Result<()> {
//! let request = DataRequest::new("analytics/crude-supply-risk/v1/outages")
//!     .page(1)
//!     .page_size(1000)
//!     .paginate(true);
//!
//! let rows = client
//!     .get_data::<Record, _, _>(
//!         request,
//!         &Results,
//!         &CountPages::new("/metaData/count", "/metaData/pageSize"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod filter;
pub mod models;

// Re-export primary types at crate root for convenience
pub use error::{Error, Result};
pub use models::{Mdc, Symbol};
pub use client::{
    Advisory, ClientConfig, Credentials, DataRequest, DataResponse, QueryParams, RawResponse,
    Record, RetryConfig, SpgciClient, Table,
};
pub use auth::TokenManager;

/// Prelude module for convenient imports.
///
/// ```rust
/// use spgci_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        // Primitives
        Mdc, Symbol,
        // Enums
        AssessmentFrequency, ContractType,
        // Rows
        Assessment,
    };
    pub use crate::client::{
        Advisory, ClientConfig, DataRequest, DataResponse, Decode, Paginate, QueryParams,
        Record, RetryConfig, SpgciClient, Table,
    };
    pub use crate::api::{
        CapacityQuery, DateFilter, HistoricalQuery, MdcQuery, PipelineFlowQuery,
        SymbolCurrentQuery, SymbolSearchQuery,
    };
    pub use crate::filter::{Comparison, FilterBuilder};
}
