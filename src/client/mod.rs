//! HTTP client, request execution and pagination for the SPGCI API.
//!
//! This module provides the main entry point [`SpgciClient`] together with
//! the building blocks used by every dataset service: [`DataRequest`],
//! the [`Decode`] and [`Paginate`] extension points and the [`Table`] they
//! produce.
//!
//! # Example
//!
//! ```no_run
//! use spgci_rs::client::{NoPagination, QueryParams, Results};
//! use spgci_rs::{ClientConfig, Record, SpgciClient};
//!
//! # async fn example() -> spgci_rs::Result<()> {
//! let client = SpgciClient::new(ClientConfig::new("username", "password"))?;
//!
//! let table = client
//!     .fetch_all::<Record, _, _>(
//!         "market-data/reference-data/v3/mdc",
//!         QueryParams::new().with("subscribed_only", true),
//!         &Results,
//!         &NoPagination,
//!         false,
//!     )
//!     .await?;
//! println!("{} MDCs", table.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod decode;
mod http;
pub mod paginated;
mod query;
mod response;

pub use config::{
    ClientConfig, Credentials, Proxies, RetryConfig, TransportAuth, DEFAULT_BASE_URL,
    DEFAULT_LARGE_FETCH_THRESHOLD,
};
pub use decode::{Decode, NestedResults, ODataValue, Record, Results};
pub use http::SpgciClient;
pub use paginated::{
    Advisory, CountPages, DataResponse, NoPagination, ODataPages, Paginate, PaginationStyle,
    Paginator, Table, TotalPages,
};
pub use query::{DataRequest, QueryParams};
pub use response::RawResponse;
pub(crate) use http::ClientInner;
