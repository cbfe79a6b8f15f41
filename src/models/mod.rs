//! Data models for the SPGCI API.
//!
//! Most datasets are returned as untyped [`Record`](crate::Record) rows.
//! The types here cover the identifiers and enums used to build queries
//! and the assessment rows of the market data service:
//!
//! - [`primitives`] - `Symbol` and `Mdc` newtypes
//! - [`enums`] - contract types and assessment frequencies
//! - [`market_data`] - assessment rows

pub mod primitives;
pub mod enums;
pub mod market_data;

pub use primitives::*;
pub use enums::*;
pub use market_data::*;
