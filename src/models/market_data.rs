//! Market data models for Platts assessments.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::primitives::Symbol;

/// Helper to deserialize timestamps that may be RFC 3339, naive or date-only.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let Some(s) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if s.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.naive_utc()));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(dt));
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map(|d| Some(d.and_time(chrono::NaiveTime::MIN)))
        .map_err(D::Error::custom)
}

/// One assessed value of a symbol.
///
/// Rows come from the `results[*].data[*]` shape of the assessment
/// endpoints, flattened, with the `change.` prefix stripped and the parent
/// `symbol` attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Assessed symbol
    pub symbol: Symbol,
    /// Bid/ask/close indicator
    pub bate: String,
    /// Assessed value
    #[serde(default)]
    pub value: Option<Decimal>,
    /// Assessment date
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub assess_date: Option<NaiveDateTime>,
    /// Whether the value was corrected after publication
    #[serde(default)]
    pub is_corrected: Option<String>,
    /// Last modification time
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub mod_date: Option<NaiveDateTime>,
    /// Change from the previous value
    #[serde(default)]
    pub delta_price: Option<Decimal>,
    /// Percent change from the previous value
    #[serde(default)]
    pub delta_percent: Option<Decimal>,
    /// Previous value
    #[serde(default, rename = "pValue")]
    pub previous_value: Option<Decimal>,
    /// Date of the previous value
    #[serde(default, rename = "pDate", deserialize_with = "deserialize_timestamp")]
    pub previous_date: Option<NaiveDateTime>,
}

impl Assessment {
    /// Assessment date without the time component.
    pub fn date(&self) -> Option<NaiveDate> {
        self.assess_date.map(|d| d.date())
    }
}
