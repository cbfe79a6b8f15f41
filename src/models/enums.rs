//! Enumeration types for the SPGCI API.
//!
//! The wire value of each variant is the string the reference-data
//! endpoints use, which is also what filter expressions must quote.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::FilterValue;

/// Contract type of an assessment symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    /// Physical spot
    Spot,
    /// Forward contract
    Forward,
    /// Exchange-traded future
    Future,
    /// Swap
    Swap,
    /// Strip of contracts
    Strip,
    /// Contract for difference
    #[serde(rename = "cfd")]
    Cfd,
    /// Index
    Index,
    /// Official selling price
    #[serde(rename = "official selling price")]
    OfficialSellingPrice,
    /// Yield
    Yield,
    /// Contract
    Contract,
    /// Exchange of spot for swap
    #[serde(rename = "ess")]
    Ess,
    /// Prompt
    Prompt,
    /// Statistic
    Statistic,
    /// Exchange of futures for physical
    #[serde(rename = "efp")]
    Efp,
    /// Netback
    Netback,
    /// Exchange of futures for swaps
    #[serde(rename = "efs")]
    Efs,
    /// Rack
    Rack,
}

impl ContractType {
    /// The value used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Spot => "spot",
            ContractType::Forward => "forward",
            ContractType::Future => "future",
            ContractType::Swap => "swap",
            ContractType::Strip => "strip",
            ContractType::Cfd => "cfd",
            ContractType::Index => "index",
            ContractType::OfficialSellingPrice => "official selling price",
            ContractType::Yield => "yield",
            ContractType::Contract => "contract",
            ContractType::Ess => "ess",
            ContractType::Prompt => "prompt",
            ContractType::Statistic => "statistic",
            ContractType::Efp => "efp",
            ContractType::Netback => "netback",
            ContractType::Efs => "efs",
            ContractType::Rack => "rack",
        }
    }
}

/// How often a symbol is assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentFrequency {
    /// Several times a day
    Intraday,
    /// Every day of the week
    #[serde(rename = "Daily (7 day)")]
    Daily,
    /// Weekdays only
    #[serde(rename = "Daily (weekday)")]
    DailyWeekday,
    /// Daily during bidweek
    #[serde(rename = "Daily (bidweek only)")]
    DailyBidweekOnly,
    /// Twice a week
    #[serde(rename = "Semi-weekly")]
    SemiWeekly,
    /// Weekly
    Weekly,
    /// Twice a month
    #[serde(rename = "Semi-monthly")]
    SemiMonthly,
    /// Monthly
    Monthly,
    /// Every second month
    #[serde(rename = "Every other month")]
    EveryOtherMonth,
    /// Quarterly
    Quarterly,
    /// Twice a year
    #[serde(rename = "Semi-annual")]
    SemiAnnual,
    /// Yearly
    Yearly,
}

impl AssessmentFrequency {
    /// The value used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentFrequency::Intraday => "Intraday",
            AssessmentFrequency::Daily => "Daily (7 day)",
            AssessmentFrequency::DailyWeekday => "Daily (weekday)",
            AssessmentFrequency::DailyBidweekOnly => "Daily (bidweek only)",
            AssessmentFrequency::SemiWeekly => "Semi-weekly",
            AssessmentFrequency::Weekly => "Weekly",
            AssessmentFrequency::SemiMonthly => "Semi-monthly",
            AssessmentFrequency::Monthly => "Monthly",
            AssessmentFrequency::EveryOtherMonth => "Every other month",
            AssessmentFrequency::Quarterly => "Quarterly",
            AssessmentFrequency::SemiAnnual => "Semi-annual",
            AssessmentFrequency::Yearly => "Yearly",
        }
    }
}

macro_rules! wire_enum_conversions {
    ($($t:ty),*) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl From<$t> for FilterValue {
                fn from(v: $t) -> Self {
                    FilterValue::Text(v.as_str().to_string())
                }
            }
        )*
    };
}

wire_enum_conversions!(ContractType, AssessmentFrequency);
