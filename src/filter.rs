//! Server-side filter expressions.
//!
//! Dataset endpoints accept a `filter` query parameter in one of two
//! dialects: the Platts dialect (`symbol: "PCAAS00"`, `symbol in ("A","B")`)
//! and OData (`Country eq 'Japan'`). [`FilterBuilder`] assembles clauses in
//! either dialect and AND-s them together.
//!
//! ```
//! use spgci_rs::filter::FilterBuilder;
//!
//! let filter = FilterBuilder::platts()
//!     .any_of("symbol", ["PCAAS00", "PCAAT00"])
//!     .eq("bate", "c")
//!     .build(Some("assessDate >= \"2024-01-01\""));
//!
//! assert_eq!(
//!     filter.as_deref(),
//!     Some("symbol in (\"PCAAS00\",\"PCAAT00\") AND bate: \"c\" AND (assessDate >= \"2024-01-01\")")
//! );
//! ```

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Filter dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStrategy {
    /// `field: "value"`, double-quoted strings
    #[default]
    Platts,
    /// `field eq 'value'`, single-quoted strings
    OData,
}

impl FilterStrategy {
    fn quote(self) -> char {
        match self {
            FilterStrategy::Platts => '"',
            FilterStrategy::OData => '\'',
        }
    }

    fn eq_op(self) -> &'static str {
        match self {
            FilterStrategy::Platts => ":",
            FilterStrategy::OData => " eq",
        }
    }
}

/// Ordering comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Strictly greater
    Gt,
    /// Greater or equal
    Ge,
    /// Strictly less
    Lt,
    /// Less or equal
    Le,
}

impl Comparison {
    fn operator(self, strategy: FilterStrategy) -> &'static str {
        match (strategy, self) {
            (FilterStrategy::Platts, Comparison::Gt) => ">",
            (FilterStrategy::Platts, Comparison::Ge) => ">=",
            (FilterStrategy::Platts, Comparison::Lt) => "<",
            (FilterStrategy::Platts, Comparison::Le) => "<=",
            (FilterStrategy::OData, Comparison::Gt) => "gt",
            (FilterStrategy::OData, Comparison::Ge) => "ge",
            (FilterStrategy::OData, Comparison::Lt) => "lt",
            (FilterStrategy::OData, Comparison::Le) => "le",
        }
    }
}

/// A literal in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Quoted text
    Text(String),
    /// Unquoted number
    Number(String),
    /// Unquoted boolean, written `True` or `False`
    Bool(bool),
    /// ISO date; quoted in Platts, bare in OData single-value clauses
    Date(NaiveDate),
}

impl FilterValue {
    fn render(&self, strategy: FilterStrategy, in_list: bool) -> String {
        let q = strategy.quote();
        match self {
            FilterValue::Text(s) => format!("{q}{s}{q}"),
            FilterValue::Number(n) => n.clone(),
            FilterValue::Bool(true) => "True".to_string(),
            FilterValue::Bool(false) => "False".to_string(),
            FilterValue::Date(d) if strategy == FilterStrategy::OData && !in_list => d.to_string(),
            FilterValue::Date(d) => format!("{q}{d}{q}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<&String> for FilterValue {
    fn from(s: &String) -> Self {
        FilterValue::Text(s.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(d: NaiveDate) -> Self {
        FilterValue::Date(d)
    }
}

impl From<Decimal> for FilterValue {
    fn from(d: Decimal) -> Self {
        FilterValue::Number(d.to_string())
    }
}

macro_rules! number_filter_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(n: $t) -> Self {
                    FilterValue::Number(n.to_string())
                }
            }
        )*
    };
}

number_filter_value!(i32, i64, u32, u64, f64);

/// Builds a filter expression clause by clause.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    strategy: FilterStrategy,
    clauses: Vec<String>,
}

impl FilterBuilder {
    /// Create a builder for a dialect.
    pub fn new(strategy: FilterStrategy) -> Self {
        Self {
            strategy,
            clauses: Vec::new(),
        }
    }

    /// Create a Platts-dialect builder.
    pub fn platts() -> Self {
        Self::new(FilterStrategy::Platts)
    }

    /// Create an OData-dialect builder.
    pub fn odata() -> Self {
        Self::new(FilterStrategy::OData)
    }

    /// `field` equals `value`.
    pub fn eq(mut self, field: &str, value: impl Into<FilterValue>) -> Self {
        let value = value.into().render(self.strategy, false);
        self.clauses
            .push(format!("{}{} {}", field, self.strategy.eq_op(), value));
        self
    }

    /// `field` equals `value`, if present.
    pub fn eq_opt<V: Into<FilterValue>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// `field` is one of `values`; no clause when `values` is empty.
    pub fn any_of<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let items: Vec<String> = values
            .into_iter()
            .map(|v| v.into().render(self.strategy, true))
            .collect();
        if !items.is_empty() {
            self.clauses
                .push(format!("{} in ({})", field, items.join(",")));
        }
        self
    }

    /// `field` equals the value when there is exactly one, or is one of
    /// them when there are several; no clause when `values` is empty.
    pub fn matches<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let mut values: Vec<FilterValue> = values.into_iter().map(Into::into).collect();
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return self.eq(field, value);
            }
        }
        self.any_of(field, values)
    }

    /// Ordering comparison against `value`.
    pub fn compare(mut self, field: &str, op: Comparison, value: impl Into<FilterValue>) -> Self {
        let value = value.into().render(self.strategy, false);
        self.clauses.push(format!(
            "{} {} {}",
            field,
            op.operator(self.strategy),
            value
        ));
        self
    }

    /// Ordering comparison, if a value is present.
    pub fn compare_opt<V: Into<FilterValue>>(
        self,
        field: &str,
        op: Comparison,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.compare(field, op, value),
            None => self,
        }
    }

    /// Returns `true` if no clause was added.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Join the clauses with `AND`, appending `expr` in parentheses.
    ///
    /// Returns `None` when there is nothing to filter on.
    pub fn build(self, expr: Option<&str>) -> Option<String> {
        let expr = expr.map(str::trim).filter(|e| !e.is_empty());
        let clauses = self.clauses.join(" AND ");

        match (clauses.is_empty(), expr) {
            (true, None) => None,
            (true, Some(expr)) => Some(expr.to_string()),
            (false, None) => Some(clauses),
            (false, Some(expr)) => Some(format!("{} AND ({})", clauses, expr)),
        }
    }
}

impl fmt::Display for FilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" AND "))
    }
}
