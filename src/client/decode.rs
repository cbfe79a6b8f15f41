//! Decoding response pages into rows.
//!
//! A [`Decode`] implementation turns one page of a response into a batch of
//! rows. Endpoints differ in where they put their rows: most use a
//! `results` array, symbol/assessment lookups group rows under
//! `results[*].data`, and OData endpoints use `value`. Closures of the form
//! `Fn(&RawResponse) -> Result<Vec<T>>` also implement [`Decode`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::RawResponse;
use crate::{Error, Result};

/// A single untyped row: column name to value, in server order.
pub type Record = Map<String, Value>;

/// Turns a response page into rows.
pub trait Decode<T> {
    /// Decode the rows of one page.
    fn decode(&self, response: &RawResponse) -> Result<Vec<T>>;
}

impl<T, F> Decode<T> for F
where
    F: Fn(&RawResponse) -> Result<Vec<T>>,
{
    fn decode(&self, response: &RawResponse) -> Result<Vec<T>> {
        self(response)
    }
}

/// Rows from the top-level `results` array.
#[derive(Debug, Clone, Copy, Default)]
pub struct Results;

impl<T: DeserializeOwned> Decode<T> for Results {
    fn decode(&self, response: &RawResponse) -> Result<Vec<T>> {
        let body: Value = response.json()?;
        let rows = take_array(body, "results")?;
        rows_into(rows)
    }
}

/// Rows grouped under a record path inside each `results` entry.
///
/// Each nested row inherits the `meta` fields of its parent, and nested
/// objects are flattened into `.`-joined column names. Column names
/// starting with `strip_prefix` lose that prefix.
///
/// ```text
/// {"results": [{"symbol": "PCAAS00", "data": [{"bate": "c", "value": 1.5}]}]}
/// => [{"bate": "c", "value": 1.5, "symbol": "PCAAS00"}]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NestedResults {
    /// Key of the nested row array in each result
    pub record_path: &'static str,
    /// Parent fields copied onto every nested row
    pub meta: &'static [&'static str],
    /// Column prefix removed after flattening
    pub strip_prefix: Option<&'static str>,
}

impl NestedResults {
    /// Flatten `results[*].<record_path>[*]`, carrying `meta` fields.
    pub const fn new(record_path: &'static str, meta: &'static [&'static str]) -> Self {
        Self {
            record_path,
            meta,
            strip_prefix: None,
        }
    }

    /// Remove a column prefix after flattening.
    pub const fn strip_prefix(mut self, prefix: &'static str) -> Self {
        self.strip_prefix = Some(prefix);
        self
    }

    /// Flatten one page into untyped records.
    pub fn records(&self, response: &RawResponse) -> Result<Vec<Record>> {
        let body: Value = response.json()?;
        let mut rows = Vec::new();

        for result in take_array(body, "results")? {
            let Value::Object(mut parent) = result else {
                return Err(Error::Decode("results entry is not an object".to_string()));
            };

            let children = match parent.remove(self.record_path) {
                Some(Value::Array(children)) => children,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(Error::Decode(format!(
                        "`{}` is not an array",
                        self.record_path
                    )))
                }
            };

            for child in children {
                let Value::Object(child) = child else {
                    return Err(Error::Decode(format!(
                        "`{}` entry is not an object",
                        self.record_path
                    )));
                };

                let mut row = Record::new();
                flatten_into(&mut row, None, child, self.strip_prefix);
                for key in self.meta {
                    row.insert(
                        (*key).to_string(),
                        parent.get(*key).cloned().unwrap_or(Value::Null),
                    );
                }
                rows.push(row);
            }
        }

        Ok(rows)
    }
}

impl<T: DeserializeOwned> Decode<T> for NestedResults {
    fn decode(&self, response: &RawResponse) -> Result<Vec<T>> {
        let rows = self.records(response)?;
        rows_into(rows.into_iter().map(Value::Object).collect())
    }
}

/// Rows from an OData `value` array, with `@odata` annotations dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ODataValue;

impl<T: DeserializeOwned> Decode<T> for ODataValue {
    fn decode(&self, response: &RawResponse) -> Result<Vec<T>> {
        let body: Value = response.json()?;
        let rows = take_array(body, "value")?
            .into_iter()
            .map(|row| match row {
                Value::Object(mut obj) => {
                    obj.retain(|k, _| !k.contains("@odata"));
                    Value::Object(obj)
                }
                other => other,
            })
            .collect();
        rows_into(rows)
    }
}

fn take_array(body: Value, key: &str) -> Result<Vec<Value>> {
    let Value::Object(mut body) = body else {
        return Err(Error::Decode("response body is not a JSON object".to_string()));
    };
    match body.remove(key) {
        Some(Value::Array(rows)) => Ok(rows),
        Some(Value::Null) => Ok(Vec::new()),
        Some(_) => Err(Error::Decode(format!("`{}` is not an array", key))),
        None => Err(Error::Decode(format!("response has no `{}` field", key))),
    }
}

fn rows_into<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Error::from))
        .collect()
}

fn flatten_into(row: &mut Record, prefix: Option<&str>, obj: Record, strip: Option<&str>) {
    for (key, value) in obj {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(row, Some(&name), inner, strip),
            value => {
                let name = match strip.and_then(|s| name.strip_prefix(s)) {
                    Some(stripped) => stripped.to_string(),
                    None => name,
                };
                row.insert(name, value);
            }
        }
    }
}
