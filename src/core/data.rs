//! Staged data held by a changeset.
//!
//! A changeset carries either a single record or an ordered collection of
//! records. The result arity is derived from which of the two is held, so
//! there is no separate flag to fall out of sync.

use super::error::ChangesetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single record: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Whether a changeset represents one record or many.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    One,
    Many,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("one"),
            Self::Many => f.write_str("many"),
        }
    }
}

/// Data staged in a changeset.
///
/// Serializes untagged: a JSON object is one record, a JSON array is many.
///
/// # Example
///
/// ```rust
/// use stagehand::core::{Arity, Data};
/// use serde_json::json;
///
/// let one: Data = serde_json::from_value(json!({"name": "Jane"})).unwrap();
/// assert_eq!(one.arity(), Arity::One);
///
/// let many: Data = serde_json::from_value(json!([{"name": "Jane"}, {"name": "Joe"}])).unwrap();
/// assert_eq!(many.arity(), Arity::Many);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Data {
    One(Record),
    Many(Vec<Record>),
}

impl Default for Data {
    fn default() -> Self {
        Self::One(Record::new())
    }
}

impl Data {
    /// Result arity of this data (pure).
    pub fn arity(&self) -> Arity {
        match self {
            Self::One(_) => Arity::One,
            Self::Many(_) => Arity::Many,
        }
    }

    /// Human readable container name, used in error messages.
    pub fn container(&self) -> &'static str {
        container_name(self.arity())
    }

    /// Convert into a JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::One(record) => Value::Object(record),
            Self::Many(records) => Value::Array(records.into_iter().map(Value::Object).collect()),
        }
    }

    /// Run an operation against the container.
    ///
    /// Operations the container variant does not support fail with
    /// [`ChangesetError::MethodNotSupported`].
    pub fn call(&self, op: DataOp) -> Result<Response, ChangesetError> {
        let unsupported = |op: &DataOp| ChangesetError::MethodNotSupported {
            operation: op.name(),
            container: self.container(),
        };

        match (self, op) {
            (_, DataOp::Len) => Ok(Response::Value(Value::from(self.len()))),
            (_, DataOp::IsEmpty) => Ok(Response::Value(Value::Bool(self.len() == 0))),

            (Self::One(record), DataOp::Get(key)) => Ok(Response::Value(
                record.get(&key).cloned().unwrap_or(Value::Null),
            )),
            (Self::One(record), DataOp::ContainsKey(key)) => {
                Ok(Response::Value(Value::Bool(record.contains_key(&key))))
            }
            (Self::One(record), DataOp::Keys) => Ok(Response::Value(Value::Array(
                record.keys().cloned().map(Value::String).collect(),
            ))),
            (Self::One(record), DataOp::Merge(other)) => {
                let mut merged = record.clone();
                merged.extend(other);
                Ok(Response::One(merged))
            }
            (Self::One(record), DataOp::Without(keys)) => {
                let mut remaining = record.clone();
                for key in &keys {
                    remaining.remove(key);
                }
                Ok(Response::One(remaining))
            }
            (Self::One(record), DataOp::Select(keys)) => Ok(Response::One(
                record
                    .iter()
                    .filter(|(key, _)| keys.contains(key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )),

            (Self::Many(records), DataOp::First) => Ok(optional_record(records.first())),
            (Self::Many(records), DataOp::Last) => Ok(optional_record(records.last())),
            (Self::Many(records), DataOp::Nth(index)) => Ok(optional_record(records.get(index))),
            (Self::Many(records), DataOp::Push(record)) => {
                let mut extended = records.clone();
                extended.push(record);
                Ok(Response::Many(extended))
            }
            (Self::Many(records), DataOp::Concat(others)) => {
                let mut extended = records.clone();
                extended.extend(others);
                Ok(Response::Many(extended))
            }
            (Self::Many(records), DataOp::Take(count)) => Ok(Response::Many(
                records.iter().take(count).cloned().collect(),
            )),
            (Self::Many(records), DataOp::Skip(count)) => Ok(Response::Many(
                records.iter().skip(count).cloned().collect(),
            )),
            (Self::Many(records), DataOp::Reverse) => Ok(Response::Many(
                records.iter().rev().cloned().collect(),
            )),

            (_, op) => Err(unsupported(&op)),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::One(record) => record.len(),
            Self::Many(records) => records.len(),
        }
    }
}

fn optional_record(record: Option<&Record>) -> Response {
    match record {
        Some(record) => Response::One(record.clone()),
        None => Response::Value(Value::Null),
    }
}

fn container_name(arity: Arity) -> &'static str {
    match arity {
        Arity::One => "a single record",
        Arity::Many => "a record collection",
    }
}

impl From<Record> for Data {
    fn from(record: Record) -> Self {
        Self::One(record)
    }
}

impl From<Vec<Record>> for Data {
    fn from(records: Vec<Record>) -> Self {
        Self::Many(records)
    }
}

impl TryFrom<Value> for Data {
    type Error = ChangesetError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(record) => Ok(Self::One(record)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(ChangesetError::step_failed(
                        "stage",
                        format!("expected an object inside the collection, got {other}"),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            other => Err(ChangesetError::step_failed(
                "stage",
                format!("expected an object or an array of objects, got {other}"),
            )),
        }
    }
}

/// Operations a changeset forwards to its underlying data.
#[derive(Clone, Debug, PartialEq)]
pub enum DataOp {
    /// Field value of a single record (null when absent)
    Get(String),
    /// Whether a single record has the field
    ContainsKey(String),
    /// Field names of a single record
    Keys,
    /// Number of fields (one) or records (many)
    Len,
    /// Whether `Len` is zero
    IsEmpty,
    /// Record with the given fields merged over it
    Merge(Record),
    /// Record without the given fields
    Without(Vec<String>),
    /// Record restricted to the given fields
    Select(Vec<String>),
    /// First record of a collection
    First,
    /// Last record of a collection
    Last,
    /// Record at an index of a collection
    Nth(usize),
    /// Collection with a record appended
    Push(Record),
    /// Collection with records appended
    Concat(Vec<Record>),
    /// Leading records of a collection
    Take(usize),
    /// Collection without its leading records
    Skip(usize),
    /// Collection in reverse order
    Reverse,
}

impl DataOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get(_) => "get",
            Self::ContainsKey(_) => "contains_key",
            Self::Keys => "keys",
            Self::Len => "len",
            Self::IsEmpty => "is_empty",
            Self::Merge(_) => "merge",
            Self::Without(_) => "without",
            Self::Select(_) => "select",
            Self::First => "first",
            Self::Last => "last",
            Self::Nth(_) => "nth",
            Self::Push(_) => "push",
            Self::Concat(_) => "concat",
            Self::Take(_) => "take",
            Self::Skip(_) => "skip",
            Self::Reverse => "reverse",
        }
    }
}

/// What the container returned for a [`DataOp`].
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    One(Record),
    Many(Vec<Record>),
    Value(Value),
}

impl Response {
    /// Container kind of the response, if it is a container at all.
    pub fn arity(&self) -> Option<Arity> {
        match self {
            Self::One(_) => Some(Arity::One),
            Self::Many(_) => Some(Arity::Many),
            Self::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::One(record) => Data::One(record).into_value(),
            Self::Many(records) => Data::Many(records).into_value(),
            Self::Value(value) => value,
        }
    }
}
