//! Forwarding operations to the staged data.
//!
//! A changeset answers the [`DataOp`] surface by handing the operation to
//! its data. When the data returns a container of its own kind the answer
//! is re-wrapped as a changeset (keeping type, target, options and pipe);
//! anything else comes back as a plain JSON value.

use super::Changeset;
use crate::core::{ChangesetError, DataOp, Record, Response};
use serde_json::Value;

/// Result of a forwarded operation.
#[derive(Clone, Debug)]
pub enum Forwarded {
    Changeset(Changeset),
    Value(Value),
}

impl Forwarded {
    pub fn into_changeset(self) -> Option<Changeset> {
        match self {
            Self::Changeset(changeset) => Some(changeset),
            Self::Value(_) => None,
        }
    }

    /// The plain value; a changeset yields its staged data.
    pub fn into_value(self) -> Value {
        match self {
            Self::Changeset(changeset) => changeset.data.clone().into_value(),
            Self::Value(value) => value,
        }
    }
}

impl Changeset {
    /// Forward `op` to the staged data.
    ///
    /// Errors from the data container are returned unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stagehand::changeset::{ChangesetType, Forwarded};
    /// use stagehand::core::{ChangesetError, DataOp};
    /// use serde_json::json;
    ///
    /// let changeset = ChangesetType::create("NewUser")
    ///     .changeset("users")
    ///     .stage_value(json!({"name": "Jane"}))
    ///     .unwrap();
    ///
    /// // Same container kind: still a changeset.
    /// let merged = changeset.forward(DataOp::Merge(Default::default())).unwrap();
    /// assert!(matches!(merged, Forwarded::Changeset(_)));
    ///
    /// // Plain answers come back as values.
    /// let name = changeset.forward(DataOp::Get("name".into())).unwrap();
    /// assert_eq!(name.into_value(), json!("Jane"));
    ///
    /// // Unsupported by a single record.
    /// assert!(matches!(
    ///     changeset.forward(DataOp::Reverse),
    ///     Err(ChangesetError::MethodNotSupported { .. })
    /// ));
    /// ```
    pub fn forward(&self, op: DataOp) -> Result<Forwarded, ChangesetError> {
        let response = self.data.call(op)?;
        let same_container = response.arity() == Some(self.result_arity());

        Ok(match response {
            Response::One(record) if same_container => Forwarded::Changeset(self.stage(record)),
            Response::Many(records) if same_container => {
                Forwarded::Changeset(self.stage(records))
            }
            other => Forwarded::Value(other.into_value()),
        })
    }

    fn forward_value(&self, op: DataOp) -> Result<Value, ChangesetError> {
        self.forward(op).map(Forwarded::into_value)
    }

    fn forward_changeset(&self, op: DataOp) -> Result<Changeset, ChangesetError> {
        let operation = op.name();
        self.forward(op)?
            .into_changeset()
            .ok_or_else(|| ChangesetError::MethodNotSupported {
                operation,
                container: self.data.container(),
            })
    }

    fn forward_record(&self, op: DataOp) -> Result<Option<Record>, ChangesetError> {
        match self.forward_value(op)? {
            Value::Object(record) => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    /// Staged field value (null when absent). Single record only.
    pub fn get(&self, key: &str) -> Result<Value, ChangesetError> {
        self.forward_value(DataOp::Get(key.to_string()))
    }

    /// Single record only.
    pub fn contains_key(&self, key: &str) -> Result<bool, ChangesetError> {
        Ok(self
            .forward_value(DataOp::ContainsKey(key.to_string()))?
            .as_bool()
            .unwrap_or(false))
    }

    /// Staged field names. Single record only.
    pub fn keys(&self) -> Result<Vec<String>, ChangesetError> {
        Ok(match self.forward_value(DataOp::Keys)? {
            Value::Array(keys) => keys
                .into_iter()
                .filter_map(|key| key.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Number of staged fields (one) or records (many).
    pub fn len(&self) -> Result<usize, ChangesetError> {
        Ok(self
            .forward_value(DataOp::Len)?
            .as_u64()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, ChangesetError> {
        Ok(self
            .forward_value(DataOp::IsEmpty)?
            .as_bool()
            .unwrap_or(true))
    }

    /// Changeset with `fields` merged into the staged record.
    pub fn merge(&self, fields: Record) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Merge(fields))
    }

    /// Changeset without the given staged fields.
    pub fn without<I, K>(&self, keys: I) -> Result<Changeset, ChangesetError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.forward_changeset(DataOp::Without(keys.into_iter().map(Into::into).collect()))
    }

    /// Changeset restricted to the given staged fields.
    pub fn select<I, K>(&self, keys: I) -> Result<Changeset, ChangesetError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.forward_changeset(DataOp::Select(keys.into_iter().map(Into::into).collect()))
    }

    /// First staged record of a collection.
    pub fn first(&self) -> Result<Option<Record>, ChangesetError> {
        self.forward_record(DataOp::First)
    }

    pub fn last(&self) -> Result<Option<Record>, ChangesetError> {
        self.forward_record(DataOp::Last)
    }

    pub fn nth(&self, index: usize) -> Result<Option<Record>, ChangesetError> {
        self.forward_record(DataOp::Nth(index))
    }

    /// Changeset with `record` appended to the staged collection.
    pub fn push(&self, record: Record) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Push(record))
    }

    pub fn concat(&self, records: Vec<Record>) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Concat(records))
    }

    pub fn take(&self, count: usize) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Take(count))
    }

    pub fn skip(&self, count: usize) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Skip(count))
    }

    pub fn reverse(&self) -> Result<Changeset, ChangesetError> {
        self.forward_changeset(DataOp::Reverse)
    }
}
