//! Standard record steps.
//!
//! These are registered under their function names by
//! [`StepLibrary::standard`](super::StepLibrary::standard).

use super::{Step, StepLibrary};
use crate::core::{ChangesetError, Record};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Merge the object stored under `key` into the record.
///
/// With `prefix`, merged fields are named `{key}_{field}`. A missing key
/// leaves the record untouched; a non-object value is an error.
pub fn unwrap(key: impl Into<String>, prefix: bool) -> Step {
    let key = key.into();
    Step::new("unwrap", move |mut record: Record| {
        let nested = match record.remove(&key) {
            None => return Ok(record),
            Some(Value::Object(nested)) => nested,
            Some(other) => {
                return Err(ChangesetError::step_failed(
                    "unwrap",
                    format!("'{key}' holds {other}, not an object"),
                ))
            }
        };

        for (field, value) in nested {
            let field = if prefix {
                format!("{key}_{field}")
            } else {
                field
            };
            record.insert(field, value);
        }
        Ok(record)
    })
}

/// Rename keys according to `(from, to)` pairs. Absent keys are skipped.
pub fn rename_keys<I, K, V>(mapping: I) -> Step
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mapping: Vec<(String, String)> = mapping
        .into_iter()
        .map(|(from, to)| (from.into(), to.into()))
        .collect();

    Step::new("rename_keys", move |mut record: Record| {
        for (from, to) in &mapping {
            if let Some(value) = record.remove(from) {
                record.insert(to.clone(), value);
            }
        }
        Ok(record)
    })
}

/// Keep only the listed keys.
pub fn accept_keys<I, K>(keys: I) -> Step
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Step::new("accept_keys", move |record: Record| {
        Ok(record
            .into_iter()
            .filter(|(key, _)| keys.contains(key))
            .collect())
    })
}

/// Drop the listed keys.
pub fn reject_keys<I, K>(keys: I) -> Step
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Step::new("reject_keys", move |record: Record| {
        Ok(record
            .into_iter()
            .filter(|(key, _)| !keys.contains(key))
            .collect())
    })
}

/// Set `created_at` and `updated_at` to the same current UTC instant.
pub fn add_timestamps() -> Step {
    Step::new("add_timestamps", |mut record: Record| {
        let now = Value::String(now());
        record.insert("created_at".to_string(), now.clone());
        record.insert("updated_at".to_string(), now);
        Ok(record)
    })
}

/// Set `updated_at` to the current UTC instant.
pub fn touch() -> Step {
    Step::new("touch", |mut record: Record| {
        record.insert("updated_at".to_string(), Value::String(now()));
        Ok(record)
    })
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn register(library: StepLibrary) -> StepLibrary {
    library
        .register_with("unwrap", |args: &Value| {
            let (key, prefix) = unwrap_args(args)?;
            Ok(unwrap(key, prefix))
        })
        .register_with("rename_keys", |args: &Value| {
            let mapping = args.as_object().ok_or_else(|| invalid("rename_keys", args))?;
            let pairs = mapping
                .iter()
                .map(|(from, to)| {
                    to.as_str()
                        .map(|to| (from.clone(), to.to_string()))
                        .ok_or_else(|| invalid("rename_keys", args))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rename_keys(pairs))
        })
        .register_with("accept_keys", |args: &Value| {
            Ok(accept_keys(key_list("accept_keys", args)?))
        })
        .register_with("reject_keys", |args: &Value| {
            Ok(reject_keys(key_list("reject_keys", args)?))
        })
        .register("add_timestamps", add_timestamps())
        .register("touch", touch())
}

fn unwrap_args(args: &Value) -> Result<(String, bool), ChangesetError> {
    match args {
        Value::String(key) => Ok((key.clone(), false)),
        Value::Object(options) => {
            let key = options
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("unwrap", args))?;
            let prefix = options
                .get("prefix")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok((key.to_string(), prefix))
        }
        _ => Err(invalid("unwrap", args)),
    }
}

fn key_list(step: &str, args: &Value) -> Result<Vec<String>, ChangesetError> {
    args.as_array()
        .ok_or_else(|| invalid(step, args))?
        .iter()
        .map(|key| {
            key.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(step, args))
        })
        .collect()
}

fn invalid(step: &str, args: &Value) -> ChangesetError {
    ChangesetError::step_failed(step, format!("invalid arguments {args}"))
}
