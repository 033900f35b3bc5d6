//! Changeset error types.

use super::data::Arity;
use thiserror::Error;

/// Errors that can occur while staging, transforming or committing changesets.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ChangesetError {
    /// The accessor expects a different result arity than the staged data has
    #[error("Expected data with result arity '{expected}', found '{actual}'")]
    ArityMismatch { expected: Arity, actual: Arity },

    /// The underlying data container does not support a forwarded operation
    #[error("Operation '{operation}' is not supported by {container}")]
    MethodNotSupported {
        operation: &'static str,
        container: &'static str,
    },

    /// No step is registered under the requested name
    #[error("No step registered under the name '{name}'")]
    UnknownStep { name: String },

    /// A step accessed a dependency that is not present in its context
    #[error("Dependency '{name}' is not available in the changeset options")]
    MissingDependency { name: String },

    /// A dependency exists but holds a value of another type
    #[error("Dependency '{name}' is not a {expected}")]
    DependencyType { name: String, expected: &'static str },

    /// A step rejected its input
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    /// Several step declarations failed; listed in declaration order
    #[error("{} step declarations failed: {}", .0.len(), summarize(.0))]
    InvalidDeclaration(Vec<ChangesetError>),

    /// No association name was given and none could be inferred
    #[error("Cannot infer association name: {0}")]
    UnresolvedAssociation(String),

    /// The command resolver could not produce a command
    #[error("Command unavailable: {0}")]
    CommandUnavailable(String),
}

impl ChangesetError {
    pub(crate) fn step_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

fn summarize(errors: &[ChangesetError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
