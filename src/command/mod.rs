//! Boundary to the persistence command layer.
//!
//! The crate never executes persistence itself. A changeset hands its
//! command kind, target and result arity to a [`CommandResolver`] and runs
//! whatever [`Command`] comes back.

use crate::changeset::Changeset;
use crate::core::{Arity, ChangesetError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Symbolic command tag a changeset type resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Create,
    Update,
    Delete,
    Custom(String),
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Opaque handle to a persistence destination, such as a relation name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Options passed to the resolver.
///
/// `result` always reflects the changeset's current arity; `extra` holds
/// the changeset type's command defaults.
///
/// # Example
///
/// ```rust
/// use stagehand::command::CommandOptions;
/// use stagehand::core::Arity;
/// use serde_json::json;
///
/// let options = CommandOptions::new(Arity::Many).with("mapper", json!(false));
///
/// assert_eq!(
///     serde_json::to_value(&options).unwrap(),
///     json!({"result": "many", "mapper": false})
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandOptions {
    pub result: Arity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandOptions {
    pub fn new(result: Arity) -> Self {
        Self {
            result,
            extra: Map::new(),
        }
    }

    /// Layer `defaults` under the result arity.
    pub fn with_defaults(result: Arity, defaults: &Map<String, Value>) -> Self {
        let mut extra = defaults.clone();
        extra.remove("result");
        Self { result, extra }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// An executable persistence command.
pub trait Command {
    type Output;

    fn execute(&self, changeset: &Changeset) -> Self::Output;
}

/// Produces commands for changesets.
///
/// Closures of the right shape are resolvers too.
pub trait CommandResolver {
    type Command: Command;

    fn resolve(
        &self,
        kind: &CommandKind,
        target: &Target,
        options: &CommandOptions,
    ) -> Result<Self::Command, ChangesetError>;
}

impl<F, C> CommandResolver for F
where
    F: Fn(&CommandKind, &Target, &CommandOptions) -> Result<C, ChangesetError>,
    C: Command,
{
    type Command = C;

    fn resolve(
        &self,
        kind: &CommandKind,
        target: &Target,
        options: &CommandOptions,
    ) -> Result<C, ChangesetError> {
        self(kind, target, options)
    }
}
