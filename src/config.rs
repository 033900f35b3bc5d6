//! Declaring changeset types from configuration.
//!
//! A [`ChangesetTypeConfig`] describes a type the same way the declaration
//! DSL does: a command kind, command defaults and an ordered list of named
//! steps. The steps form one declared pipe.
//!
//! # Example
//!
//! ```rust
//! use stagehand::changeset::ChangesetType;
//! use stagehand::config::ChangesetTypeConfig;
//! use stagehand::pipe::StepLibrary;
//! use serde_json::json;
//!
//! let config: ChangesetTypeConfig = serde_json::from_value(json!({
//!     "name": "NewUser",
//!     "command": "create",
//!     "steps": [
//!         {"name": "unwrap", "args": "address"},
//!         {"name": "add_timestamps"}
//!     ]
//! }))
//! .unwrap();
//!
//! let kind = ChangesetType::from_config(&config, StepLibrary::standard()).unwrap();
//! assert_eq!(kind.pipes()[0].labels(), vec!["unwrap", "add_timestamps"]);
//! ```

use crate::changeset::ChangesetType;
use crate::command::CommandKind;
use crate::core::ChangesetError;
use crate::pipe::StepLibrary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named step with its declaration arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Serializable description of a changeset type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangesetTypeConfig {
    pub name: String,
    pub command: CommandKind,
    #[serde(default)]
    pub command_defaults: Map<String, Value>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl ChangesetType {
    /// Build a type from configuration, resolving steps in `library`.
    ///
    /// Configured steps become a single declared pipe; an empty step list
    /// declares nothing.
    pub fn from_config(
        config: &ChangesetTypeConfig,
        library: StepLibrary,
    ) -> Result<Self, ChangesetError> {
        let kind = ChangesetType::new(config.name.clone(), config.command.clone())
            .with_library(library)
            .with_command_defaults(config.command_defaults.clone());

        if config.steps.is_empty() {
            return Ok(kind);
        }

        tracing::debug!(
            changeset = %config.name,
            steps = config.steps.len(),
            "declaring configured steps"
        );

        kind.declare_dsl(|dsl| {
            config
                .steps
                .iter()
                .fold(dsl, |dsl, step| dsl.call(&step.name, step.args.clone()))
        })
    }
}
