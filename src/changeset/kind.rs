//! Changeset types: what a subclass declares, as a value.

use super::Changeset;
use crate::command::{CommandKind, Target};
use crate::core::{ChangesetError, Context, Record};
use crate::pipe::{Pipe, PipeBuilder, Step, StepLibrary};
use crate::registry::StepRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A changeset type: command kind, named-step library and declared pipes.
///
/// Types are built up by value and then shared by their instances behind
/// an `Arc`. Subtypes copy their parent's declarations when they are
/// created; later declarations only affect the type they are made on.
///
/// # Example
///
/// ```rust
/// use stagehand::changeset::ChangesetType;
/// use stagehand::command::CommandKind;
/// use serde_json::json;
///
/// let new_user = ChangesetType::new("NewUser", CommandKind::Create)
///     .declare_dsl(|dsl| dsl.call("unwrap", json!({"key": "address", "prefix": true})))
///     .unwrap();
///
/// let new_admin = new_user.subtype("NewAdmin").declare_fn(|_ctx, mut record| {
///     record.insert("admin".to_string(), json!(true));
///     Ok(record)
/// });
///
/// assert_eq!(new_user.pipes().len(), 1);
/// assert_eq!(new_admin.pipes().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct ChangesetType {
    name: String,
    command_kind: CommandKind,
    library: StepLibrary,
    registry: StepRegistry,
    command_defaults: Map<String, Value>,
}

impl ChangesetType {
    /// Create a type with the standard step library and no declarations.
    pub fn new(name: impl Into<String>, command_kind: CommandKind) -> Self {
        Self {
            name: name.into(),
            command_kind,
            library: StepLibrary::standard(),
            registry: StepRegistry::new(),
            command_defaults: Map::new(),
        }
    }

    pub fn create(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Create)
    }

    pub fn update(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Update)
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Delete)
    }

    /// Derive a subtype holding a copy of this type's declarations.
    pub fn subtype(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_kind: self.command_kind.clone(),
            library: self.library.clone(),
            registry: self.registry.inherit(),
            command_defaults: self.command_defaults.clone(),
        }
    }

    /// Declare a pipe built by a DSL body.
    ///
    /// The body runs against a fresh [`PipeBuilder`] over this type's
    /// library. Unknown step names fail the declaration.
    pub fn declare_dsl<F>(self, body: F) -> Result<Self, ChangesetError>
    where
        F: FnOnce(PipeBuilder<'_>) -> PipeBuilder<'_>,
    {
        let pipe = body(PipeBuilder::new(&self.library)).build()?;
        Ok(self.declare_pipe(pipe))
    }

    /// Declare a function step; it is bound to each instance's context.
    pub fn declare_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        let label = format!("{}#map", self.name);
        self.declare_pipe(Pipe::from_step(Step::contextual(label, f)))
    }

    /// Declare an already built pipe.
    pub fn declare_pipe(mut self, pipe: Pipe) -> Self {
        self.registry = self.registry.declare(pipe);
        self
    }

    /// Replace the named-step library.
    pub fn with_library(mut self, library: StepLibrary) -> Self {
        self.library = library;
        self
    }

    /// Add a named step to this type's library.
    pub fn register_step(mut self, name: impl Into<String>, step: Step) -> Self {
        self.library = self.library.register(name, step);
        self
    }

    /// Set options passed to the command resolver alongside the arity.
    pub fn with_command_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.command_defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_kind(&self) -> &CommandKind {
        &self.command_kind
    }

    pub fn library(&self) -> &StepLibrary {
        &self.library
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Declared pipes in declaration order.
    pub fn pipes(&self) -> &[Pipe] {
        self.registry.pipes()
    }

    pub fn command_defaults(&self) -> &Map<String, Value> {
        &self.command_defaults
    }

    /// Compose every declared pipe, each bound to `context`.
    pub fn default_pipe(&self, context: &Context) -> Pipe {
        self.registry.default_pipe(context)
    }

    /// Freeze this type and create an empty changeset for `target`.
    pub fn changeset(self, target: impl Into<Target>) -> Changeset {
        Changeset::new(Arc::new(self), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => panic!("expected an object"),
        }
    }

    fn set(
        key: &'static str,
        value: Value,
    ) -> impl Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static {
        move |_: &Context, mut record: Record| {
            record.insert(key.to_string(), value.clone());
            Ok(record)
        }
    }

    #[test]
    fn shortcuts_set_command_kind() {
        assert_eq!(ChangesetType::create("A").command_kind(), &CommandKind::Create);
        assert_eq!(ChangesetType::update("A").command_kind(), &CommandKind::Update);
        assert_eq!(ChangesetType::delete("A").command_kind(), &CommandKind::Delete);
    }

    #[test]
    fn dsl_and_fn_declarations_share_one_ordered_list() {
        let kind = ChangesetType::create("NewUser")
            .declare_fn(set("first", json!(1)))
            .declare_dsl(|dsl| dsl.call("rename_keys", json!({"first": "renamed"})))
            .unwrap()
            .declare_fn(set("first", json!(2)));

        let pipe = kind.default_pipe(&Context::default());

        assert_eq!(kind.pipes().len(), 3);
        assert_eq!(
            pipe.call(Record::new()).unwrap(),
            record(json!({"renamed": 1, "first": 2}))
        );
    }

    #[test]
    fn dsl_declaration_fails_on_unknown_step() {
        let result = ChangesetType::create("NewUser").declare_dsl(|dsl| dsl.step("missing"));

        assert!(matches!(result, Err(ChangesetError::UnknownStep { .. })));
    }

    #[test]
    fn subtype_copies_declarations() {
        let parent = ChangesetType::create("Parent").declare_fn(set("one", json!(1)));
        let child = parent.subtype("Child");

        assert_eq!(child.pipes(), parent.pipes());
        assert_eq!(child.command_kind(), parent.command_kind());
        assert_eq!(child.name(), "Child");
    }

    #[test]
    fn subtype_declarations_do_not_reach_parent() {
        let parent = ChangesetType::create("Parent").declare_fn(set("one", json!(1)));
        let child = parent.subtype("Child").declare_fn(set("two", json!(2)));
        let parent = parent.declare_fn(set("three", json!(3)));

        assert_eq!(parent.pipes().len(), 2);
        assert_eq!(child.pipes().len(), 2);
        assert_eq!(child.pipes()[0], parent.pipes()[0]);
        assert_ne!(child.pipes()[1], parent.pipes()[1]);
    }

    #[test]
    fn register_step_extends_library() {
        let kind = ChangesetType::create("NewUser").register_step(
            "mark",
            Step::new("mark", |record: Record| Ok(record)),
        );

        assert!(kind.library().contains("mark"));
        assert!(kind.library().contains("unwrap"));
        assert!(kind
            .clone()
            .with_library(StepLibrary::new())
            .library()
            .resolve("unwrap")
            .is_err());
    }

    #[test]
    fn declare_fn_labels_steps_with_type_name() {
        let kind = ChangesetType::create("NewUser").declare_fn(set("one", json!(1)));
        assert_eq!(kind.pipes()[0].labels(), vec!["NewUser#map"]);
    }
}
