//! Named-step lookup and the declaration mini-DSL.

use super::{functions, Pipe, Step};
use crate::core::{ChangesetError, Context, Record};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builds a step from its declaration arguments (`Value::Null` when none).
pub type StepFactory = Arc<dyn Fn(&Value) -> Result<Step, ChangesetError> + Send + Sync>;

/// Lookup table from step name to step factory.
///
/// Each changeset type owns one library; named steps used by `map_steps`
/// and by the declaration DSL resolve against it.
///
/// # Example
///
/// ```rust
/// use stagehand::pipe::StepLibrary;
/// use serde_json::json;
///
/// let library = StepLibrary::standard();
/// let unwrap = library.resolve_with("unwrap", &json!("address")).unwrap();
/// assert_eq!(unwrap.label(), "unwrap");
///
/// assert!(library.resolve("no_such_step").is_err());
/// ```
#[derive(Clone, Default)]
pub struct StepLibrary {
    factories: BTreeMap<String, StepFactory>,
}

impl StepLibrary {
    /// Create a library with no steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding the steps from [`functions`].
    pub fn standard() -> Self {
        functions::register(Self::new())
    }

    /// Register a step that takes no arguments.
    pub fn register(mut self, name: impl Into<String>, step: Step) -> Self {
        self.factories
            .insert(name.into(), Arc::new(move |_: &Value| Ok(step.clone())));
        self
    }

    /// Register a step built from declaration arguments.
    pub fn register_with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Step, ChangesetError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Return a library with `other`'s steps layered over these.
    pub fn extend(&self, other: &StepLibrary) -> Self {
        let mut factories = self.factories.clone();
        factories.extend(
            other
                .factories
                .iter()
                .map(|(name, factory)| (name.clone(), Arc::clone(factory))),
        );
        Self { factories }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolve a step without arguments.
    pub fn resolve(&self, name: &str) -> Result<Step, ChangesetError> {
        self.resolve_with(name, &Value::Null)
    }

    /// Resolve a step with declaration arguments.
    pub fn resolve_with(&self, name: &str, args: &Value) -> Result<Step, ChangesetError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ChangesetError::UnknownStep {
                name: name.to_string(),
            })?;
        factory(args)
    }

    /// Resolve each name and compose the steps in order.
    pub fn pipe<I, S>(&self, names: I) -> Result<Pipe, ChangesetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| self.resolve(name.as_ref()))
            .collect()
    }
}

impl fmt::Debug for StepLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Fluent builder behind declaration bodies.
///
/// Every lookup is validated independently, so [`PipeBuilder::build`]
/// reports all failing step declarations at once instead of the first.
pub struct PipeBuilder<'a> {
    library: &'a StepLibrary,
    steps: Vec<Validation<Step, NonEmptyVec<ChangesetError>>>,
}

impl<'a> PipeBuilder<'a> {
    pub fn new(library: &'a StepLibrary) -> Self {
        Self {
            library,
            steps: Vec::new(),
        }
    }

    /// Add a named step without arguments.
    pub fn step(self, name: &str) -> Self {
        self.call(name, Value::Null)
    }

    /// Add a named step with arguments.
    pub fn call(mut self, name: &str, args: Value) -> Self {
        let step = match self.library.resolve_with(name, &args) {
            Ok(step) => Validation::success(step),
            Err(error) => Validation::fail(error),
        };
        self.steps.push(step);
        self
    }

    /// Add an anonymous pure step.
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        self.steps.push(Validation::success(Step::anonymous(f)));
        self
    }

    /// Add an anonymous step that reads the context it gets bound to.
    pub fn map_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        self.steps
            .push(Validation::success(Step::contextual("<anonymous>", f)));
        self
    }

    /// Validate every declared step, accumulating all failures.
    pub fn validate(self) -> Validation<Pipe, NonEmptyVec<ChangesetError>> {
        Validation::all_vec(self.steps).map(|steps| steps.into_iter().collect())
    }

    /// Build the pipe.
    ///
    /// A single failure is returned as is; several are wrapped in
    /// [`ChangesetError::InvalidDeclaration`] in declaration order.
    pub fn build(self) -> Result<Pipe, ChangesetError> {
        match self.validate() {
            Validation::Success(pipe) => Ok(pipe),
            Validation::Failure(errors) => {
                let mut errors: Vec<ChangesetError> = errors.iter().cloned().collect();
                if errors.len() == 1 {
                    Err(errors.remove(0))
                } else {
                    Err(ChangesetError::InvalidDeclaration(errors))
                }
            }
        }
    }
}
