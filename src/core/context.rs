//! Options and the per-instance context steps can bind to.

use super::error::ChangesetError;
use crate::command::Target;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type Dependency = Arc<dyn Any + Send + Sync>;

/// Free-form changeset options.
///
/// Options are injected dependencies consumed by custom steps. Values are
/// type-erased and shared, so cloning options is cheap and never copies
/// the dependencies themselves.
///
/// # Example
///
/// ```rust
/// use stagehand::core::Options;
///
/// let options = Options::new().with("author", "jane".to_string());
///
/// assert_eq!(options.get::<String>("author").unwrap(), "jane");
/// assert!(options.get::<String>("editor").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Options {
    entries: BTreeMap<String, Dependency>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return new options with `name` set to `value`.
    pub fn with<T>(&self, name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut entries = self.entries.clone();
        entries.insert(name.into(), Arc::new(value));
        Self { entries }
    }

    /// Return new options with `other` layered over these.
    pub fn merge(&self, other: &Options) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(
            other
                .entries
                .iter()
                .map(|(name, value)| (name.clone(), Arc::clone(value))),
        );
        Self { entries }
    }

    /// Look up a dependency by name and type.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, ChangesetError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ChangesetError::MissingDependency {
                name: name.to_string(),
            })?;

        (**entry)
            .downcast_ref::<T>()
            .ok_or_else(|| ChangesetError::DependencyType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Options {
    /// Same names holding the same shared values.
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((a, x), (b, y))| a == b && Arc::ptr_eq(x, y))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// What a bound step sees of the changeset it belongs to.
///
/// Binding a step captures the context at that moment. Dependencies are
/// only looked up when the step runs, so a missing dependency surfaces as
/// [`ChangesetError::MissingDependency`] when the step runs, never from `bind`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    target: Target,
    options: Options,
}

impl Context {
    pub fn new(target: Target, options: Options) -> Self {
        Self { target, options }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Shorthand for `self.options().get(name)`.
    pub fn dependency<T: Any>(&self, name: &str) -> Result<&T, ChangesetError> {
        self.options.get(name)
    }
}
