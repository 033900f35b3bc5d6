//! Transform steps: the units a pipe is made of.

use super::Pipe;
use crate::core::{ChangesetError, Context, Record};
use std::fmt;
use std::sync::Arc;

/// A step that needs nothing but its input.
pub type StepFn = Arc<dyn Fn(Record) -> Result<Record, ChangesetError> + Send + Sync>;

/// A step that reads dependencies from the context it is bound to.
pub type ContextStepFn =
    Arc<dyn Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Pure(StepFn),
    Contextual(ContextStepFn),
    Bound(ContextStepFn, Context),
    Nested(Arc<Pipe>),
}

/// A single pure transformation of a record.
///
/// Steps are cheap to clone (their function is shared). A contextual step
/// must be bound to a [`Context`] to see any dependencies; an unbound one
/// runs against an empty context and fails when it reaches for a dependency.
///
/// # Example
///
/// ```rust
/// use stagehand::core::{Context, Options, Record};
/// use stagehand::pipe::Step;
/// use serde_json::json;
///
/// let stamp = Step::contextual("stamp", |ctx, mut record| {
///     let author = ctx.dependency::<String>("author")?;
///     record.insert("author".to_string(), json!(author));
///     Ok(record)
/// });
///
/// // Unbound: the dependency is missing, but only once the step runs.
/// assert!(stamp.call(Record::new()).is_err());
///
/// let context = Context::new("users".into(), Options::new().with("author", "jane".to_string()));
/// let record = stamp.bind(&context).call(Record::new()).unwrap();
/// assert_eq!(record["author"], json!("jane"));
/// ```
#[derive(Clone)]
pub struct Step {
    label: Arc<str>,
    body: Body,
}

impl Step {
    /// Create a named step from a pure function.
    pub fn new<F>(label: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            body: Body::Pure(Arc::new(f)),
        }
    }

    /// Create an unnamed step from a pure function.
    pub fn anonymous<F>(f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        Self::new("<anonymous>", f)
    }

    /// Create a step that reads its bound context.
    pub fn contextual<F>(label: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            body: Body::Contextual(Arc::new(f)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether binding would change this step.
    pub fn requires_context(&self) -> bool {
        match &self.body {
            Body::Contextual(_) => true,
            Body::Nested(pipe) => pipe.requires_context(),
            Body::Pure(_) | Body::Bound(..) => false,
        }
    }

    /// Close this step over `context`.
    ///
    /// Pure and already-bound steps pass through unchanged, so binding
    /// twice is the same as binding once.
    pub fn bind(&self, context: &Context) -> Self {
        let body = match &self.body {
            Body::Contextual(f) => Body::Bound(Arc::clone(f), context.clone()),
            Body::Nested(pipe) if pipe.requires_context() => {
                Body::Nested(Arc::new(pipe.bind(context)))
            }
            other => other.clone(),
        };

        Self {
            label: Arc::clone(&self.label),
            body,
        }
    }

    /// Apply the step to a record.
    pub fn call(&self, record: Record) -> Result<Record, ChangesetError> {
        tracing::trace!(step = %self.label, "applying step");
        match &self.body {
            Body::Pure(f) => f(record),
            Body::Contextual(f) => f(&Context::default(), record),
            Body::Bound(f, context) => f(context, record),
            Body::Nested(pipe) => pipe.call(record),
        }
    }

    /// Whether both steps run the same function, bound to the same context.
    pub fn ptr_eq(&self, other: &Step) -> bool {
        match (&self.body, &other.body) {
            (Body::Pure(a), Body::Pure(b)) => Arc::ptr_eq(a, b),
            (Body::Contextual(a), Body::Contextual(b)) => Arc::ptr_eq(a, b),
            (Body::Bound(a, x), Body::Bound(b, y)) => Arc::ptr_eq(a, b) && x == y,
            (Body::Nested(a), Body::Nested(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.ptr_eq(other)
    }
}

impl From<Pipe> for Step {
    /// Run a whole pipe as one step.
    fn from(pipe: Pipe) -> Self {
        Self {
            label: "pipe".into(),
            body: Body::Nested(Arc::new(pipe)),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.body {
            Body::Pure(_) => "pure",
            Body::Contextual(_) => "contextual",
            Body::Bound(..) => "bound",
            Body::Nested(_) => "pipe",
        };
        f.debug_struct("Step")
            .field("label", &self.label)
            .field("kind", &kind)
            .finish()
    }
}
