//! Composable transformation pipes.
//!
//! A [`Pipe`] is an ordered, immutable sequence of [`Step`]s. Composition
//! runs the left pipe first, is associative, and has [`EMPTY_PIPE`] as its
//! identity on both sides.
//!
//! # Example
//!
//! ```rust
//! use stagehand::pipe::{Pipe, Step, EMPTY_PIPE};
//! use serde_json::json;
//!
//! let greet = Pipe::from_fn(|mut record| {
//!     record.insert("greeting".to_string(), json!("hello"));
//!     Ok(record)
//! });
//! let shout = Pipe::from_fn(|mut record| {
//!     if let Some(greeting) = record.get("greeting").and_then(|g| g.as_str()) {
//!         let loud = greeting.to_uppercase();
//!         record.insert("greeting".to_string(), json!(loud));
//!     }
//!     Ok(record)
//! });
//!
//! let pipe = EMPTY_PIPE.compose(&greet).compose(&shout);
//! let record = pipe.call(Default::default()).unwrap();
//! assert_eq!(record["greeting"], json!("HELLO"));
//! ```

pub mod functions;
mod library;
mod step;

pub use library::{PipeBuilder, StepFactory, StepLibrary};
pub use step::{ContextStepFn, Step, StepFn};

use crate::core::{ChangesetError, Context, Record};

/// The identity pipe.
pub const EMPTY_PIPE: Pipe = Pipe::new();

/// An ordered sequence of transform steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipe {
    steps: Vec<Step>,
}

impl Pipe {
    /// Create an empty (identity) pipe.
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn from_step(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    /// Wrap an anonymous pure function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        Self::from_step(Step::anonymous(f))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Labels of every step, in application order.
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(Step::label).collect()
    }

    /// Compose with `other`: this pipe runs first, then `other`.
    ///
    /// Composing with an empty pipe on either side returns the other
    /// operand unchanged.
    pub fn compose(&self, other: &Pipe) -> Pipe {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut steps = Vec::with_capacity(self.len() + other.len());
        steps.extend(self.steps.iter().cloned());
        steps.extend(other.steps.iter().cloned());
        Pipe { steps }
    }

    /// Return a pipe with `step` appended.
    pub fn then(&self, step: Step) -> Pipe {
        self.compose(&Pipe::from_step(step))
    }

    /// Whether any step still needs a context.
    pub fn requires_context(&self) -> bool {
        self.steps.iter().any(Step::requires_context)
    }

    /// Close every contextual step over `context`.
    ///
    /// Never fails: dependencies are looked up only when a step runs.
    pub fn bind(&self, context: &Context) -> Pipe {
        if !self.requires_context() {
            return self.clone();
        }
        Pipe {
            steps: self.steps.iter().map(|step| step.bind(context)).collect(),
        }
    }

    /// Run every step in order.
    pub fn call(&self, record: Record) -> Result<Record, ChangesetError> {
        self.steps.iter().try_fold(record, |record, step| step.call(record))
    }
}

impl FromIterator<Step> for Pipe {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Pipe> for Pipe {
    /// Compose pipes left to right.
    fn from_iter<I: IntoIterator<Item = Pipe>>(iter: I) -> Self {
        iter.into_iter()
            .fold(EMPTY_PIPE, |composed, pipe| composed.compose(&pipe))
    }
}
