//! Per-type registry of declared pipes.
//!
//! Each changeset type keeps an ordered list of the pipes declared on it.
//! Subtypes start from a copy of their parent's list, so declarations on
//! either side never leak into the other.

use crate::core::Context;
use crate::pipe::{Pipe, EMPTY_PIPE};

/// Ordered list of pipes declared on one changeset type.
///
/// A declared empty pipe still counts as a declaration: `len` reports it
/// and `is_empty` is false, while the resolved default pipe is the
/// identity either way.
///
/// # Example
///
/// ```rust
/// use stagehand::core::Context;
/// use stagehand::pipe::{functions, Pipe};
/// use stagehand::registry::StepRegistry;
///
/// let parent = StepRegistry::new().declare(Pipe::from_step(functions::touch()));
/// let child = parent.inherit().declare(Pipe::from_step(functions::add_timestamps()));
///
/// assert_eq!(parent.len(), 1);
/// assert_eq!(child.len(), 2);
/// assert_eq!(child.default_pipe(&Context::default()).labels(), vec!["touch", "add_timestamps"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepRegistry {
    declarations: Vec<Pipe>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declared pipe.
    pub fn declare(mut self, pipe: Pipe) -> Self {
        self.declarations.push(pipe);
        self
    }

    /// Copy of this registry for a subtype.
    pub fn inherit(&self) -> Self {
        self.clone()
    }

    /// Declared pipes in declaration order.
    pub fn pipes(&self) -> &[Pipe] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Bind every declared pipe to `context` and compose them in order.
    pub fn default_pipe(&self, context: &Context) -> Pipe {
        if self.declarations.is_empty() {
            return EMPTY_PIPE;
        }
        self.declarations
            .iter()
            .map(|pipe| pipe.bind(context))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Options, Record};
    use crate::pipe::Step;
    use serde_json::json;

    fn insert(key: &'static str, value: i64) -> Pipe {
        Pipe::from_step(Step::new(key, move |mut record: Record| {
            record.insert(key.to_string(), json!(value));
            Ok(record)
        }))
    }

    #[test]
    fn empty_registry_resolves_to_identity() {
        let registry = StepRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.default_pipe(&Context::default()), EMPTY_PIPE);
    }

    #[test]
    fn declared_empty_pipe_is_a_declaration() {
        let registry = StepRegistry::new().declare(Pipe::new());

        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        assert!(registry.default_pipe(&Context::default()).is_empty());
    }

    #[test]
    fn default_pipe_follows_declaration_order() {
        let registry = StepRegistry::new()
            .declare(insert("one", 1))
            .declare(insert("two", 2));

        let pipe = registry.default_pipe(&Context::default());
        let expected = registry.pipes()[0].compose(&registry.pipes()[1]);

        assert_eq!(pipe, expected);
        assert_eq!(pipe.labels(), vec!["one", "two"]);
    }

    #[test]
    fn inherited_registry_is_isolated() {
        let parent = StepRegistry::new().declare(insert("one", 1));
        let child = parent.inherit();

        assert_eq!(child, parent);

        let child = child.declare(insert("two", 2));
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.pipes()[0], parent.pipes()[0]);
    }

    #[test]
    fn default_pipe_binds_declarations() {
        let registry = StepRegistry::new().declare(Pipe::from_step(Step::contextual(
            "dep",
            |ctx, mut record| {
                let dep = ctx.dependency::<String>("dep")?;
                record.insert("dep".to_string(), json!(dep));
                Ok(record)
            },
        )));
        let context = Context::new("users".into(), Options::new().with("dep", "foo".to_string()));

        let pipe = registry.default_pipe(&context);

        assert!(!pipe.requires_context());
        assert_eq!(pipe.call(Record::new()).unwrap()["dep"], json!("foo"));
        assert!(registry.pipes()[0].requires_context());
    }
}
