//! Changesets: staged data plus the pipe that prepares it for persistence.
//!
//! A [`Changeset`] is an immutable value. Staging data, mapping steps and
//! adding options all return a new changeset; a reference held before the
//! call keeps observing the original data and pipe.
//!
//! # Example
//!
//! ```rust
//! use stagehand::changeset::ChangesetType;
//! use serde_json::json;
//!
//! let new_user = ChangesetType::create("NewUser")
//!     .declare_dsl(|dsl| {
//!         dsl.call("unwrap", json!("address")).call(
//!             "rename_keys",
//!             json!({"street": "address_street", "city": "address_city"}),
//!         )
//!     })
//!     .unwrap();
//!
//! let changeset = new_user.changeset("users").stage_value(json!({
//!     "name": "Jane",
//!     "address": {"street": "Street 1", "city": "NYC"}
//! })).unwrap();
//!
//! assert_eq!(
//!     serde_json::Value::Object(changeset.to_record().unwrap()),
//!     json!({"name": "Jane", "address_street": "Street 1", "address_city": "NYC"})
//! );
//! ```

mod associated;
mod delegate;
mod kind;

pub use associated::{Associate, Associated, AssociationNaming, TargetNaming};
pub use delegate::Forwarded;
pub use kind::ChangesetType;

use crate::command::{Command, CommandKind, CommandOptions, CommandResolver, Target};
use crate::core::{Arity, ChangesetError, Context, Data, Options, Record};
use crate::pipe::{Pipe, Step};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;
use tracing::debug;

/// Where a changeset's pipe came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PipeSource {
    /// Resolved from the type's declarations at construction
    Default,
    /// Composed or supplied on the instance
    Explicit,
}

/// Staged data, its resolved pipe, and what is needed to build a command.
#[derive(Clone)]
pub struct Changeset {
    kind: Arc<ChangesetType>,
    target: Target,
    data: Data,
    options: Options,
    pipe: Pipe,
    source: PipeSource,
}

impl Changeset {
    /// Create an empty changeset of `kind` for `target`.
    pub fn new(kind: Arc<ChangesetType>, target: impl Into<Target>) -> Self {
        Self::from_parts(kind, target, Data::default(), Options::new())
    }

    /// Create a changeset with data and options.
    ///
    /// The type's declared pipes are bound to this instance and composed
    /// into its pipe.
    pub fn from_parts(
        kind: Arc<ChangesetType>,
        target: impl Into<Target>,
        data: impl Into<Data>,
        options: Options,
    ) -> Self {
        let target = target.into();
        let pipe = kind.default_pipe(&Context::new(target.clone(), options.clone()));

        debug!(
            changeset = kind.name(),
            relation = %target,
            steps = pipe.len(),
            "changeset created"
        );

        Self {
            kind,
            target,
            data: data.into(),
            options,
            pipe,
            source: PipeSource::Default,
        }
    }

    pub fn kind(&self) -> &Arc<ChangesetType> {
        &self.kind
    }

    pub fn command_kind(&self) -> &CommandKind {
        self.kind.command_kind()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Staged data, before the pipe runs.
    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    /// The context steps mapped on this changeset are bound to.
    pub fn context(&self) -> Context {
        Context::new(self.target.clone(), self.options.clone())
    }

    /// Return a changeset holding `data`; the pipe is kept.
    pub fn stage(&self, data: impl Into<Data>) -> Self {
        Self {
            data: data.into(),
            ..self.clone()
        }
    }

    /// Stage a JSON object (one record) or array of objects (many).
    pub fn stage_value(&self, value: Value) -> Result<Self, ChangesetError> {
        Ok(self.stage(Data::try_from(value)?))
    }

    /// Return a changeset with `options` merged over the current ones.
    ///
    /// A pipe still resolved from the type's declarations is resolved
    /// again against the new options; an explicitly composed pipe is kept.
    pub fn with_options(&self, options: Options) -> Self {
        let options = self.options.merge(&options);

        let pipe = match self.source {
            PipeSource::Default => {
                debug!(changeset = self.kind.name(), "re-resolving default pipe");
                self.kind
                    .default_pipe(&Context::new(self.target.clone(), options.clone()))
            }
            PipeSource::Explicit => self.pipe.clone(),
        };

        Self {
            options,
            pipe,
            ..self.clone()
        }
    }

    /// Return a changeset using `pipe` instead of the current one.
    pub fn with_pipe(&self, pipe: Pipe) -> Self {
        Self {
            pipe,
            source: PipeSource::Explicit,
            ..self.clone()
        }
    }

    /// Compose named steps onto the pipe, in argument order.
    ///
    /// Names resolve against the type's step library.
    pub fn map_steps<I, S>(&self, names: I) -> Result<Self, ChangesetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let steps = self.kind.library().pipe(names)?.bind(&self.context());
        debug!(changeset = self.kind.name(), steps = ?steps.labels(), "mapping named steps");
        Ok(self.with_pipe(self.pipe.compose(&steps)))
    }

    /// Compose a function onto the pipe, bound to this changeset's context.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        let step = Step::contextual("map", f).bind(&self.context());
        debug!(changeset = self.kind.name(), "mapping function");
        self.with_pipe(self.pipe.then(step))
    }

    /// Compose named steps, then the function.
    pub fn map_steps_with<I, S, F>(&self, names: I, f: F) -> Result<Self, ChangesetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&Context, Record) -> Result<Record, ChangesetError> + Send + Sync + 'static,
    {
        Ok(self.map_steps(names)?.map(f))
    }

    /// Result arity, derived from the staged data (pure).
    pub fn result_arity(&self) -> Arity {
        self.data.arity()
    }

    /// Run the pipe over a single staged record.
    ///
    /// Fails with [`ChangesetError::ArityMismatch`] when many records are
    /// staged; use [`Changeset::to_records`] for those.
    pub fn to_record(&self) -> Result<Record, ChangesetError> {
        match &self.data {
            Data::One(record) => self.pipe.call(record.clone()),
            Data::Many(_) => Err(ChangesetError::ArityMismatch {
                expected: Arity::One,
                actual: Arity::Many,
            }),
        }
    }

    /// Run the pipe over every staged record, preserving order.
    ///
    /// A single staged record yields a one-element sequence.
    pub fn to_records(&self) -> Result<Vec<Record>, ChangesetError> {
        match &self.data {
            Data::One(_) => Ok(vec![self.to_record()?]),
            Data::Many(records) => records
                .iter()
                .map(|record| self.pipe.call(record.clone()))
                .collect(),
        }
    }

    /// Run the pipe according to the result arity.
    pub fn to_data(&self) -> Result<Data, ChangesetError> {
        match self.result_arity() {
            Arity::One => self.to_record().map(Data::One),
            Arity::Many => self.to_records().map(Data::Many),
        }
    }

    /// Ask `resolver` for the command persisting this changeset.
    pub fn command<R: CommandResolver>(&self, resolver: &R) -> Result<R::Command, ChangesetError> {
        let options =
            CommandOptions::with_defaults(self.result_arity(), self.kind.command_defaults());
        resolver.resolve(self.command_kind(), &self.target, &options)
    }

    /// Resolve the command from the effect environment and execute it.
    pub fn commit<R>(&self) -> BoxedEffect<<R::Command as Command>::Output, ChangesetError, R>
    where
        R: CommandResolver + Clone + Send + Sync + 'static,
        <R::Command as Command>::Output: Send + 'static,
    {
        let changeset = self.clone();
        debug!(
            changeset = self.kind.name(),
            command = %self.command_kind(),
            result = %self.result_arity(),
            "committing changeset"
        );

        from_fn(move |resolver: &R| {
            changeset
                .command(resolver)
                .map(|command| command.execute(&changeset))
        })
        .boxed()
    }

    /// Link another changeset or record under `name`.
    pub fn associate(&self, other: impl Into<Associate>, name: impl Into<String>) -> Associated {
        Associated::new(self.clone(), name, other)
    }

    /// Link another changeset or record, naming the link with `naming`.
    pub fn associate_inferred<N>(
        &self,
        other: impl Into<Associate>,
        naming: &N,
    ) -> Result<Associated, ChangesetError>
    where
        N: AssociationNaming + ?Sized,
    {
        let other = other.into();
        let name = naming.infer_name(&other)?;
        Ok(Associated::new(self.clone(), name, other))
    }
}

impl fmt::Debug for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changeset")
            .field("type", &self.kind.name())
            .field("target", &self.target)
            .field("data", &self.data)
            .field("options", &self.options)
            .field("steps", &self.pipe.labels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn user_type() -> ChangesetType {
        ChangesetType::create("NewUser")
            .declare_dsl(|dsl| {
                dsl.call("unwrap", json!("address")).call(
                    "rename_keys",
                    json!({
                        "street": "address_street",
                        "city": "address_city",
                        "country": "address_country"
                    }),
                )
            })
            .unwrap()
    }

    fn jane() -> Record {
        record(json!({
            "name": "Jane",
            "address": {"street": "Street 1", "city": "NYC", "country": "US"}
        }))
    }

    fn joe() -> Record {
        record(json!({
            "name": "Joe",
            "address": {"street": "Street 2", "city": "KRK", "country": "PL"}
        }))
    }

    #[test]
    fn to_record_applies_declared_pipe() {
        let changeset = user_type().changeset("users").stage(jane());

        assert_eq!(
            changeset.to_record().unwrap(),
            record(json!({
                "name": "Jane",
                "address_street": "Street 1",
                "address_city": "NYC",
                "address_country": "US"
            }))
        );
    }

    #[test]
    fn to_records_maps_each_record_in_order() {
        let changeset = user_type().changeset("users").stage(vec![jane(), joe()]);

        let records = changeset.to_records().unwrap();

        assert_eq!(changeset.result_arity(), Arity::Many);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], json!("Jane"));
        assert_eq!(records[1]["address_city"], json!("KRK"));
    }

    #[test]
    fn to_records_wraps_single_record() {
        let changeset = user_type().changeset("users").stage(jane());

        assert_eq!(changeset.result_arity(), Arity::One);
        assert_eq!(
            changeset.to_records().unwrap(),
            vec![changeset.to_record().unwrap()]
        );
    }

    #[test]
    fn to_record_rejects_many() {
        let changeset = user_type().changeset("users").stage(vec![jane()]);

        assert_eq!(
            changeset.to_record(),
            Err(ChangesetError::ArityMismatch {
                expected: Arity::One,
                actual: Arity::Many,
            })
        );
    }

    #[test]
    fn to_data_follows_arity() {
        let one = user_type().changeset("users").stage(jane());
        let many = one.stage(vec![jane(), joe()]);

        assert_eq!(one.to_data().unwrap().arity(), Arity::One);
        assert_eq!(many.to_data().unwrap().arity(), Arity::Many);
    }

    #[test]
    fn stage_keeps_pipe_and_receiver() {
        let empty = user_type().changeset("users");
        let staged = empty.stage(jane());

        assert_eq!(empty.data(), &Data::default());
        assert_eq!(staged.pipe(), empty.pipe());
    }

    #[test]
    fn stage_value_rejects_scalars() {
        let changeset = user_type().changeset("users");
        assert!(changeset.stage_value(json!("Jane")).is_err());
    }

    #[test]
    fn map_steps_composes_named_steps() {
        let changeset = ChangesetType::create("NewUser")
            .changeset("users")
            .stage(jane())
            .map_steps(["touch"])
            .unwrap();

        let result = changeset.to_record().unwrap();
        assert!(result.contains_key("updated_at"));
        assert_eq!(changeset.pipe().labels(), vec!["touch"]);
    }

    #[test]
    fn map_steps_fails_on_unknown_name() {
        let changeset = user_type().changeset("users");
        assert_eq!(
            changeset.map_steps(["nope"]).unwrap_err(),
            ChangesetError::UnknownStep {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn map_function_sees_options() {
        let changeset = ChangesetType::create("NewUser")
            .changeset("users")
            .with_options(Options::new().with("status", "published".to_string()))
            .stage(jane())
            .map(|ctx, mut record| {
                let status = ctx.dependency::<String>("status")?;
                record.insert("status".to_string(), json!(status));
                Ok(record)
            });

        assert_eq!(changeset.to_record().unwrap()["status"], json!("published"));
    }

    #[test]
    fn map_steps_with_runs_names_before_function() {
        let kind = ChangesetType::create("NewUser").register_step(
            "mark",
            Step::new("mark", |mut record: Record| {
                record.insert("mark".to_string(), json!("step"));
                Ok(record)
            }),
        );
        let changeset = kind
            .changeset("users")
            .map_steps_with(["mark"], set("mark", json!("function")))
            .unwrap();

        assert_eq!(changeset.pipe().labels(), vec!["mark", "map"]);
        assert_eq!(changeset.to_record().unwrap()["mark"], json!("function"));
    }

    #[test]
    fn map_never_alters_receiver() {
        let original = user_type().changeset("users").stage(jane());
        let before = original.pipe().clone();

        let _mapped = original.map(set("extra", json!(true)));
        let _named = original.map_steps(["touch"]).unwrap();

        assert_eq!(original.pipe(), &before);
        assert!(!original.to_record().unwrap().contains_key("extra"));
    }

    #[test]
    fn with_options_reresolves_default_pipe() {
        let kind = ChangesetType::create("NewUser").declare_fn(|ctx, mut record| {
            let dep = ctx.dependency::<String>("dep")?;
            record.insert("dep".to_string(), json!(dep));
            Ok(record)
        });

        let without = kind.changeset("users").stage(record(json!({"name": "Jane"})));
        let with = without.with_options(Options::new().with("dep", "foo".to_string()));

        assert_eq!(
            without.to_record(),
            Err(ChangesetError::MissingDependency {
                name: "dep".to_string()
            })
        );
        assert_eq!(
            with.to_record().unwrap(),
            record(json!({"name": "Jane", "dep": "foo"}))
        );
    }

    #[test]
    fn with_options_keeps_explicit_pipe() {
        let changeset = ChangesetType::create("NewUser")
            .changeset("users")
            .map(|ctx, mut record| {
                let present = ctx.options().contains("dep");
                record.insert("dep_seen".to_string(), json!(present));
                Ok(record)
            })
            .with_options(Options::new().with("dep", 1u8));

        assert_eq!(changeset.to_record().unwrap()["dep_seen"], json!(false));
        assert!(changeset.options().contains("dep"));
    }

    #[test]
    fn declared_steps_share_instance_state() {
        let next = |key: &'static str| {
            move |ctx: &Context, mut record: Record| -> Result<Record, ChangesetError> {
                let counter = ctx.dependency::<AtomicUsize>("counter")?;
                let value = counter.fetch_add(1, Ordering::SeqCst) + 1;
                record.insert(key.to_string(), json!(value));
                Ok(record)
            }
        };
        let kind = Arc::new(
            ChangesetType::create("NewUser")
                .declare_fn(next("one"))
                .declare_fn(next("two")),
        );

        let changeset = Changeset::from_parts(
            kind,
            "users",
            record(json!({"name": "Jane"})),
            Options::new().with("counter", AtomicUsize::new(0)),
        );

        assert_eq!(
            changeset.to_record().unwrap(),
            record(json!({"name": "Jane", "one": 1, "two": 2}))
        );
    }

    #[test]
    fn values_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Changeset>();
        assert_send_sync::<ChangesetType>();
        assert_send_sync::<Associated>();
        assert_send_sync::<Pipe>();
        assert_send_sync::<Step>();
        assert_send_sync::<Options>();
        assert_send_sync::<Context>();
    }

    #[test]
    fn changesets_are_usable_from_other_threads() {
        let changeset = user_type().changeset("users").stage(jane());

        let handle = std::thread::spawn({
            let changeset = changeset.clone();
            move || changeset.to_record()
        });

        assert_eq!(handle.join().unwrap(), changeset.to_record());
    }

    #[test]
    fn debug_shows_type_target_and_steps() {
        let changeset = user_type().changeset("users");
        let debug = format!("{changeset:?}");

        assert!(debug.contains("NewUser"));
        assert!(debug.contains("users"));
        assert!(debug.contains("rename_keys"));
    }
}
