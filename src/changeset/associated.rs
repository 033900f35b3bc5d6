//! Association links between changesets.

use super::Changeset;
use crate::command::{CommandKind, Target};
use crate::core::{Arity, ChangesetError, Record};
use std::collections::BTreeMap;

/// Something a changeset can be associated with.
#[derive(Clone, Debug)]
pub enum Associate {
    /// Another changeset, persisted alongside the owner
    Changeset(Changeset),
    /// An already persisted record
    Record(Record),
}

impl Associate {
    pub fn as_changeset(&self) -> Option<&Changeset> {
        match self {
            Self::Changeset(changeset) => Some(changeset),
            Self::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Changeset(_) => None,
            Self::Record(record) => Some(record),
        }
    }
}

impl From<Changeset> for Associate {
    fn from(changeset: Changeset) -> Self {
        Self::Changeset(changeset)
    }
}

impl From<&Changeset> for Associate {
    fn from(changeset: &Changeset) -> Self {
        Self::Changeset(changeset.clone())
    }
}

impl From<Record> for Associate {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

/// Policy naming an association when the caller does not.
pub trait AssociationNaming {
    fn infer_name(&self, other: &Associate) -> Result<String, ChangesetError>;
}

impl<F> AssociationNaming for F
where
    F: Fn(&Associate) -> Result<String, ChangesetError>,
{
    fn infer_name(&self, other: &Associate) -> Result<String, ChangesetError> {
        self(other)
    }
}

/// Names an association after the other changeset's target.
///
/// Plain records carry no target, so they cannot be named this way.
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetNaming;

impl AssociationNaming for TargetNaming {
    fn infer_name(&self, other: &Associate) -> Result<String, ChangesetError> {
        match other {
            Associate::Changeset(changeset) => Ok(changeset.target().as_str().to_string()),
            Associate::Record(_) => Err(ChangesetError::UnresolvedAssociation(
                "records carry no target; pass the association name explicitly".to_string(),
            )),
        }
    }
}

/// A changeset linked to other changesets or records by association name.
///
/// The link is not materialized: no keys are copied between the parties.
/// Adding a link returns a new value; linking the same name again
/// replaces the earlier collaborator.
///
/// # Example
///
/// ```rust
/// use stagehand::changeset::ChangesetType;
/// use serde_json::json;
///
/// let user = ChangesetType::create("NewUser")
///     .changeset("users")
///     .stage_value(json!({"name": "Jane"}))
///     .unwrap();
/// let task = ChangesetType::create("NewTask")
///     .changeset("tasks")
///     .stage_value(json!({"title": "A task"}))
///     .unwrap();
///
/// let linked = task.associate(user, "user");
///
/// assert_eq!(linked.names().collect::<Vec<_>>(), vec!["user"]);
/// assert_eq!(linked.owner().target().as_str(), "tasks");
/// ```
#[derive(Clone, Debug)]
pub struct Associated {
    owner: Changeset,
    associations: BTreeMap<String, Associate>,
}

impl Associated {
    pub fn new(owner: Changeset, name: impl Into<String>, other: impl Into<Associate>) -> Self {
        let mut associations = BTreeMap::new();
        associations.insert(name.into(), other.into());
        Self {
            owner,
            associations,
        }
    }

    /// Return a link with one more association.
    pub fn associate(&self, other: impl Into<Associate>, name: impl Into<String>) -> Self {
        let mut associations = self.associations.clone();
        associations.insert(name.into(), other.into());
        Self {
            owner: self.owner.clone(),
            associations,
        }
    }

    /// Return a link with one more association, named by `naming`.
    pub fn associate_inferred<N>(
        &self,
        other: impl Into<Associate>,
        naming: &N,
    ) -> Result<Self, ChangesetError>
    where
        N: AssociationNaming + ?Sized,
    {
        let other = other.into();
        let name = naming.infer_name(&other)?;
        Ok(self.associate(other, name))
    }

    pub fn owner(&self) -> &Changeset {
        &self.owner
    }

    pub fn associations(&self) -> &BTreeMap<String, Associate> {
        &self.associations
    }

    pub fn get(&self, name: &str) -> Option<&Associate> {
        self.associations.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.associations.keys().map(String::as_str)
    }

    pub fn command_kind(&self) -> &CommandKind {
        self.owner.command_kind()
    }

    pub fn target(&self) -> &Target {
        self.owner.target()
    }

    pub fn result_arity(&self) -> Arity {
        self.owner.result_arity()
    }

    /// The owner's transformed records.
    pub fn to_records(&self) -> Result<Vec<Record>, ChangesetError> {
        self.owner.to_records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::ChangesetType;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => panic!("expected an object"),
        }
    }

    fn user() -> Changeset {
        ChangesetType::create("NewUser")
            .changeset("users")
            .stage(record(json!({"name": "Jane"})))
    }

    fn task() -> Changeset {
        ChangesetType::create("NewTask")
            .declare_dsl(|dsl| dsl.step("add_timestamps"))
            .unwrap()
            .changeset("tasks")
            .stage(record(json!({"title": "A task"})))
    }

    #[test]
    fn associate_wraps_owner_and_other() {
        let owner = task();
        let linked = owner.associate(user(), "user");

        assert_eq!(linked.target().as_str(), "tasks");
        assert_eq!(linked.command_kind(), &CommandKind::Create);
        assert_eq!(linked.result_arity(), Arity::One);
        assert!(linked.get("user").and_then(Associate::as_changeset).is_some());
        assert!(linked.to_records().unwrap()[0].contains_key("created_at"));
    }

    #[test]
    fn associate_accepts_records() {
        let linked = task().associate(record(json!({"id": 1, "name": "Jane"})), "user");

        let other = linked.get("user").and_then(Associate::as_record).unwrap();
        assert_eq!(other["id"], json!(1));
    }

    #[test]
    fn associating_is_additive() {
        let first = task().associate(user(), "user");
        let second = first.associate(record(json!({"id": 7})), "project");

        assert_eq!(first.names().collect::<Vec<_>>(), vec!["user"]);
        assert_eq!(second.names().collect::<Vec<_>>(), vec!["project", "user"]);
    }

    #[test]
    fn same_name_replaces_collaborator() {
        let linked = task()
            .associate(user(), "user")
            .associate(record(json!({"id": 1})), "user");

        assert_eq!(linked.associations().len(), 1);
        assert!(linked.get("user").and_then(Associate::as_record).is_some());
    }

    #[test]
    fn target_naming_uses_other_target() {
        let linked = task().associate_inferred(user(), &TargetNaming).unwrap();
        assert!(linked.get("users").is_some());
    }

    #[test]
    fn target_naming_rejects_records() {
        let result = task().associate_inferred(record(json!({"id": 1})), &TargetNaming);
        assert!(matches!(
            result,
            Err(ChangesetError::UnresolvedAssociation(_))
        ));
    }

    #[test]
    fn closures_are_naming_policies() {
        let singular = |other: &Associate| -> Result<String, ChangesetError> {
            let target = other
                .as_changeset()
                .map(|changeset| changeset.target().as_str().trim_end_matches('s').to_string());
            target.ok_or_else(|| ChangesetError::UnresolvedAssociation("no target".to_string()))
        };

        let linked = task().associate_inferred(user(), &singular).unwrap();
        let linked = linked.associate_inferred(user(), &TargetNaming).unwrap();

        assert_eq!(linked.names().collect::<Vec<_>>(), vec!["user", "users"]);
    }

    #[test]
    fn owner_is_not_mutated() {
        let owner = task();
        let _linked = owner.associate(user(), "user");

        assert_eq!(owner.to_records().unwrap().len(), 1);
        assert_eq!(owner.target().as_str(), "tasks");
    }
}
