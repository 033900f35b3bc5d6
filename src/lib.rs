//! Stagehand: immutable changesets with composable transformation pipes
//!
//! A changeset stages a record (or a collection of records) and prepares it
//! for a persistence command through an ordered pipe of pure steps. Every
//! operation returns a new value, so changesets can be shared freely
//! across threads.
//!
//! # Core Concepts
//!
//! - **Pipe**: An ordered, associative composition of transform steps
//! - **Step Registry**: Pipes declared on a changeset type, copied by value into subtypes
//! - **Changeset**: Staged data, its resolved pipe, and the target it is persisted to
//! - **Association**: A named, not-yet-materialized link to another changeset or record
//! - **Commands**: Resolved and executed by an external layer through an effect
//!
//! # Example
//!
//! ```rust
//! use stagehand::changeset::ChangesetType;
//! use stagehand::core::Arity;
//! use serde_json::json;
//!
//! let new_user = ChangesetType::create("NewUser")
//!     .declare_dsl(|dsl| dsl.call("unwrap", json!({"key": "address", "prefix": true})))
//!     .unwrap()
//!     .declare_fn(|_ctx, mut record| {
//!         record.insert("status".to_string(), json!("active"));
//!         Ok(record)
//!     });
//!
//! let changeset = new_user
//!     .changeset("users")
//!     .stage_value(json!([
//!         {"name": "Jane", "address": {"city": "NYC"}},
//!         {"name": "Joe", "address": {"city": "KRK"}}
//!     ]))
//!     .unwrap();
//!
//! assert_eq!(changeset.result_arity(), Arity::Many);
//!
//! let records = changeset.to_records().unwrap();
//! assert_eq!(records[1]["address_city"], json!("KRK"));
//! assert_eq!(records[1]["status"], json!("active"));
//! ```

pub mod changeset;
pub mod command;
pub mod config;
pub mod core;
pub mod pipe;
pub mod registry;

// Re-export commonly used types
pub use changeset::{Associated, Changeset, ChangesetType};
pub use command::{Command, CommandKind, CommandResolver, Target};
pub use core::{Arity, ChangesetError, Data, Options, Record};
pub use pipe::{Pipe, Step, EMPTY_PIPE};
