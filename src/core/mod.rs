//! Core changeset value types.
//!
//! This module contains the plain data a changeset is made of:
//! - Staged data (one record or many) and its derived arity
//! - Options and the context steps bind to
//! - The error type shared by the whole crate
//!
//! Everything here is an immutable value. Operations return new values
//! instead of mutating the receiver.

mod context;
mod data;
mod error;

pub use context::{Context, Options};
pub use data::{Arity, Data, DataOp, Record, Response};
pub use error::ChangesetError;
