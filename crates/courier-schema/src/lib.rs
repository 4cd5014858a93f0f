//! Schema validation for Courier messages.
//!
//! Inbound bytes are untrusted. Before the engine routes a message, it has
//! to establish two things, in order:
//!
//! 1. the value is a well-formed envelope of a compatible version
//!    ([`Dispatch::validate_envelope`]), and
//! 2. the body matches the schema for its catalog, kind, and type name
//!    ([`Dispatch::validate_body`]).
//!
//! The schemas live in a [`SchemaRegistry`]: a name-keyed table of check
//! functions, built once from the catalog definitions and read-only after
//! that ([`registry::global`]). Because the table is derived from the same
//! enums that define the catalogs, a catalog entry without a schema is a
//! compile error, not a runtime surprise.
//!
//! Validators never transform their input. They either accept it unchanged
//! or return a [`ValidateError`] describing the violation; deciding what to
//! do about a failure (drop, log, answer with a fault) is the caller's job.

mod dispatch;
mod error;
pub mod registry;

pub use dispatch::Dispatch;
pub use error::ValidateError;
pub use registry::{compile, CheckFn, SchemaRegistry};
