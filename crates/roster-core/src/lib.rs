//! Core types and trait definitions for the Roster student registry.
//!
//! No HTTP or database code lives here. The store, API, server and CLI
//! crates all build on these types.

pub mod admin;
pub mod assessment;
pub mod choices;
pub mod error;
pub mod query;
pub mod stats;
pub mod store;
pub mod student;
pub mod validate;

pub use error::{Error, Result};
pub use validate::{FieldError, ValidationError};
