//! Common utilities and types shared across deskbridge crates.
//!
//! This module provides the error type every layer reports through and
//! the small value types used to address remote records.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{as_integer, query_value, EntityKey};
