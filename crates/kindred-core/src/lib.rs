//! Core types for the Kindred genealogy engine.
//!
//! Holds the record model (people, events, sources), the closed schemas every
//! candidate record is validated against, and the in-memory store the
//! analyses read from. Free of I/O; callers hand in already-parsed records.

pub mod date;
pub mod error;
pub mod graph;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
