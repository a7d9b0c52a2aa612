//! Record-table codec for Kindred.
//!
//! Turns CSV record tables (one header row, one record per line) into the
//! candidate records [`kindred_core::store::MemoryStore`] validates, and
//! writes derived rows back out as CSV. No validation happens here beyond
//! what is needed to shape a cell.
//!
//! # Quick start
//!
//! ```no_run
//! use kindred_core::{record::RecordKind, store::MemoryStore};
//!
//! let csv = "id,name,sex,born\nF1,Founder,male,1758\n";
//! let rows = kindred_tables::decode_table(RecordKind::Person, csv.as_bytes()).unwrap();
//! let mut store = MemoryStore::new();
//! store.load(RecordKind::Person, rows).unwrap();
//! ```

mod decode;
mod encode;
pub mod error;

pub use decode::{LIST_DELIMITER, columns, decode_json, decode_table};
pub use encode::encode_rows;
pub use error::{Error, Result};
