//! Derived computations over a loaded record set.
//!
//! - [`generations`]: breadth-first generation depth from a founder.
//! - [`timeline`]: ages at events, parent → child birth gaps, lifespans.
//! - [`forecast`]: Monte Carlo Galton–Watson estimate of descendant counts.
//!
//! Every function here is pure: it reads a [`LineageStore`] (or only its
//! explicit parameters) and returns a fresh table.
//!
//! [`LineageStore`]: kindred_core::store::LineageStore

pub mod error;
pub mod forecast;
pub mod generations;
pub mod timeline;

pub use error::{Error, Result};

// ─── End-to-end ──────────────────────────────────────────────────────────────
