//! fm-merge library crate.
//!
//! Merges region-tagged feature models into one model that accepts exactly
//! the union of their configurations, then minimizes it:
//!
//! ```text
//! inputs ─▶ union ─▶ inconsistency check ─▶ cleanup ─▶ merged ─▶ validate
//! ```
//!
//! Every satisfiability question goes through the [`fm_oracle::Oracle`]
//! trait; models are compiled to CNF by [`compile`].

pub mod compile;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod telemetry;
pub mod validate;

pub use compile::{CompileError, compile};
pub use error::MergeError;
pub use merge::{MergeOutcome, MergeReport, merge_models};
pub use validate::{Verdict, validate_merge};
