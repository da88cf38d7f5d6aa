//! Satisfiability oracle boundary for fm-merge.
//!
//! This crate defines the [`Oracle`] trait, the single interface through
//! which the merge engine and validator ask satisfiability questions. No code
//! in the main crate talks to a solver directly; it compiles feature models
//! into an [`OracleModel`] and programs against the trait.
//!
//! # Crate layout
//!
//! - [`types`]: variables, literals, and assignments.
//! - [`model`]: the [`OracleModel`] CNF builder with reification helpers.
//! - [`oracle`]: the [`Oracle`] trait definition.
//! - [`dpll`]: [`DpllOracle`], the in-tree complete DPLL backend.
//! - [`error`]: the [`OracleError`] enum returned by all trait methods.

pub mod dpll;
pub mod error;
pub mod model;
pub mod oracle;
pub mod types;

pub use dpll::{DpllOracle, SolverLimits};
pub use error::OracleError;
pub use model::OracleModel;
pub use oracle::Oracle;
pub use types::{Assignment, Lit, Var};
