//! Feature-model merge engine.
//!
//! Three phases, always in this order:
//!
//! - **union** ([`union::union`]): contextualize every input, union the
//!   features, unify the roots, build the `Region` hierarchy, and copy every
//!   input constraint under its region guard. Multi-parent repair
//!   ([`split`]) runs at the end of this phase.
//! - **inconsistency check** ([`inconsistency::inconsistency_check`]): drop the
//!   region guard of every constraint that already holds everywhere.
//! - **cleanup** ([`cleanup::cleanup`]): remove constraints implied by the
//!   rest.
//!
//! [`pipeline::merge_models`] runs the phases and reports what each did.
//!
//! # Solution preservation
//!
//! Union accepts exactly the disjoint union of the inputs' configurations
//! (each extended with its region marker). The other two phases never change
//! the set of accepted configurations; they only rewrite how it is expressed.

pub mod cleanup;
pub mod inconsistency;
pub mod pipeline;
pub mod split;
pub mod union;

pub use cleanup::cleanup;
pub use inconsistency::inconsistency_check;
pub use pipeline::{MergeOutcome, MergeReport, merge_models};
pub use union::union;


use fm_oracle::Oracle;

use crate::compile::compile_with;
use crate::error::MergeError;
use crate::model::{Constraint, Model};

/// Decide a trial: `model`'s features and root with `constraints`.
pub(crate) fn trial_is_satisfiable<'c>(
    model: &Model,
    constraints: impl IntoIterator<Item = &'c Constraint>,
    oracle: &mut dyn Oracle,
) -> Result<bool, MergeError> {
    let compiled = compile_with(model, constraints)?;
    Ok(oracle.is_satisfiable(&compiled)?)
}

/// Holds exactly when `constraint` is violated: inside its region when
/// contextualized, anywhere otherwise.
pub(crate) fn violated(constraint: &Constraint) -> Constraint {
    Constraint::or_negation(vec![constraint.clone()])
}
