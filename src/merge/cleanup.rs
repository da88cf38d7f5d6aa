//! Cleanup: remove constraints implied by the rest of the model.
//!
//! Single pass in list order. A constraint that cannot be violated while every
//! other current constraint holds is redundant and removed for good.
//! Removing a constraint can make an earlier one removable; earlier
//! constraints are not revisited.

use fm_oracle::Oracle;
use tracing::{debug, instrument, trace};

use super::{trial_is_satisfiable, violated};
use crate::error::MergeError;
use crate::model::{Constraint, ConstraintKind, Model};

/// Constraints cleanup never removes: scaffolding, and unguarded groups with
/// a zero lower bound.
#[must_use]
pub fn is_exempt(constraint: &Constraint) -> bool {
    if constraint.is_structural() {
        return true;
    }
    matches!(
        constraint.kind(),
        ConstraintKind::Group { lower: 0, .. } if !constraint.is_contextualized()
    )
}

/// Run cleanup over `merged`.
///
/// # Errors
/// Propagates compile and oracle failures.
#[instrument(skip_all, fields(constraints = merged.constraints().len()))]
pub fn cleanup(merged: &Model, oracle: &mut dyn Oracle) -> Result<Model, MergeError> {
    let start = oracle.queries();
    let mut out = merged.clone();
    let mut current = out.take_constraints();

    let mut removed = 0_usize;
    let mut i = 0;
    while i < current.len() {
        if is_exempt(&current[i]) {
            i += 1;
            continue;
        }
        let probe = violated(&current[i]);
        let others = current[..i].iter().chain(&current[i + 1..]);
        let needed = trial_is_satisfiable(&out, others.chain([&probe]), oracle)?;
        if needed {
            i += 1;
        } else {
            let gone = current.remove(i);
            trace!(constraint = %gone, "removed redundant constraint");
            removed += 1;
        }
    }

    out.set_constraints(current);
    let queries = oracle.queries().saturating_sub(start);
    out.record_queries(queries);
    debug!(removed, queries, "cleanup done");
    Ok(out)
}
