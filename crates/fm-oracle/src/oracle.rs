//! The [`Oracle`] trait: the abstraction boundary between fm-merge and a
//! satisfiability engine.
//!
//! | Capability        | Method             | Used by                          |
//! |-------------------|--------------------|----------------------------------|
//! | One solution      | `solve_one`        | diagnostics, counting            |
//! | Consistency       | `is_satisfiable`   | inconsistency check, cleanup, validator |
//! | Solution count    | `count_solutions`  | post-condition checks, tests     |
//! | Fresh state       | `reset`            | callers reusing one oracle       |
//!
//! Every query takes the model by reference: an oracle never mutates the
//! constraints it was handed, so the same [`OracleModel`] can be queried any
//! number of times with independent results.

use crate::error::OracleError;
use crate::model::OracleModel;
use crate::types::Assignment;

/// A satisfiability oracle.
///
/// The trait is object-safe; the merge engine takes `&mut dyn Oracle`.
pub trait Oracle {
    /// Find one satisfying assignment, or `None` if the model is UNSAT.
    ///
    /// # Errors
    /// Returns [`OracleError`] when the backend cannot decide the query.
    fn solve_one(&mut self, model: &OracleModel) -> Result<Option<Assignment>, OracleError>;

    /// Decide satisfiability.
    ///
    /// # Errors
    /// Returns [`OracleError`] when the backend cannot decide the query.
    fn is_satisfiable(&mut self, model: &OracleModel) -> Result<bool, OracleError> {
        Ok(self.solve_one(model)?.is_some())
    }

    /// Count distinct solutions over the projected variables by repeated
    /// solving, blocking each found assignment before the next query.
    ///
    /// # Errors
    /// Returns [`OracleError`] when any of the underlying queries fails.
    fn count_solutions(&mut self, model: &OracleModel) -> Result<u64, OracleError> {
        let mut working = model.clone();
        let mut count = 0_u64;
        while let Some(assignment) = self.solve_one(&working)? {
            count += 1;
            working.block(&assignment);
        }
        Ok(count)
    }

    /// Return the oracle to its starting state. Posted models are untouched.
    fn reset(&mut self);

    /// Number of `solve_one` queries answered since construction or the last
    /// [`reset`](Oracle::reset).
    fn queries(&self) -> u64;
}
