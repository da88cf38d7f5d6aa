//! Error types for oracle queries.
//!
//! [`OracleError`] is returned by every [`Oracle`](crate::Oracle) method. A
//! query that fails never degrades into a SAT or UNSAT answer: callers must
//! treat an error as "satisfiability unknown".

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`Oracle`](crate::Oracle) operations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The configured decision budget ran out before the search finished.
    #[error("decision budget of {limit} exhausted before the search completed")]
    BudgetExhausted {
        /// The decision limit that was hit.
        limit: u64,
    },

    /// The configured wall-clock limit elapsed before the search finished.
    #[error("oracle query timed out after {}ms", elapsed.as_millis())]
    Timeout {
        /// Time spent in the query when it was abandoned.
        elapsed: Duration,
    },

    /// The backend failed for a reason that does not fit the other variants.
    #[error("oracle backend error: {message}")]
    Backend {
        /// Freeform description from the backend.
        message: String,
    },
}
