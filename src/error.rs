//! Error type for the merge engine and validator.
//!
//! [`MergeError`] wraps the lower layers (model building, compilation, the
//! oracle) and adds the structural failures of Union. Messages say what went
//! wrong and how to fix the input.

use std::fmt;

use fm_oracle::OracleError;

use crate::compile::CompileError;
use crate::model::{ModelError, Region};

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Unified error type for merge and validation.
#[derive(Debug)]
pub enum MergeError {
    /// Three or more inputs whose roots differ.
    RootMismatch {
        /// Root names in input order (`<none>` for root-less models).
        roots: Vec<String>,
    },

    /// Fewer than two or more than nine inputs.
    InvalidInputCount {
        /// The number of models supplied.
        count: usize,
    },

    /// Two inputs carry the same region.
    DuplicateRegion {
        /// The repeated region.
        region: Region,
    },

    /// An input is tagged with a synthetic region.
    NotASourceRegion {
        /// The offending region.
        region: Region,
    },

    /// A phase changed the solution count it must preserve.
    PostconditionViolated {
        /// The phase that broke its guarantee.
        phase: &'static str,
        /// Solutions before the phase.
        expected: u64,
        /// Solutions after the phase.
        actual: u64,
    },

    /// Model construction failed.
    Model(ModelError),

    /// A model or trial could not be compiled.
    Compile(CompileError),

    /// The oracle could not decide a query.
    Oracle(OracleError),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootMismatch { roots } => write!(
                f,
                "cannot merge {} models with different roots: {}\n  To fix: rename the roots to one shared name, or merge two models at a time.",
                roots.len(),
                roots.join(", ")
            ),
            Self::InvalidInputCount { count } => write!(
                f,
                "cannot merge {count} model(s): between 2 and 9 inputs are supported"
            ),
            Self::DuplicateRegion { region } => write!(
                f,
                "region {region} is used by more than one input.\n  To fix: give every input its own region (A..I)."
            ),
            Self::NotASourceRegion { region } => write!(
                f,
                "input is tagged {region}, which is not a source region.\n  To fix: tag inputs with A..I."
            ),
            Self::PostconditionViolated {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "{phase} changed the solution count from {expected} to {actual}"
            ),
            Self::Model(err) => write!(f, "invalid model: {err}"),
            Self::Compile(err) => write!(f, "compile error: {err}"),
            Self::Oracle(err) => write!(
                f,
                "oracle failure: {err}\n  To fix: raise [oracle] max_decisions / timeout_ms in the config."
            ),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            Self::Compile(err) => Some(err),
            Self::Oracle(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<ModelError> for MergeError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotASourceRegion { region } => Self::NotASourceRegion { region },
            other => Self::Model(other),
        }
    }
}

impl From<CompileError> for MergeError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<OracleError> for MergeError {
    fn from(err: OracleError) -> Self {
        Self::Oracle(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_root_mismatch_lists_roots() {
        let err = MergeError::RootMismatch {
            roots: vec!["Car".to_owned(), "Bike".to_owned(), "Car".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("3 models"));
        assert!(msg.contains("Car, Bike, Car"));
        assert!(msg.contains("To fix"));
    }

    #[test]
    fn display_invalid_input_count() {
        let msg = MergeError::InvalidInputCount { count: 1 }.to_string();
        assert!(msg.contains("1 model(s)"));
        assert!(msg.contains("between 2 and 9"));
    }

    #[test]
    fn display_postcondition() {
        let msg = MergeError::PostconditionViolated {
            phase: "cleanup",
            expected: 612,
            actual: 611,
        }
        .to_string();
        assert!(msg.contains("cleanup"));
        assert!(msg.contains("612"));
        assert!(msg.contains("611"));
    }

    #[test]
    fn model_region_error_is_lifted() {
        let err: MergeError = ModelError::NotASourceRegion {
            region: Region::Union,
        }
        .into();
        assert!(matches!(
            err,
            MergeError::NotASourceRegion {
                region: Region::Union
            }
        ));
    }

    #[test]
    fn wrapped_errors_expose_source() {
        let err: MergeError = OracleError::BudgetExhausted { limit: 10 }.into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("max_decisions"));

        let err: MergeError = CompileError::DomainOverflow { value: 1 << 40 }.into();
        assert!(err.source().is_some());
    }
}
