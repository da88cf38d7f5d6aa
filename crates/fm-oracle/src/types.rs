//! Value types used by the oracle boundary.

use std::fmt;
use std::ops::Not;

// ---------------------------------------------------------------------------
// Var / Lit
// ---------------------------------------------------------------------------

/// A boolean variable, identified by its index in an [`OracleModel`](crate::OracleModel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Zero-based index of this variable.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The positive literal of this variable.
    #[must_use]
    pub const fn positive(self) -> Lit {
        Lit(self.0 << 1)
    }

    /// The negative literal of this variable.
    #[must_use]
    pub const fn negative(self) -> Lit {
        Lit((self.0 << 1) | 1)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A literal: a variable or its complement.
///
/// Encoded as `2 * var + negated` so literals index watch lists directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    /// The underlying variable.
    #[must_use]
    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Returns `true` for a negative literal.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Dense code of this literal, `2 * var + negated`.
    #[must_use]
    pub const fn code(self) -> usize {
        self.0 as usize
    }

    /// Evaluate this literal under a variable value.
    #[must_use]
    pub const fn eval(self, var_value: bool) -> bool {
        var_value != self.is_negated()
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self {
        Self(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated() {
            write!(f, "-{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// A total assignment returned by a successful solve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub(crate) const fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Value of `var`. Variables beyond the solved model read as `false`.
    #[must_use]
    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    /// Value of `lit` under this assignment.
    #[must_use]
    pub fn satisfies(&self, lit: Lit) -> bool {
        lit.eval(self.value(lit.var()))
    }

    /// Number of variables covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the assignment covers no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_encoding_round_trips_through_var() {
        let v = Var::new(7);
        assert_eq!(v.positive().var(), v);
        assert_eq!(v.negative().var(), v);
        assert!(!v.positive().is_negated());
        assert!(v.negative().is_negated());
        assert_eq!(!v.positive(), v.negative());
        assert_eq!(v.negative().code(), 15);
    }

    #[test]
    fn eval_respects_polarity() {
        let v = Var::new(0);
        assert!(v.positive().eval(true));
        assert!(!v.negative().eval(true));
        assert!(v.negative().eval(false));
    }

    #[test]
    fn assignment_reads_missing_vars_as_false() {
        let a = Assignment::new(vec![true]);
        assert!(a.value(Var::new(0)));
        assert!(!a.value(Var::new(3)));
        assert!(a.satisfies(Var::new(3).negative()));
    }
}
