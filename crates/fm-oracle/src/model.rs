//! The CNF model handed to an oracle.
//!
//! An [`OracleModel`] is a clause database over boolean variables. Variables
//! created with [`OracleModel::named_var`] are *projected*: they carry a name
//! (a feature name, in practice) and define what counts as a distinct
//! solution. Auxiliary variables introduced by the reification helpers are
//! always fully defined by the projected ones, so enumerating projected
//! assignments enumerates solutions exactly once.
//!
//! Reification helpers fold constants: `and` over an empty slice is the
//! constant true literal, a single operand is returned as-is, and a constant
//! false operand short-circuits. This keeps cardinality encodings small.

use std::collections::HashMap;

use crate::types::{Assignment, Lit, Var};

#[derive(Clone, Debug)]
struct VarInfo {
    name: Option<String>,
}

/// A CNF clause database with named projected variables.
#[derive(Clone, Debug, Default)]
pub struct OracleModel {
    vars: Vec<VarInfo>,
    by_name: HashMap<String, Var>,
    projected: Vec<Var>,
    clauses: Vec<Vec<Lit>>,
    has_empty_clause: bool,
    constant_true: Option<Lit>,
}

impl OracleModel {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Return the projected variable called `name`, creating it on first use.
    pub fn named_var(&mut self, name: &str) -> Var {
        if let Some(&var) = self.by_name.get(name) {
            return var;
        }
        let var = self.push_var(Some(name.to_owned()));
        self.by_name.insert(name.to_owned(), var);
        self.projected.push(var);
        var
    }

    /// Create a fresh auxiliary (non-projected) variable.
    pub fn aux_var(&mut self) -> Var {
        self.push_var(None)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_var(&mut self, name: Option<String>) -> Var {
        // Literal codes need one spare bit; 2^31 variables is far beyond any model.
        let index = self.vars.len() as u32;
        self.vars.push(VarInfo { name });
        Var::new(index)
    }

    /// Look up a projected variable by name.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    /// Name of a projected variable; `None` for auxiliaries.
    #[must_use]
    pub fn name(&self, var: Var) -> Option<&str> {
        self.vars.get(var.index()).and_then(|v| v.name.as_deref())
    }

    /// Total number of variables, projected and auxiliary.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Projected variables in creation order.
    #[must_use]
    pub fn projected_vars(&self) -> &[Var] {
        &self.projected
    }

    /// The clause database.
    #[must_use]
    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Returns `true` once an empty clause has been added.
    #[must_use]
    pub const fn has_empty_clause(&self) -> bool {
        self.has_empty_clause
    }

    /// Names of the projected variables set to true in `assignment`.
    #[must_use]
    pub fn selected_names(&self, assignment: &Assignment) -> Vec<&str> {
        self.projected
            .iter()
            .filter(|&&v| assignment.value(v))
            .filter_map(|&v| self.name(v))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Clauses
    // -----------------------------------------------------------------------

    /// Add a clause. Duplicate literals are removed and tautologies dropped.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) {
        let mut clause: Vec<Lit> = lits.into_iter().collect();
        clause.sort_unstable();
        clause.dedup();
        if clause.windows(2).any(|w| w[0].var() == w[1].var()) {
            return;
        }
        if clause.is_empty() {
            self.has_empty_clause = true;
        }
        self.clauses.push(clause);
    }

    /// Force `lit` to hold.
    pub fn assert_lit(&mut self, lit: Lit) {
        self.add_clause([lit]);
    }

    /// Exclude the projected part of `assignment` from future solutions.
    pub fn block(&mut self, assignment: &Assignment) {
        let clause: Vec<Lit> = self
            .projected
            .iter()
            .map(|&v| {
                if assignment.value(v) {
                    v.negative()
                } else {
                    v.positive()
                }
            })
            .collect();
        self.add_clause(clause);
    }

    // -----------------------------------------------------------------------
    // Constants
    // -----------------------------------------------------------------------

    /// The constant true literal (allocated and asserted on first use).
    pub fn true_lit(&mut self) -> Lit {
        if let Some(lit) = self.constant_true {
            return lit;
        }
        let lit = self.aux_var().positive();
        self.assert_lit(lit);
        self.constant_true = Some(lit);
        lit
    }

    /// The constant false literal.
    pub fn false_lit(&mut self) -> Lit {
        !self.true_lit()
    }

    fn is_true(&self, lit: Lit) -> bool {
        self.constant_true == Some(lit)
    }

    fn is_false(&self, lit: Lit) -> bool {
        self.constant_true == Some(!lit)
    }

    // -----------------------------------------------------------------------
    // Reification
    // -----------------------------------------------------------------------

    /// A literal equivalent to the conjunction of `lits`.
    pub fn and(&mut self, lits: &[Lit]) -> Lit {
        if lits.iter().any(|&l| self.is_false(l)) {
            return self.false_lit();
        }
        let mut operands: Vec<Lit> = lits.iter().copied().filter(|&l| !self.is_true(l)).collect();
        operands.sort_unstable();
        operands.dedup();
        match operands.as_slice() {
            [] => return self.true_lit(),
            [single] => return *single,
            _ => {}
        }
        if operands.windows(2).any(|w| w[0].var() == w[1].var()) {
            return self.false_lit();
        }

        let out = self.aux_var().positive();
        for &l in &operands {
            self.add_clause([!out, l]);
        }
        let mut back: Vec<Lit> = operands.iter().map(|&l| !l).collect();
        back.push(out);
        self.add_clause(back);
        out
    }

    /// A literal equivalent to the disjunction of `lits`.
    pub fn or(&mut self, lits: &[Lit]) -> Lit {
        let negated: Vec<Lit> = lits.iter().map(|&l| !l).collect();
        !self.and(&negated)
    }

    /// A literal equivalent to `a ⇒ b`.
    pub fn implies(&mut self, a: Lit, b: Lit) -> Lit {
        self.or(&[!a, b])
    }

    /// A literal equivalent to `a ⇔ b`.
    pub fn iff(&mut self, a: Lit, b: Lit) -> Lit {
        if a == b {
            return self.true_lit();
        }
        if a == !b {
            return self.false_lit();
        }
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        if self.is_false(a) {
            return !b;
        }
        if self.is_false(b) {
            return !a;
        }

        let out = self.aux_var().positive();
        self.add_clause([!out, !a, b]);
        self.add_clause([!out, a, !b]);
        self.add_clause([out, a, b]);
        self.add_clause([out, !a, !b]);
        out
    }

    /// A literal equivalent to "every literal in `lits` is false".
    pub fn all_false(&mut self, lits: &[Lit]) -> Lit {
        let negated: Vec<Lit> = lits.iter().map(|&l| !l).collect();
        self.and(&negated)
    }

    /// A literal equivalent to `lower <= |{l ∈ lits : l}| <= upper`.
    ///
    /// Uses a sequential counter: after each operand, one literal per
    /// reachable count says "exactly k of the operands so far are true".
    pub fn count_in_range(&mut self, lits: &[Lit], lower: usize, upper: usize) -> Lit {
        let n = lits.len();
        let upper = upper.min(n);
        if lower > upper {
            return self.false_lit();
        }
        if lower == 0 && upper == n {
            return self.true_lit();
        }

        let t = self.true_lit();
        let mut exact: Vec<Lit> = vec![t];
        for (i, &x) in lits.iter().enumerate() {
            let mut next = Vec::with_capacity(i + 2);
            for k in 0..=i + 1 {
                let stay = (k <= i).then(|| exact[k]);
                let step = (k >= 1).then(|| exact[k - 1]);
                let lit = match (stay, step) {
                    (Some(s), Some(p)) => {
                        let kept = self.and(&[s, !x]);
                        let moved = self.and(&[p, x]);
                        self.or(&[kept, moved])
                    }
                    (Some(s), None) => self.and(&[s, !x]),
                    (None, Some(p)) => self.and(&[p, x]),
                    (None, None) => self.false_lit(),
                };
                next.push(lit);
            }
            exact = next;
        }
        let window = exact[lower..=upper].to_vec();
        self.or(&window)
    }
}
