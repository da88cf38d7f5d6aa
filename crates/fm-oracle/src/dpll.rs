//! In-tree DPLL backend.
//!
//! A complete, chronological-backtracking DPLL search with two-watched-literal
//! unit propagation. Branching visits projected variables first (in creation
//! order, negative polarity first), so once every feature variable is decided
//! the auxiliary reification variables are fixed by propagation alone.
//!
//! Each query builds its search state from scratch; nothing learned in one
//! query leaks into the next.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::OracleError;
use crate::model::OracleModel;
use crate::oracle::Oracle;
use crate::types::{Assignment, Lit, Var};

/// How often (in decisions) the wall clock is consulted.
const TIMEOUT_CHECK_INTERVAL: u64 = 256;

/// Resource limits applied to every query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverLimits {
    /// Maximum branching decisions per query (`None` = unlimited).
    pub max_decisions: Option<u64>,
    /// Maximum wall-clock time per query (`None` = unlimited).
    pub timeout: Option<Duration>,
}

/// DPLL-based [`Oracle`].
#[derive(Debug, Default)]
pub struct DpllOracle {
    limits: SolverLimits,
    queries: u64,
    decisions: u64,
}

impl DpllOracle {
    /// An oracle without resource limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An oracle enforcing `limits` on every query.
    #[must_use]
    pub fn with_limits(limits: SolverLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// The limits in force.
    #[must_use]
    pub const fn limits(&self) -> SolverLimits {
        self.limits
    }

    /// Branching decisions made across all queries since the last reset.
    #[must_use]
    pub const fn total_decisions(&self) -> u64 {
        self.decisions
    }
}

impl Oracle for DpllOracle {
    fn solve_one(&mut self, model: &OracleModel) -> Result<Option<Assignment>, OracleError> {
        self.queries += 1;
        let mut search = Search::new(model, self.limits);
        let result = search.run();
        self.decisions += search.decisions;
        trace!(
            vars = model.num_vars(),
            clauses = model.clauses().len(),
            decisions = search.decisions,
            sat = matches!(result, Ok(Some(_))),
            "dpll query"
        );
        result
    }

    fn reset(&mut self) {
        self.queries = 0;
        self.decisions = 0;
    }

    fn queries(&self) -> u64 {
        self.queries
    }
}

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

enum Watch {
    Keep,
    Move(Lit),
    Unit,
}

struct Search {
    clauses: Vec<Vec<Lit>>,
    /// Indexed by literal code: clauses currently watching that literal.
    watches: Vec<Vec<usize>>,
    units: Vec<Lit>,
    trivially_unsat: bool,
    values: Vec<Option<bool>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    /// Decision literal per level, and whether it is already the flipped branch.
    decision_stack: Vec<(Lit, bool)>,
    qhead: usize,
    order: Vec<Var>,
    limits: SolverLimits,
    started: Instant,
    decisions: u64,
}

fn lit_value(values: &[Option<bool>], lit: Lit) -> Option<bool> {
    values[lit.var().index()].map(|v| lit.eval(v))
}

impl Search {
    fn new(model: &OracleModel, limits: SolverLimits) -> Self {
        let n = model.num_vars();
        let mut watches = vec![Vec::new(); n * 2];
        let mut clauses = Vec::new();
        let mut units = Vec::new();
        let mut trivially_unsat = model.has_empty_clause();

        for clause in model.clauses() {
            match clause.len() {
                0 => trivially_unsat = true,
                1 => units.push(clause[0]),
                _ => {
                    let idx = clauses.len();
                    watches[clause[0].code()].push(idx);
                    watches[clause[1].code()].push(idx);
                    clauses.push(clause.clone());
                }
            }
        }

        let mut order: Vec<Var> = model.projected_vars().to_vec();
        let mut is_projected = vec![false; n];
        for v in &order {
            is_projected[v.index()] = true;
        }
        order.extend(
            (0..n)
                .filter(|&i| !is_projected[i])
                .map(|i| Var::new(u32::try_from(i).unwrap_or(u32::MAX))),
        );

        Self {
            clauses,
            watches,
            units,
            trivially_unsat,
            values: vec![None; n],
            trail: Vec::with_capacity(n),
            trail_lim: Vec::new(),
            decision_stack: Vec::new(),
            qhead: 0,
            order,
            limits,
            started: Instant::now(),
            decisions: 0,
        }
    }

    fn run(&mut self) -> Result<Option<Assignment>, OracleError> {
        if self.trivially_unsat {
            return Ok(None);
        }
        let units = std::mem::take(&mut self.units);
        for lit in units {
            if !self.enqueue(lit) {
                return Ok(None);
            }
        }

        loop {
            if self.propagate().is_some() {
                if !self.backtrack() {
                    return Ok(None);
                }
                continue;
            }

            let Some(var) = self.pick_branch_var() else {
                return Ok(Some(self.assignment()));
            };
            self.check_limits()?;
            self.decisions += 1;
            self.trail_lim.push(self.trail.len());
            let lit = var.negative();
            self.decision_stack.push((lit, false));
            self.enqueue(lit);
        }
    }

    fn check_limits(&self) -> Result<(), OracleError> {
        if let Some(limit) = self.limits.max_decisions {
            if self.decisions >= limit {
                return Err(OracleError::BudgetExhausted { limit });
            }
        }
        if let Some(timeout) = self.limits.timeout {
            if self.decisions % TIMEOUT_CHECK_INTERVAL == 0 {
                let elapsed = self.started.elapsed();
                if elapsed > timeout {
                    return Err(OracleError::Timeout { elapsed });
                }
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, lit: Lit) -> bool {
        match lit_value(&self.values, lit) {
            Some(v) => v,
            None => {
                self.values[lit.var().index()] = Some(!lit.is_negated());
                self.trail.push(lit);
                true
            }
        }
    }

    /// Unit propagation. Returns the index of a conflicting clause, if any.
    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let false_lit = !self.trail[self.qhead];
            self.qhead += 1;

            let mut watchers = std::mem::take(&mut self.watches[false_lit.code()]);
            let mut conflict = None;
            let mut i = 0;
            while i < watchers.len() {
                let ci = watchers[i];
                let (first, watch) = {
                    let clause = &mut self.clauses[ci];
                    if clause[0] == false_lit {
                        clause.swap(0, 1);
                    }
                    let first = clause[0];
                    if lit_value(&self.values, first) == Some(true) {
                        (first, Watch::Keep)
                    } else {
                        let values = &self.values;
                        let replacement = (2..clause.len())
                            .find(|&k| lit_value(values, clause[k]) != Some(false));
                        match replacement {
                            Some(k) => {
                                clause.swap(1, k);
                                (first, Watch::Move(clause[1]))
                            }
                            None => (first, Watch::Unit),
                        }
                    }
                };

                match watch {
                    Watch::Keep => i += 1,
                    Watch::Move(lit) => {
                        self.watches[lit.code()].push(ci);
                        watchers.swap_remove(i);
                    }
                    Watch::Unit => {
                        if !self.enqueue(first) {
                            conflict = Some(ci);
                            break;
                        }
                        i += 1;
                    }
                }
            }
            self.watches[false_lit.code()] = watchers;

            if conflict.is_some() {
                return conflict;
            }
        }
        None
    }

    /// Undo to the most recent unflipped decision and take its other branch.
    /// Returns `false` once the search space is exhausted.
    fn backtrack(&mut self) -> bool {
        while let Some((lit, flipped)) = self.decision_stack.pop() {
            let level = self.decision_stack.len();
            self.cancel_until(level);
            if !flipped {
                self.trail_lim.push(self.trail.len());
                self.decision_stack.push((!lit, true));
                self.enqueue(!lit);
                return true;
            }
        }
        false
    }

    fn cancel_until(&mut self, level: usize) {
        if self.trail_lim.len() <= level {
            return;
        }
        let start = self.trail_lim[level];
        for lit in &self.trail[start..] {
            self.values[lit.var().index()] = None;
        }
        self.trail.truncate(start);
        self.trail_lim.truncate(level);
        self.qhead = self.trail.len();
    }

    fn pick_branch_var(&self) -> Option<Var> {
        self.order
            .iter()
            .copied()
            .find(|v| self.values[v.index()].is_none())
    }

    fn assignment(&self) -> Assignment {
        Assignment::new(self.values.iter().map(|v| v.unwrap_or(false)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(names: &[&str]) -> (OracleModel, Vec<Lit>) {
        let mut m = OracleModel::new();
        let lits = names.iter().map(|n| m.named_var(n).positive()).collect();
        (m, lits)
    }

    #[test]
    fn empty_model_has_exactly_one_solution() {
        let m = OracleModel::new();
        let mut oracle = DpllOracle::new();
        assert!(oracle.is_satisfiable(&m).unwrap());
        assert_eq!(oracle.count_solutions(&m).unwrap(), 1);
    }

    #[test]
    fn free_variables_count_as_powers_of_two() {
        let (m, _) = model_with(&["a", "b", "c"]);
        let mut oracle = DpllOracle::new();
        assert_eq!(oracle.count_solutions(&m).unwrap(), 8);
    }

    #[test]
    fn contradictory_units_are_unsat() {
        let (mut m, lits) = model_with(&["a"]);
        m.assert_lit(lits[0]);
        m.assert_lit(!lits[0]);
        let mut oracle = DpllOracle::new();
        assert!(!oracle.is_satisfiable(&m).unwrap());
    }

    #[test]
    fn propagation_chain_is_followed() {
        let (mut m, l) = model_with(&["a", "b", "c", "d"]);
        m.assert_lit(l[0]);
        m.add_clause([!l[0], l[1]]);
        m.add_clause([!l[1], l[2]]);
        m.add_clause([!l[2], !l[3]]);
        let mut oracle = DpllOracle::new();
        let a = oracle.solve_one(&m).unwrap().unwrap();
        assert!(a.satisfies(l[0]) && a.satisfies(l[1]) && a.satisfies(l[2]));
        assert!(a.satisfies(!l[3]));
        assert_eq!(oracle.count_solutions(&m).unwrap(), 1);
    }

    #[test]
    fn exactly_one_of_three() {
        let (mut m, l) = model_with(&["a", "b", "c"]);
        let card = m.count_in_range(&l, 1, 1);
        m.assert_lit(card);
        let mut oracle = DpllOracle::new();
        assert_eq!(oracle.count_solutions(&m).unwrap(), 3);
    }

    #[test]
    fn pigeonhole_three_into_two_is_unsat() {
        // p[i][h]: pigeon i sits in hole h.
        let mut m = OracleModel::new();
        let p: Vec<Vec<Lit>> = (0..3)
            .map(|i| (0..2).map(|h| m.named_var(&format!("p{i}{h}")).positive()).collect())
            .collect();
        for row in &p {
            m.add_clause(row.clone());
        }
        for h in 0..2 {
            for i in 0..3 {
                for j in (i + 1)..3 {
                    m.add_clause([!p[i][h], !p[j][h]]);
                }
            }
        }
        let mut oracle = DpllOracle::new();
        assert!(!oracle.is_satisfiable(&m).unwrap());
    }

    #[test]
    fn decision_budget_surfaces_as_error() {
        let (m, _) = model_with(&["a", "b"]);
        let mut oracle = DpllOracle::with_limits(SolverLimits {
            max_decisions: Some(0),
            timeout: None,
        });
        let err = oracle.is_satisfiable(&m).unwrap_err();
        assert!(matches!(err, OracleError::BudgetExhausted { limit: 0 }));
    }

    #[test]
    fn forced_model_needs_no_decisions_under_zero_budget() {
        let (mut m, l) = model_with(&["a"]);
        m.assert_lit(l[0]);
        let mut oracle = DpllOracle::with_limits(SolverLimits {
            max_decisions: Some(0),
            timeout: None,
        });
        assert!(oracle.is_satisfiable(&m).unwrap());
    }

    #[test]
    fn reset_clears_statistics() {
        let (m, _) = model_with(&["a"]);
        let mut oracle = DpllOracle::new();
        oracle.count_solutions(&m).unwrap();
        assert_eq!(oracle.queries(), 3);
        assert!(oracle.total_decisions() > 0);
        oracle.reset();
        assert_eq!(oracle.queries(), 0);
        assert_eq!(oracle.total_decisions(), 0);
    }
}
