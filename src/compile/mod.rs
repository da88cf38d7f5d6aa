//! Constraint compiler: [`Model`] → [`OracleModel`].
//!
//! One projected variable per feature, in feature order; the root is asserted.
//! Every constraint is reified to a literal and posted at top level. The
//! negation flag complements the body; a contextualized constraint then holds
//! whenever its region marker is deselected, so posting it asserts
//! `marker ⇒ body` (or `marker ⇒ ¬body` when negated).
//!
//! "Violated inside its region" is the complement of that literal,
//! `marker ∧ ¬body`. Trials ask for it through a single-member
//! [`ConstraintKind::OrNegation`].

use std::fmt;

use fm_oracle::{Lit, OracleModel};
use tracing::trace;

use crate::model::{BinaryOp, Constraint, ConstraintKind, Model, Operand, Region, Term};

/// Smallest comparison constant the compiler accepts.
pub const MIN_CONSTANT: i64 = -2_147_483_648;
/// Largest comparison constant the compiler accepts.
pub const MAX_CONSTANT: i64 = 2_147_483_647;

// ---------------------------------------------------------------------------
// CompileError
// ---------------------------------------------------------------------------

/// Errors raised while compiling a model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// A constraint, root or region guard names a feature the model lacks.
    UnknownFeatureReference {
        /// The missing feature name.
        name: String,
    },
    /// The constraint cannot be expressed.
    UnsupportedConstraintKind {
        /// Rendering of the offending constraint.
        constraint: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A comparison constant is outside `MIN_CONSTANT..=MAX_CONSTANT`.
    DomainOverflow {
        /// The offending constant.
        value: i64,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFeatureReference { name } => {
                write!(f, "constraint references unknown feature `{name}`")
            }
            Self::UnsupportedConstraintKind { constraint, reason } => {
                write!(f, "cannot compile `{constraint}`: {reason}")
            }
            Self::DomainOverflow { value } => write!(
                f,
                "comparison constant {value} is outside {MIN_CONSTANT}..={MAX_CONSTANT}"
            ),
        }
    }
}

impl std::error::Error for CompileError {}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compile `model` with its own constraint list.
///
/// # Errors
/// See [`CompileError`]. No partial model is returned.
pub fn compile(model: &Model) -> Result<OracleModel, CompileError> {
    compile_with(model, model.constraints())
}

/// Compile `model`'s features and root with an arbitrary constraint list.
///
/// The merge engine uses this to build trial instances without cloning the
/// model it is working on.
///
/// # Errors
/// See [`CompileError`]. No partial model is returned.
pub fn compile_with<'c>(
    model: &Model,
    constraints: impl IntoIterator<Item = &'c Constraint>,
) -> Result<OracleModel, CompileError> {
    let mut compiler = Compiler::new(model)?;
    let mut posted = 0_usize;
    for constraint in constraints {
        compiler.post(constraint)?;
        posted += 1;
    }
    trace!(
        features = model.features().len(),
        constraints = posted,
        vars = compiler.out.num_vars(),
        clauses = compiler.out.clauses().len(),
        "compiled model"
    );
    Ok(compiler.out)
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

struct Compiler {
    out: OracleModel,
}

impl Compiler {
    fn new(model: &Model) -> Result<Self, CompileError> {
        let mut out = OracleModel::new();
        for feature in model.features() {
            out.named_var(feature.name());
        }
        let mut compiler = Self { out };
        if let Some(root) = model.root() {
            let lit = compiler.feature(root)?;
            compiler.out.assert_lit(lit);
        }
        Ok(compiler)
    }

    /// Assert `constraint` at top level.
    fn post(&mut self, constraint: &Constraint) -> Result<(), CompileError> {
        let lit = self.node(constraint)?;
        if !constraint.is_negated() {
            self.post_child_implications(constraint)?;
        }
        self.out.assert_lit(lit);
        Ok(())
    }

    /// Each group child implies its parent, guarded by the region marker.
    fn post_child_implications(&mut self, constraint: &Constraint) -> Result<(), CompileError> {
        let ConstraintKind::Group {
            parent, children, ..
        } = constraint.kind()
        else {
            return Ok(());
        };
        let parent = self.feature(parent)?;
        let guard = constraint
            .context()
            .map(|region| self.marker(region, constraint))
            .transpose()?;
        for child in children {
            let child = self.feature(child)?;
            let mut clause = vec![!child, parent];
            clause.extend(guard.map(|m| !m));
            self.out.add_clause(clause);
        }
        Ok(())
    }

    /// The literal that is true exactly when `constraint`, flags included,
    /// is satisfied: the body, complemented when negated, under the region
    /// guard when contextualized.
    fn node(&mut self, constraint: &Constraint) -> Result<Lit, CompileError> {
        let body = self.body(constraint)?;
        let body = if constraint.is_negated() { !body } else { body };
        match constraint.context() {
            Some(region) => {
                let marker = self.marker(region, constraint)?;
                Ok(self.out.implies(marker, body))
            }
            None => Ok(body),
        }
    }

    fn body(&mut self, constraint: &Constraint) -> Result<Lit, CompileError> {
        match constraint.kind() {
            ConstraintKind::FeatureRef(name) => self.feature(name),
            ConstraintKind::Not(inner) => {
                reject_or_negation(inner, constraint)?;
                Ok(!self.node(inner)?)
            }
            ConstraintKind::Binary { left, op, right } => {
                let a = self.operand(left, constraint)?;
                let b = self.operand(right, constraint)?;
                Ok(match op {
                    BinaryOp::And => self.out.and(&[a, b]),
                    BinaryOp::Or => self.out.or(&[a, b]),
                    BinaryOp::Implies => self.out.implies(a, b),
                    BinaryOp::Iff => self.out.iff(a, b),
                })
            }
            ConstraintKind::Group {
                parent,
                children,
                lower,
                upper,
            } => {
                if lower > upper {
                    return Err(unsupported(constraint, "group lower bound exceeds upper bound"));
                }
                let p = self.feature(parent)?;
                let cs = children
                    .iter()
                    .map(|c| self.feature(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let card = self
                    .out
                    .count_in_range(&cs, widen(*lower), widen(*upper));
                let zero = self.out.all_false(&cs);
                let selected = self.out.and(&[p, card]);
                let deselected = self.out.and(&[!p, zero]);
                Ok(self.out.or(&[selected, deselected]))
            }
            ConstraintKind::Comparison { left, op, right } => {
                let lhs = self.domain(left, constraint)?;
                let rhs = self.domain(right, constraint)?;
                let mut cases = Vec::new();
                for &(lv, lc) in &lhs {
                    for &(rv, rc) in &rhs {
                        if op.holds(lv, rv) {
                            cases.push(self.out.and(&[lc, rc]));
                        }
                    }
                }
                Ok(self.out.or(&cases))
            }
            ConstraintKind::OrNegation(list) => {
                let mut violations = Vec::with_capacity(list.len());
                for listed in list {
                    reject_or_negation(listed, constraint)?;
                    violations.push(!self.node(listed)?);
                }
                Ok(self.out.or(&violations))
            }
        }
    }

    fn operand(&mut self, operand: &Operand, outer: &Constraint) -> Result<Lit, CompileError> {
        match operand {
            Operand::Feature(name) => self.feature(name),
            Operand::Constraint(inner) => {
                reject_or_negation(inner, outer)?;
                self.node(inner)
            }
        }
    }

    /// Every value a term can take, paired with the literal selecting it.
    fn domain(&mut self, term: &Term, outer: &Constraint) -> Result<Vec<(i64, Lit)>, CompileError> {
        let lit = match term {
            Term::Constant(value) => {
                if !(MIN_CONSTANT..=MAX_CONSTANT).contains(value) {
                    return Err(CompileError::DomainOverflow { value: *value });
                }
                let t = self.out.true_lit();
                return Ok(vec![(*value, t)]);
            }
            Term::Feature(name) => self.feature(name)?,
            Term::Constraint(inner) => {
                reject_or_negation(inner, outer)?;
                self.node(inner)?
            }
        };
        Ok(vec![(0, !lit), (1, lit)])
    }

    fn feature(&self, name: &str) -> Result<Lit, CompileError> {
        self.out
            .var(name)
            .map(|v| v.positive())
            .ok_or_else(|| CompileError::UnknownFeatureReference {
                name: name.to_owned(),
            })
    }

    fn marker(&self, region: Region, constraint: &Constraint) -> Result<Lit, CompileError> {
        let name = region
            .marker_name()
            .ok_or_else(|| unsupported(constraint, "context is not a source region"))?;
        self.feature(&name)
    }
}

fn reject_or_negation(inner: &Constraint, outer: &Constraint) -> Result<(), CompileError> {
    if matches!(inner.kind(), ConstraintKind::OrNegation(_)) {
        return Err(unsupported(outer, "or-negation may only appear at top level"));
    }
    Ok(())
}

fn unsupported(constraint: &Constraint, reason: &'static str) -> CompileError {
    CompileError::UnsupportedConstraintKind {
        constraint: constraint.to_string(),
        reason,
    }
}

fn widen(bound: u32) -> usize {
    usize::try_from(bound).unwrap_or(usize::MAX)
}
