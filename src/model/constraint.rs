//! Constraints: the expression tree of a feature model.
//!
//! A [`Constraint`] is an immutable value. Changing its region guard, its
//! negation flag or its classification produces a new value; nothing is
//! mutated in place, so a clone taken for a trial query never shares state
//! with the constraint still sitting in a live model.
//!
//! # Classification
//!
//! | Tag           | Meaning                                              |
//! |---------------|------------------------------------------------------|
//! | `Regular`     | Came from an input model; checked and minimized.     |
//! | `FeatureTree` | Structural implication added by the merge engine.    |
//! | `Custom`      | Scaffolding (synthetic root, region hierarchy).      |
//!
//! `FeatureTree` and `Custom` constraints bypass the inconsistency check and
//! cleanup and are copied through unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::region::Region;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Boolean connective of a [`ConstraintKind::Binary`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    And,
    Or,
    Implies,
    Iff,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::And => "&",
            Self::Or => "|",
            Self::Implies => "=>",
            Self::Iff => "<=>",
        }
    }
}

/// Relation of a [`ConstraintKind::Comparison`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl CmpOp {
    /// Evaluate the relation on two integers.
    #[must_use]
    pub const fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Neq => left != right,
            Self::Lt => left < right,
            Self::Gt => left > right,
            Self::Lte => left <= right,
            Self::Gte => left >= right,
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
        }
    }
}

// ---------------------------------------------------------------------------
// Operands
// ---------------------------------------------------------------------------

/// Operand of a binary node: a feature or a nested constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Feature(String),
    Constraint(Box<Constraint>),
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Self::Feature(name.to_owned())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Self::Feature(name)
    }
}

impl From<Constraint> for Operand {
    fn from(c: Constraint) -> Self {
        Self::Constraint(Box::new(c))
    }
}

/// Operand of a comparison: a feature or nested constraint read as 0/1, or
/// an integer constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Feature(String),
    Constraint(Box<Constraint>),
    Constant(i64),
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Self::Feature(name.to_owned())
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Self::Constant(value)
    }
}

impl From<Constraint> for Term {
    fn from(c: Constraint) -> Self {
        Self::Constraint(Box::new(c))
    }
}

// ---------------------------------------------------------------------------
// ConstraintKind / ConstraintTag
// ---------------------------------------------------------------------------

/// The shape of a constraint node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Leaf: the feature is selected.
    FeatureRef(String),
    /// Logical negation of a nested constraint.
    Not(Box<Constraint>),
    /// Boolean connective over two operands.
    Binary {
        left: Operand,
        op: BinaryOp,
        right: Operand,
    },
    /// Parent/children decomposition selecting `lower..=upper` children
    /// whenever the parent is selected.
    Group {
        parent: String,
        children: Vec<String>,
        lower: u32,
        upper: u32,
    },
    /// Integer relation over 0/1 features and constants.
    Comparison { left: Term, op: CmpOp, right: Term },
    /// True iff at least one listed constraint is violated.
    OrNegation(Vec<Constraint>),
}

/// Classification of a constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintTag {
    /// From an input model.
    #[default]
    Regular,
    /// Structural implication synthesized by the merge engine.
    FeatureTree,
    /// Scaffolding synthesized by the merge engine or by contextualization.
    Custom,
}

// ---------------------------------------------------------------------------
// Constraint
// ---------------------------------------------------------------------------

/// A feature-model constraint with its region guard, negation flag and tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Region>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    negated: bool,
    #[serde(default)]
    tag: ConstraintTag,
}

impl Constraint {
    /// A global, non-negated, regular constraint of the given shape.
    #[must_use]
    pub const fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            context: None,
            negated: false,
            tag: ConstraintTag::Regular,
        }
    }

    /// `name` is selected.
    pub fn feature(name: impl Into<String>) -> Self {
        Self::new(ConstraintKind::FeatureRef(name.into()))
    }

    /// Logical negation of `inner`.
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::new(ConstraintKind::Not(Box::new(inner)))
    }

    /// `left op right`.
    pub fn binary(left: impl Into<Operand>, op: BinaryOp, right: impl Into<Operand>) -> Self {
        Self::new(ConstraintKind::Binary {
            left: left.into(),
            op,
            right: right.into(),
        })
    }

    /// `left & right`.
    pub fn and(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::binary(left, BinaryOp::And, right)
    }

    /// `left | right`.
    pub fn or(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::binary(left, BinaryOp::Or, right)
    }

    /// `left => right`.
    pub fn implies(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::binary(left, BinaryOp::Implies, right)
    }

    /// `left <=> right`.
    pub fn iff(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::binary(left, BinaryOp::Iff, right)
    }

    /// A group over `children` of `parent` selecting `lower..=upper` of them.
    pub fn group<S: Into<String>>(
        parent: impl Into<String>,
        children: impl IntoIterator<Item = S>,
        lower: u32,
        upper: u32,
    ) -> Self {
        Self::new(ConstraintKind::Group {
            parent: parent.into(),
            children: children.into_iter().map(Into::into).collect(),
            lower,
            upper,
        })
    }

    /// `left op right` over integers.
    pub fn comparison(left: impl Into<Term>, op: CmpOp, right: impl Into<Term>) -> Self {
        Self::new(ConstraintKind::Comparison {
            left: left.into(),
            op,
            right: right.into(),
        })
    }

    /// True iff at least one of `constraints` is violated.
    #[must_use]
    pub const fn or_negation(constraints: Vec<Self>) -> Self {
        Self::new(ConstraintKind::OrNegation(constraints))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The node shape.
    #[must_use]
    pub const fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// The region guard, if contextualized.
    #[must_use]
    pub const fn context(&self) -> Option<Region> {
        self.context
    }

    /// Returns `true` if the constraint only holds inside its region.
    #[must_use]
    pub const fn is_contextualized(&self) -> bool {
        self.context.is_some()
    }

    /// Returns `true` if the compiled value is complemented.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// The classification tag.
    #[must_use]
    pub const fn tag(&self) -> ConstraintTag {
        self.tag
    }

    /// Scaffolding synthesized for roots and the region hierarchy.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self.tag, ConstraintTag::Custom)
    }

    /// Structural implication synthesized by the merge engine.
    #[must_use]
    pub const fn is_feature_tree(&self) -> bool {
        matches!(self.tag, ConstraintTag::FeatureTree)
    }

    /// Custom or feature-tree: copied through the merge phases verbatim.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        !matches!(self.tag, ConstraintTag::Regular)
    }

    /// Returns `true` for [`ConstraintKind::Group`].
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.kind, ConstraintKind::Group { .. })
    }

    // -----------------------------------------------------------------------
    // Transformations
    // -----------------------------------------------------------------------

    /// The same constraint guarded by `region`.
    #[must_use]
    pub fn contextualized(self, region: Region) -> Self {
        Self {
            context: Some(region),
            ..self
        }
    }

    /// The same constraint holding everywhere.
    #[must_use]
    pub fn decontextualized(self) -> Self {
        Self {
            context: None,
            ..self
        }
    }

    /// The same constraint with the negation flag set to `negated`.
    #[must_use]
    pub fn with_negation(self, negated: bool) -> Self {
        Self { negated, ..self }
    }

    /// The same constraint with a different tag.
    #[must_use]
    pub fn with_tag(self, tag: ConstraintTag) -> Self {
        Self { tag, ..self }
    }

    /// For a group, the same group with its children replaced; any other
    /// shape is returned unchanged.
    #[must_use]
    pub fn with_group_children(self, new_children: Vec<String>) -> Self {
        let Self {
            kind,
            context,
            negated,
            tag,
        } = self;
        let kind = match kind {
            ConstraintKind::Group {
                parent,
                lower,
                upper,
                ..
            } => ConstraintKind::Group {
                parent,
                children: new_children,
                lower,
                upper,
            },
            other => other,
        };
        Self {
            kind,
            context,
            negated,
            tag,
        }
    }

    /// Every feature name this constraint mentions, first occurrence first.
    #[must_use]
    pub fn referenced_features(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_features(&mut out);
        let mut seen = std::collections::HashSet::new();
        out.retain(|name| seen.insert(*name));
        out
    }

    fn collect_features<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            ConstraintKind::FeatureRef(name) => out.push(name),
            ConstraintKind::Not(inner) => inner.collect_features(out),
            ConstraintKind::Binary { left, right, .. } => {
                for operand in [left, right] {
                    match operand {
                        Operand::Feature(name) => out.push(name),
                        Operand::Constraint(c) => c.collect_features(out),
                    }
                }
            }
            ConstraintKind::Group {
                parent, children, ..
            } => {
                out.push(parent);
                out.extend(children.iter().map(String::as_str));
            }
            ConstraintKind::Comparison { left, right, .. } => {
                for term in [left, right] {
                    match term {
                        Term::Feature(name) => out.push(name),
                        Term::Constraint(c) => c.collect_features(out),
                        Term::Constant(_) => {}
                    }
                }
            }
            ConstraintKind::OrNegation(list) => {
                for c in list {
                    c.collect_features(out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(name) => f.write_str(name),
            Self::Constraint(c) => write!(f, "({c})"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(name) => f.write_str(name),
            Self::Constraint(c) => write!(f, "({c})"),
            Self::Constant(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureRef(name) => f.write_str(name),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::Binary { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::Group {
                parent,
                children,
                lower,
                upper,
            } => write!(f, "{parent} -> [{}] {lower}..{upper}", children.join(", ")),
            Self::Comparison { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::OrNegation(list) => {
                f.write_str("any-violated{")?;
                for (i, c) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~[{}]", self.kind)?;
        } else {
            write!(f, "{}", self.kind)?;
        }
        if let Some(region) = self.context {
            write!(f, " @{region}")?;
        }
        Ok(())
    }
}
