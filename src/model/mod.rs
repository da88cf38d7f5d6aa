//! Feature-model data types: regions, features, constraints, models.

pub mod constraint;
pub mod feature;
pub mod feature_model;
pub mod region;

pub use constraint::{BinaryOp, CmpOp, Constraint, ConstraintKind, ConstraintTag, Operand, Term};
pub use feature::{Feature, FeatureRole};
pub use feature_model::{Model, ModelError};
pub use region::{MARKER_PREFIX, REGION_FEATURE, Region};
