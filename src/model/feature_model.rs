//! The feature model: features, root, ordered constraints, region tag.
//!
//! Feature order is insertion order and constraint order is list order. Both
//! drive the merge engine's iteration and therefore its output, so neither is
//! ever derived from a hash map.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::constraint::{Constraint, ConstraintTag};
use super::feature::{Feature, FeatureRole};
use super::region::Region;

// ---------------------------------------------------------------------------
// ModelError
// ---------------------------------------------------------------------------

/// Errors raised while building or transforming a [`Model`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelError {
    /// Two features share a name.
    DuplicateFeature {
        /// The duplicated name.
        name: String,
    },
    /// A root, group parent or constraint names a feature the model lacks.
    UnknownFeatureReference {
        /// The missing name.
        name: String,
    },
    /// The operation needs a source region (`A`..`I`).
    NotASourceRegion {
        /// The region the model carried instead.
        region: Region,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFeature { name } => write!(f, "duplicate feature `{name}`"),
            Self::UnknownFeatureReference { name } => {
                write!(f, "reference to unknown feature `{name}`")
            }
            Self::NotASourceRegion { region } => {
                write!(f, "region {region} is not a source region (expected A..I)")
            }
        }
    }
}

impl std::error::Error for ModelError {}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A feature model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModelRepr", into = "ModelRepr")]
pub struct Model {
    region: Region,
    features: Vec<Feature>,
    index: HashMap<String, usize>,
    root: Option<String>,
    constraints: Vec<Constraint>,
    solver_queries: u64,
}

impl Model {
    /// An empty model tagged with `region`.
    #[must_use]
    pub fn new(region: Region) -> Self {
        Self {
            region,
            features: Vec::new(),
            index: HashMap::new(),
            root: None,
            constraints: Vec::new(),
            solver_queries: 0,
        }
    }

    /// A model whose only feature is its root.
    pub fn with_root(region: Region, root: impl Into<String>) -> Self {
        let root = root.into();
        let mut model = Self::new(region);
        model.ensure_feature(Feature::new(root.clone()));
        model.root = Some(root);
        model
    }

    // -----------------------------------------------------------------------
    // Region / root
    // -----------------------------------------------------------------------

    /// The region tag.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Retag the model.
    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    /// Name of the root feature, if any.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Make an existing feature the root.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `name` is not a feature.
    pub fn set_root(&mut self, name: &str) -> Result<(), ModelError> {
        if !self.contains_feature(name) {
            return Err(ModelError::UnknownFeatureReference {
                name: name.to_owned(),
            });
        }
        self.root = Some(name.to_owned());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Features
    // -----------------------------------------------------------------------

    /// Add a new feature.
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateFeature`] if the name is taken.
    pub fn add_feature(&mut self, feature: impl Into<Feature>) -> Result<(), ModelError> {
        let feature = feature.into();
        if self.index.contains_key(feature.name()) {
            return Err(ModelError::DuplicateFeature {
                name: feature.name().to_owned(),
            });
        }
        self.index
            .insert(feature.name().to_owned(), self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Locate-or-create: add `feature` unless its name already exists.
    /// Returns `true` if it was added.
    pub fn ensure_feature(&mut self, feature: impl Into<Feature>) -> bool {
        self.add_feature(feature).is_ok()
    }

    /// Look up a feature by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    /// Returns `true` if a feature called `name` exists.
    #[must_use]
    pub fn contains_feature(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Features in insertion order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// The marker feature of `region`, if this model has it.
    #[must_use]
    pub fn marker_feature(&self, region: Region) -> Option<&Feature> {
        region
            .marker_name()
            .and_then(|name| self.index.get(&name))
            .map(|&i| &self.features[i])
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    /// Constraints in list order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Append a constraint.
    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Remove and return every constraint, leaving the list empty.
    pub fn take_constraints(&mut self) -> Vec<Constraint> {
        std::mem::take(&mut self.constraints)
    }

    /// Replace the constraint list.
    pub fn set_constraints(&mut self, constraints: Vec<Constraint>) {
        self.constraints = constraints;
    }

    /// Verify that every constraint only mentions known features.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] for the first unknown name.
    pub fn check_references(&self) -> Result<(), ModelError> {
        for constraint in &self.constraints {
            if let Some(name) = constraint
                .referenced_features()
                .into_iter()
                .find(|name| !self.contains_feature(name))
            {
                return Err(ModelError::UnknownFeatureReference {
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Oracle queries spent producing this model.
    #[must_use]
    pub const fn solver_queries(&self) -> u64 {
        self.solver_queries
    }

    /// Add `queries` to the diagnostic query counter.
    pub const fn record_queries(&mut self, queries: u64) {
        self.solver_queries += queries;
    }

    // -----------------------------------------------------------------------
    // Feature-tree builders
    // -----------------------------------------------------------------------

    /// `child` is selected exactly when `parent` is.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `parent` is unknown.
    pub fn mandatory(&mut self, parent: &str, child: &str) -> Result<(), ModelError> {
        self.cardinality(parent, &[child], 1, 1)
    }

    /// `child` may be selected only when `parent` is.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `parent` is unknown.
    pub fn optional(&mut self, parent: &str, child: &str) -> Result<(), ModelError> {
        self.cardinality(parent, &[child], 0, 1)
    }

    /// Exactly one of `children` when `parent` is selected.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `parent` is unknown.
    pub fn alternative(&mut self, parent: &str, children: &[&str]) -> Result<(), ModelError> {
        self.cardinality(parent, children, 1, 1)
    }

    /// At least one of `children` when `parent` is selected.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `parent` is unknown.
    pub fn or_group(&mut self, parent: &str, children: &[&str]) -> Result<(), ModelError> {
        let upper = u32::try_from(children.len()).unwrap_or(u32::MAX);
        self.cardinality(parent, children, 1, upper)
    }

    /// Between `lower` and `upper` of `children` when `parent` is selected.
    /// Children that do not exist yet are created as source features.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownFeatureReference`] if `parent` is unknown.
    pub fn cardinality(
        &mut self,
        parent: &str,
        children: &[&str],
        lower: u32,
        upper: u32,
    ) -> Result<(), ModelError> {
        if !self.contains_feature(parent) {
            return Err(ModelError::UnknownFeatureReference {
                name: parent.to_owned(),
            });
        }
        for &child in children {
            self.ensure_feature(child);
        }
        self.constraints.push(Constraint::group(
            parent,
            children.iter().copied(),
            lower,
            upper,
        ));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Contextualization
    // -----------------------------------------------------------------------

    /// Returns `true` if every regular constraint is guarded by this model's
    /// own region and the region's marker feature exists.
    #[must_use]
    pub fn is_contextualized(&self) -> bool {
        self.marker_feature(self.region).is_some()
            && self
                .constraints
                .iter()
                .filter(|c| !c.is_structural())
                .all(|c| c.context() == Some(self.region))
    }

    /// A copy of this model in which every non-custom constraint is guarded
    /// by the model's region.
    ///
    /// The region's marker feature is added (or located) and pinned with a
    /// custom constraint, so the copy accepts exactly the configurations the
    /// original accepts, plus the selected marker.
    ///
    /// # Errors
    /// Returns [`ModelError::NotASourceRegion`] for synthetic regions.
    pub fn contextualize_all_constraints(&self) -> Result<Self, ModelError> {
        let region = self.region;
        let marker = region
            .marker_name()
            .ok_or(ModelError::NotASourceRegion { region })?;

        let mut out = self.clone();
        out.ensure_feature(Feature::with_role(
            marker.clone(),
            FeatureRole::RegionMarker { region },
        ));

        let pin = Constraint::feature(marker).with_tag(ConstraintTag::Custom);
        let mut constraints: Vec<Constraint> = out
            .take_constraints()
            .into_iter()
            .map(|c| if c.is_custom() { c } else { c.contextualized(region) })
            .collect();
        if !constraints.contains(&pin) {
            constraints.push(pin);
        }
        out.constraints = constraints;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelRepr {
    region: Region,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    constraints: Vec<Constraint>,
    #[serde(default)]
    solver_queries: u64,
}

impl TryFrom<ModelRepr> for Model {
    type Error = ModelError;

    fn try_from(repr: ModelRepr) -> Result<Self, Self::Error> {
        let mut model = Self::new(repr.region);
        for feature in repr.features {
            model.add_feature(feature)?;
        }
        if let Some(root) = repr.root {
            model.set_root(&root)?;
        }
        model.constraints = repr.constraints;
        model.solver_queries = repr.solver_queries;
        Ok(model)
    }
}

impl From<Model> for ModelRepr {
    fn from(model: Model) -> Self {
        Self {
            region: model.region,
            root: model.root,
            features: model.features,
            constraints: model.constraints,
            solver_queries: model.solver_queries,
        }
    }
}
