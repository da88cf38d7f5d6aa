//! Features: named configuration options.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::region::Region;

/// Why a feature exists in a model.
///
/// Identity is always the name; the role only tells the validator which
/// features are scaffolding introduced by the merge engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureRole {
    /// Declared by an input model.
    #[default]
    Source,
    /// `NEW_ROOT:<a>_<b>`, created when two roots differ.
    SyntheticRoot,
    /// The `Region` feature grouping all markers.
    RegionGroup,
    /// Marker of a source region.
    RegionMarker {
        /// The region this marker selects.
        region: Region,
    },
    /// Region-specific clone created by multi-parent repair.
    Split {
        /// The feature this clone stands in for.
        original: String,
        /// Region of the group the clone was created for.
        region: Region,
    },
}

/// A named configuration option.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    name: String,
    #[serde(default, skip_serializing_if = "is_source_role")]
    role: FeatureRole,
}

fn is_source_role(role: &FeatureRole) -> bool {
    *role == FeatureRole::Source
}

impl Feature {
    /// A source feature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::Source,
        }
    }

    /// A feature with an explicit role.
    pub fn with_role(name: impl Into<String>, role: FeatureRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    /// The feature's name (its identity).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The feature's role.
    #[must_use]
    pub const fn role(&self) -> &FeatureRole {
        &self.role
    }

    /// Returns `true` unless the feature came from an input model.
    #[must_use]
    pub fn is_scaffolding(&self) -> bool {
        !is_source_role(&self.role)
    }
}

impl From<&str> for Feature {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Feature {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
