//! Union phase: build one model accepting every input's configurations.
//!
//! Each configuration of the result selects exactly one region marker and
//! satisfies the constraints of that region's input; features the input does
//! not declare are forced off. No oracle queries are made.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use super::split;
use crate::error::MergeError;
use crate::model::{
    Constraint, ConstraintTag, Feature, FeatureRole, Model, Operand, REGION_FEATURE, Region,
};

/// Minimum number of inputs.
pub const MIN_INPUTS: usize = 2;
/// Maximum number of inputs (one per source region).
pub const MAX_INPUTS: usize = Region::SOURCES.len();

/// Name of the root synthesized when two inputs have different roots.
#[must_use]
pub fn synthetic_root_name(a: &str, b: &str) -> String {
    format!("NEW_ROOT:{a}_{b}")
}

/// Merge `models` into one model tagged [`Region::Union`].
///
/// # Errors
/// - [`MergeError::InvalidInputCount`] unless there are 2..=9 inputs.
/// - [`MergeError::NotASourceRegion`] / [`MergeError::DuplicateRegion`] for
///   bad region tags.
/// - [`MergeError::Model`] when an input's constraint names a feature that
///   input does not declare.
/// - [`MergeError::RootMismatch`] when roots cannot be unified.
#[instrument(skip_all, fields(inputs = models.len()))]
pub fn union(models: &[Model]) -> Result<Model, MergeError> {
    check_inputs(models)?;

    let inputs: Vec<Cow<'_, Model>> = models
        .iter()
        .map(|m| {
            if m.is_contextualized() {
                Ok(Cow::Borrowed(m))
            } else {
                m.contextualize_all_constraints().map(Cow::Owned)
            }
        })
        .collect::<Result<_, _>>()?;

    let mut out = Model::new(Region::Union);
    let root = unify_roots(&inputs, &mut out)?;

    // Features, first writer wins.
    for input in &inputs {
        for feature in input.features() {
            out.ensure_feature(feature.clone());
        }
    }
    out.set_root(&root)?;

    add_region_hierarchy(&inputs, &root, &mut out)?;
    add_membership_constraints(&inputs, &mut out);

    for input in &inputs {
        for constraint in input.constraints().iter().filter(|c| !c.is_custom()) {
            out.push_constraint(constraint.clone());
        }
    }

    let split_count = split::repair_multi_parent(&mut out);
    debug!(
        features = out.features().len(),
        constraints = out.constraints().len(),
        split = split_count,
        "union built"
    );
    Ok(out)
}

fn check_inputs(models: &[Model]) -> Result<(), MergeError> {
    if !(MIN_INPUTS..=MAX_INPUTS).contains(&models.len()) {
        return Err(MergeError::InvalidInputCount {
            count: models.len(),
        });
    }
    let mut seen = HashSet::new();
    for model in models {
        let region = model.region();
        if !region.is_source() {
            return Err(MergeError::NotASourceRegion { region });
        }
        if !seen.insert(region) {
            return Err(MergeError::DuplicateRegion { region });
        }
        model.check_references()?;
    }
    Ok(())
}

/// Pick (or synthesize) the merged root. A synthesized root is added to `out`
/// together with the custom group binding both original roots.
fn unify_roots(inputs: &[Cow<'_, Model>], out: &mut Model) -> Result<String, MergeError> {
    let roots: Vec<Option<&str>> = inputs.iter().map(|m| m.root()).collect();
    let mismatch = || MergeError::RootMismatch {
        roots: roots
            .iter()
            .map(|r| r.unwrap_or("<none>").to_owned())
            .collect(),
    };

    let Some(first) = roots.iter().copied().flatten().next() else {
        return Err(mismatch());
    };
    if roots.iter().all(|r| *r == Some(first)) {
        return Ok(first.to_owned());
    }

    match roots.as_slice() {
        [Some(a), Some(b)] => {
            let name = synthetic_root_name(a, b);
            out.add_feature(Feature::with_role(name.clone(), FeatureRole::SyntheticRoot))?;
            out.push_constraint(
                Constraint::group(name.as_str(), [*a, *b], 2, 2).with_tag(ConstraintTag::Custom),
            );
            debug!(root = %name, "synthesized root");
            Ok(name)
        }
        _ => Err(mismatch()),
    }
}

/// `root → [Region]` and `Region → [markers…]`, both exactly-one.
fn add_region_hierarchy(
    inputs: &[Cow<'_, Model>],
    root: &str,
    out: &mut Model,
) -> Result<(), MergeError> {
    out.ensure_feature(Feature::with_role(REGION_FEATURE, FeatureRole::RegionGroup));
    let mut markers = Vec::with_capacity(inputs.len());
    for input in inputs {
        let region = input.region();
        let name = region
            .marker_name()
            .ok_or(MergeError::NotASourceRegion { region })?;
        out.ensure_feature(Feature::with_role(
            name.clone(),
            FeatureRole::RegionMarker { region },
        ));
        markers.push(name);
    }
    out.push_constraint(
        Constraint::group(root, [REGION_FEATURE], 1, 1).with_tag(ConstraintTag::Custom),
    );
    out.push_constraint(
        Constraint::group(REGION_FEATURE, markers, 1, 1).with_tag(ConstraintTag::Custom),
    );
    Ok(())
}

/// Bind every source feature not declared by all inputs to the markers of the
/// inputs that do declare it.
fn add_membership_constraints(inputs: &[Cow<'_, Model>], out: &mut Model) {
    let roots: HashSet<&str> = inputs.iter().filter_map(|m| m.root()).collect();

    let mut owners: Vec<(&str, Vec<Region>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for input in inputs {
        for feature in input.features() {
            if feature.is_scaffolding() || roots.contains(feature.name()) {
                continue;
            }
            let slot = *index.entry(feature.name()).or_insert_with(|| {
                owners.push((feature.name(), Vec::new()));
                owners.len() - 1
            });
            owners[slot].1.push(input.region());
        }
    }

    for (name, regions) in owners {
        if regions.len() == inputs.len() {
            continue;
        }
        let mut markers = regions.iter().filter_map(|r| r.marker_name());
        let Some(first) = markers.next() else {
            continue;
        };
        let target = markers.fold(Operand::Feature(first), |acc, marker| {
            Operand::from(Constraint::or(acc, marker))
        });
        out.push_constraint(Constraint::implies(name, target).with_tag(ConstraintTag::FeatureTree));
    }
}
