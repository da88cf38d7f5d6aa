//! Multi-parent repair.
//!
//! After Union a feature can be a group child under different parents in
//! different regions. Each such feature is split into one clone per
//! `(parent, region)` use, the groups are rewritten to the clones, and two
//! kinds of feature-tree constraints tie the clones back:
//!
//! - `original <=> (clone | clone | …)`
//! - `clone => REGION_<region>`

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{
    Constraint, ConstraintKind, ConstraintTag, Feature, FeatureRole, Model, Operand, Region,
};

/// One use of a feature as a group child.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Use {
    parent: String,
    region: Region,
}

/// Split every multi-parent feature of `model` in place. Returns the number
/// of features split.
pub fn repair_multi_parent(model: &mut Model) -> usize {
    let uses = collect_uses(model);
    let split: Vec<(String, Vec<(Use, String)>)> = uses
        .into_iter()
        .filter(|(_, uses)| {
            uses.iter()
                .map(|u| u.parent.as_str())
                .collect::<HashSet<_>>()
                .len()
                > 1
        })
        .map(|(feature, uses)| {
            let named = name_clones(&feature, uses);
            (feature, named)
        })
        .collect();
    if split.is_empty() {
        return 0;
    }

    let mut clone_of: HashMap<(&str, &Use), &str> = HashMap::new();
    for (feature, clones) in &split {
        for (u, name) in clones {
            clone_of.insert((feature.as_str(), u), name.as_str());
        }
    }

    let rewritten: Vec<Constraint> = model
        .take_constraints()
        .into_iter()
        .map(|c| rewrite_group(c, &clone_of))
        .collect();
    model.set_constraints(rewritten);

    for (feature, clones) in &split {
        for (u, name) in clones {
            model.ensure_feature(Feature::with_role(
                name.clone(),
                FeatureRole::Split {
                    original: feature.clone(),
                    region: u.region,
                },
            ));
        }

        let mut names = clones.iter().map(|(_, name)| name.clone());
        if let Some(first) = names.next() {
            let any_clone = names.fold(Operand::Feature(first), |acc, name| {
                Operand::from(Constraint::or(acc, name))
            });
            model.push_constraint(
                Constraint::iff(feature.as_str(), any_clone).with_tag(ConstraintTag::FeatureTree),
            );
        }
        for (u, name) in clones {
            if let Some(marker) = u.region.marker_name() {
                model.push_constraint(
                    Constraint::implies(name.as_str(), marker).with_tag(ConstraintTag::FeatureTree),
                );
            }
        }
        debug!(feature = %feature, clones = clones.len(), "split multi-parent feature");
    }
    split.len()
}

/// Group-child uses per feature, features and uses in first-seen order.
fn collect_uses(model: &Model) -> Vec<(String, Vec<Use>)> {
    let mut out: Vec<(String, Vec<Use>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for constraint in model.constraints() {
        let Some((parent, children, region)) = splittable_group(constraint) else {
            continue;
        };
        for child in children {
            let slot = *index.entry(child.clone()).or_insert_with(|| {
                out.push((child.clone(), Vec::new()));
                out.len() - 1
            });
            let u = Use {
                parent: parent.to_owned(),
                region,
            };
            if !out[slot].1.contains(&u) {
                out[slot].1.push(u);
            }
        }
    }
    out
}

/// `<feature>@<parent>`, qualified with the region when the same parent is
/// used in several regions.
fn name_clones(feature: &str, uses: Vec<Use>) -> Vec<(Use, String)> {
    let mut per_parent: HashMap<&str, usize> = HashMap::new();
    for u in &uses {
        *per_parent.entry(u.parent.as_str()).or_default() += 1;
    }
    let shared: HashSet<String> = per_parent
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(p, _)| p.to_owned())
        .collect();
    uses.into_iter()
        .map(|u| {
            let name = if shared.contains(&u.parent) {
                format!("{feature}@{}.{}", u.parent, u.region)
            } else {
                format!("{feature}@{}", u.parent)
            };
            (u, name)
        })
        .collect()
}

fn splittable_group(constraint: &Constraint) -> Option<(&str, &[String], Region)> {
    if constraint.is_structural() {
        return None;
    }
    let region = constraint.context()?;
    match constraint.kind() {
        ConstraintKind::Group {
            parent, children, ..
        } => Some((parent, children, region)),
        _ => None,
    }
}

fn rewrite_group(constraint: Constraint, clone_of: &HashMap<(&str, &Use), &str>) -> Constraint {
    let Some((parent, children, region)) = splittable_group(&constraint) else {
        return constraint;
    };
    let u = Use {
        parent: parent.to_owned(),
        region,
    };
    let children: Vec<String> = children
        .iter()
        .map(|child| {
            clone_of
                .get(&(child.as_str(), &u))
                .map_or_else(|| child.clone(), |name| (*name).to_owned())
        })
        .collect();
    constraint.with_group_children(children)
}
