//! Merge validation: the merged model accepts exactly the configurations of
//! its sources, no more and no fewer.
//!
//! A merged configuration belongs to source `i` when source `i`'s marker is
//! selected, every constraint of source `i` holds, and every source feature
//! source `i` does not declare is deselected (other inputs' roots excepted,
//! since a synthesized root keeps all of them selected).
//!
//! Two oracle tests decide equivalence:
//!
//! 1. *No extra solutions*: merged constraints plus "not a configuration of
//!    source `i`" for every `i` must be unsatisfiable.
//! 2. *No missing solutions*: for each source `i`, "violates the merged
//!    model" plus source `i`'s constraints, with all scaffolding pinned to
//!    region `i`, must be unsatisfiable.

use std::collections::{HashMap, HashSet};

use fm_oracle::Oracle;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::MergeError;
use crate::merge::trial_is_satisfiable;
use crate::model::{Constraint, FeatureRole, Model, REGION_FEATURE, Region};

/// Outcome of [`validate_merge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The merged model is equivalent to the union of its sources.
    Passed,
    /// The merged model accepts a configuration no source accepts.
    ExtraSolutions,
    /// A configuration of source `source` is rejected by the merged model.
    MissingSolutions {
        /// Index of the source, in the order given.
        source: usize,
    },
}

impl Verdict {
    /// Returns `true` for [`Verdict::Passed`].
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Check that `merged` is equivalent to `sources`.
///
/// # Errors
/// - [`MergeError::NotASourceRegion`] if a source has a synthetic region.
/// - Compile and oracle failures.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn validate_merge(
    merged: &Model,
    sources: &[Model],
    oracle: &mut dyn Oracle,
) -> Result<Verdict, MergeError> {
    let views = sources
        .iter()
        .map(|source| SourceView::new(merged, sources, source))
        .collect::<Result<Vec<_>, _>>()?;

    // Test 1: no extra solutions.
    let outside_every_source: Vec<Constraint> = views
        .iter()
        .map(|view| Constraint::or_negation(view.membership()))
        .collect();
    if trial_is_satisfiable(
        merged,
        merged.constraints().iter().chain(&outside_every_source),
        oracle,
    )? {
        info!("merged model accepts extra configurations");
        return Ok(Verdict::ExtraSolutions);
    }
    debug!("no extra solutions");

    // Test 2: no missing solutions.
    let violates_merged = Constraint::or_negation(merged.constraints().to_vec());
    for (index, view) in views.iter().enumerate() {
        let pins = view.pins(merged, &views);
        let missing = trial_is_satisfiable(
            merged,
            std::iter::once(&violates_merged)
                .chain(&view.constraints)
                .chain(&pins),
            oracle,
        )?;
        if missing {
            info!(source = index, region = %view.region, "merged model misses configurations");
            return Ok(Verdict::MissingSolutions { source: index });
        }
        debug!(source = index, "no missing solutions");
    }

    Ok(Verdict::Passed)
}

/// One source as seen from the merged model.
struct SourceView {
    region: Region,
    marker: String,
    root: Option<String>,
    /// The source's own constraints, unguarded.
    constraints: Vec<Constraint>,
    /// Source features of the merged model this source does not declare.
    absent: Vec<String>,
}

impl SourceView {
    fn new(merged: &Model, sources: &[Model], source: &Model) -> Result<Self, MergeError> {
        let region = source.region();
        let marker = region
            .marker_name()
            .ok_or(MergeError::NotASourceRegion { region })?;
        let roots: HashSet<&str> = sources.iter().filter_map(Model::root).collect();
        let absent = merged
            .features()
            .iter()
            .filter(|f| matches!(f.role(), FeatureRole::Source))
            .map(|f| f.name())
            .filter(|name| !source.contains_feature(name) && !roots.contains(name))
            .map(str::to_owned)
            .collect();
        let constraints = source
            .constraints()
            .iter()
            .filter(|c| !c.is_custom())
            .map(|c| c.clone().decontextualized())
            .collect();
        Ok(Self {
            region,
            marker,
            root: source.root().map(str::to_owned),
            constraints,
            absent,
        })
    }

    /// Constraints that all hold exactly for configurations of this source.
    fn membership(&self) -> Vec<Constraint> {
        let mut out = Vec::with_capacity(self.constraints.len() + self.absent.len() + 2);
        out.push(Constraint::feature(self.marker.as_str()));
        out.extend(self.constraints.iter().cloned());
        out.extend(self.root.as_deref().map(Constraint::feature));
        out.extend(deselected(&self.absent));
        out
    }

    /// Scaffolding pinned to this source's region.
    fn pins(&self, merged: &Model, views: &[Self]) -> Vec<Constraint> {
        let mut out = vec![Constraint::feature(self.marker.as_str())];
        for other in views.iter().filter(|v| v.region != self.region) {
            out.push(Constraint::feature(other.marker.as_str()).with_negation(true));
        }
        out.extend(deselected(&self.absent));
        if merged.contains_feature(REGION_FEATURE) {
            out.push(Constraint::feature(REGION_FEATURE));
        }
        out.extend(
            views
                .iter()
                .filter_map(|v| v.root.as_deref())
                .map(Constraint::feature),
        );

        // Clones: other regions' off; a region's only clone of a feature
        // stands for the feature itself.
        let mut own: HashMap<&str, Vec<&str>> = HashMap::new();
        for feature in merged.features() {
            if let FeatureRole::Split { original, region } = feature.role() {
                if *region == self.region {
                    own.entry(original.as_str()).or_default().push(feature.name());
                } else {
                    out.push(Constraint::feature(feature.name()).with_negation(true));
                }
            }
        }
        for feature in merged.features() {
            if let Some([clone]) = own.get(feature.name()).map(Vec::as_slice) {
                out.push(Constraint::iff(*clone, feature.name()));
            }
        }
        out
    }
}

fn deselected(names: &[String]) -> impl Iterator<Item = Constraint> + '_ {
    names
        .iter()
        .map(|name| Constraint::feature(name.as_str()).with_negation(true))
}

#[cfg(test)]
mod tests {
    use fm_oracle::DpllOracle;

    use super::*;
    use crate::config::MergeConfig;
    use crate::merge::{merge_models, union};

    fn source(region: Region, optional: &[&str]) -> Model {
        let mut m = Model::with_root(region, "Car");
        m.mandatory("Car", "Engine").unwrap();
        for f in optional {
            m.optional("Car", f).unwrap();
        }
        m
    }

    fn merged(sources: &[Model]) -> Model {
        merge_models(sources, &mut DpllOracle::new(), &MergeConfig::default())
            .unwrap()
            .merged
    }

    #[test]
    fn correct_merge_passes() {
        let sources = [source(Region::A, &["Radio"]), source(Region::B, &["Tow"])];
        let m = merged(&sources);
        let verdict = validate_merge(&m, &sources, &mut DpllOracle::new()).unwrap();
        assert_eq!(verdict, Verdict::Passed);
    }

    #[test]
    fn plain_union_passes() {
        let sources = [source(Region::A, &["Radio"]), source(Region::B, &["Radio"])];
        let u = union(&sources).unwrap();
        assert!(
            validate_merge(&u, &sources, &mut DpllOracle::new())
                .unwrap()
                .is_passed()
        );
    }

    #[test]
    fn dropped_constraint_is_extra_solutions() {
        let mut a = source(Region::A, &["Radio", "Gps"]);
        a.push_constraint(Constraint::implies("Gps", "Radio"));
        let sources = [a, source(Region::B, &["Tow"])];
        let mut m = merged(&sources);
        let kept: Vec<Constraint> = m
            .constraints()
            .iter()
            .filter(|c| !c.to_string().starts_with("Gps => Radio"))
            .cloned()
            .collect();
        assert!(kept.len() < m.constraints().len());
        m.set_constraints(kept);
        let verdict = validate_merge(&m, &sources, &mut DpllOracle::new()).unwrap();
        assert_eq!(verdict, Verdict::ExtraSolutions);
    }

    #[test]
    fn contradictory_constraint_is_missing_solutions() {
        let sources = [source(Region::A, &["Radio"]), source(Region::B, &["Tow"])];
        let mut m = merged(&sources);
        m.push_constraint(Constraint::feature("Tow").contextualized(Region::B));
        let verdict = validate_merge(&m, &sources, &mut DpllOracle::new()).unwrap();
        assert_eq!(verdict, Verdict::MissingSolutions { source: 1 });
    }

    #[test]
    fn synthetic_source_region_is_rejected() {
        let sources = [source(Region::A, &[]), source(Region::Testing, &[])];
        let m = Model::with_root(Region::Merged, "Car");
        assert!(matches!(
            validate_merge(&m, &sources, &mut DpllOracle::new()),
            Err(MergeError::NotASourceRegion {
                region: Region::Testing
            })
        ));
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_string(&Verdict::MissingSolutions { source: 2 }).unwrap();
        assert_eq!(json, r#"{"verdict":"missing_solutions","source":2}"#);
    }
}
