//! The merge pipeline: union → inconsistency check → cleanup.

use fm_oracle::Oracle;
use serde::Serialize;
use tracing::{info, info_span};

use super::{cleanup, inconsistency_check, union};
use crate::compile::compile;
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::model::{Constraint, FeatureRole, Model, Region};

/// What each phase did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Number of input models.
    pub inputs: usize,
    /// Features in the merged model.
    pub features: usize,
    /// Constraints after union.
    pub union_constraints: usize,
    /// Features split by multi-parent repair.
    pub split_features: usize,
    /// Regular constraints whose region guard was dropped.
    pub decontextualized: usize,
    /// Regular constraints that kept their region guard.
    pub kept_contextual: usize,
    /// Constraints removed by cleanup.
    pub removed_redundant: usize,
    /// Constraints in the merged model.
    pub merged_constraints: usize,
    /// Oracle queries made by the inconsistency check.
    pub inconsistency_queries: u64,
    /// Oracle queries made by cleanup.
    pub cleanup_queries: u64,
    /// Solution counts, when verification is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<SolutionCounts>,
}

/// Solution counts observed around each phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolutionCounts {
    /// Per input, in input order.
    pub inputs: Vec<u64>,
    /// After union.
    pub union: u64,
    /// After the inconsistency check.
    pub checked: u64,
    /// After cleanup.
    pub merged: u64,
}

/// The merged model and its report.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// The merged model, tagged [`Region::Merged`].
    pub merged: Model,
    /// What each phase did.
    pub report: MergeReport,
}

/// Merge `models` with `oracle`.
///
/// # Errors
/// Any phase error; with `verify_solution_counts`,
/// [`MergeError::PostconditionViolated`] when a phase changes the solution
/// count it must preserve.
pub fn merge_models(
    models: &[Model],
    oracle: &mut dyn Oracle,
    config: &MergeConfig,
) -> Result<MergeOutcome, MergeError> {
    let _span = info_span!("merge", inputs = models.len()).entered();
    let mut report = MergeReport {
        inputs: models.len(),
        ..MergeReport::default()
    };

    let united = union(models)?;
    report.union_constraints = united.constraints().len();
    report.split_features = count_split_features(&united);

    let checked = inconsistency_check(&united, oracle)?;
    report.inconsistency_queries = checked.solver_queries();
    let (decontextualized, kept) = contextualization_changes(&united, &checked);
    report.decontextualized = decontextualized;
    report.kept_contextual = kept;

    let mut merged = cleanup(&checked, oracle)?;
    report.cleanup_queries = merged
        .solver_queries()
        .saturating_sub(checked.solver_queries());
    report.removed_redundant = checked.constraints().len() - merged.constraints().len();
    merged.set_region(Region::Merged);
    report.features = merged.features().len();
    report.merged_constraints = merged.constraints().len();

    if config.verify_solution_counts {
        report.solutions = Some(verify(models, &united, &checked, &merged, oracle)?);
    }

    info!(
        features = report.features,
        constraints = report.merged_constraints,
        decontextualized = report.decontextualized,
        removed = report.removed_redundant,
        "merge complete"
    );
    Ok(MergeOutcome { merged, report })
}

/// Count solutions around every phase and check the preservation guarantees.
fn verify(
    inputs: &[Model],
    united: &Model,
    checked: &Model,
    merged: &Model,
    oracle: &mut dyn Oracle,
) -> Result<SolutionCounts, MergeError> {
    let _span = info_span!("verify").entered();
    let mut count = |model: &Model| -> Result<u64, MergeError> {
        Ok(oracle.count_solutions(&compile(model)?)?)
    };

    let per_input = inputs.iter().map(&mut count).collect::<Result<Vec<_>, _>>()?;
    let counts = SolutionCounts {
        union: count(united)?,
        checked: count(checked)?,
        merged: count(merged)?,
        inputs: per_input,
    };

    let expected: u64 = counts.inputs.iter().sum();
    for (phase, before, after) in [
        ("union", expected, counts.union),
        ("inconsistency check", counts.union, counts.checked),
        ("cleanup", counts.checked, counts.merged),
    ] {
        if before != after {
            return Err(MergeError::PostconditionViolated {
                phase,
                expected: before,
                actual: after,
            });
        }
    }
    Ok(counts)
}

fn count_split_features(model: &Model) -> usize {
    let mut originals: Vec<&str> = model
        .features()
        .iter()
        .filter_map(|f| match f.role() {
            FeatureRole::Split { original, .. } => Some(original.as_str()),
            _ => None,
        })
        .collect();
    originals.sort_unstable();
    originals.dedup();
    originals.len()
}

/// `(decontextualized, kept)` over the regular constraints the inconsistency
/// check decided.
fn contextualization_changes(before: &Model, after: &Model) -> (usize, usize) {
    let decided = |c: &&Constraint| !c.is_structural();
    before
        .constraints()
        .iter()
        .filter(decided)
        .zip(after.constraints().iter().filter(decided))
        .filter(|(b, _)| b.is_contextualized())
        .fold((0, 0), |(dropped, kept), (_, a)| {
            if a.is_contextualized() {
                (dropped, kept + 1)
            } else {
                (dropped + 1, kept)
            }
        })
}
