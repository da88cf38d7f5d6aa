//! Integration tests for merge scenarios.
//!
//! Coverage:
//! - the two `Car` models: 288 + 324 = 612 through every phase
//! - 3-way merge with a shared root
//! - 2-way merge with different roots (synthesized root)
//! - N-way root mismatch
//! - multi-parent repair
//! - cross-tree constraints keeping or losing their region guard
//! - input constraints carrying the negation flag
//! - oracle budget errors surfacing as errors

mod common;

use common::{car_a, car_b, count, simple};
use fm_oracle::{DpllOracle, OracleError, SolverLimits};
use fmmerge::config::MergeConfig;
use fmmerge::merge::{cleanup, inconsistency_check, union};
use fmmerge::model::{CmpOp, Constraint, FeatureRole, Model, ModelError, Region};
use fmmerge::{MergeError, Verdict, merge_models, validate_merge};

fn verified() -> MergeConfig {
    MergeConfig {
        verify_solution_counts: true,
    }
}

#[test]
fn car_models_have_expected_counts() {
    assert_eq!(count(&car_a()), 288);
    assert_eq!(count(&car_b()), 324);
}

#[test]
fn alternative_over_three_children_has_three_solutions() {
    let mut m = Model::with_root(Region::A, "Car");
    m.alternative("Car", &["X", "Y", "Z"]).unwrap();
    assert_eq!(count(&m), 3);
}

#[test]
fn car_union_has_612_configurations() {
    let u = union(&[car_a(), car_b()]).unwrap();
    assert_eq!(count(&u), 612);
}

#[test]
fn car_merge_preserves_612_through_every_phase() {
    let inputs = [car_a(), car_b()];
    let u = union(&inputs).unwrap();
    let mut oracle = DpllOracle::new();
    let checked = inconsistency_check(&u, &mut oracle).unwrap();
    assert_eq!(count(&checked), 612);
    let merged = cleanup(&checked, &mut oracle).unwrap();
    assert_eq!(count(&merged), 612);

    let verdict = validate_merge(&merged, &inputs, &mut oracle).unwrap();
    assert_eq!(verdict, Verdict::Passed);
}

#[test]
fn car_pipeline_reports_verified_counts() {
    let inputs = [car_a(), car_b()];
    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    let counts = outcome.report.solutions.clone().unwrap();
    assert_eq!(counts.inputs, vec![288, 324]);
    assert_eq!(counts.union, 612);
    assert_eq!(counts.merged, 612);
    assert_eq!(outcome.merged.region(), Region::Merged);
    assert_eq!(outcome.merged.root(), Some("Car"));
}

#[test]
fn three_way_merge_with_shared_root_validates() {
    let inputs = [
        simple(Region::A, "Car", &["Radio", "Gps"]),
        simple(Region::B, "Car", &["Radio"]),
        simple(Region::C, "Car", &["Tow"]),
    ];
    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    assert_eq!(count(&outcome.merged), 4 + 2 + 2);
    let verdict = validate_merge(&outcome.merged, &inputs, &mut DpllOracle::new()).unwrap();
    assert_eq!(verdict, Verdict::Passed);
}

#[test]
fn two_way_merge_with_different_roots_synthesizes_root() {
    let inputs = [
        simple(Region::A, "Car", &["Radio"]),
        simple(Region::B, "Bike", &["Bell", "Basket"]),
    ];
    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    let merged = &outcome.merged;
    assert_eq!(merged.root(), Some("NEW_ROOT:Car_Bike"));
    assert_eq!(count(merged), 2 + 4);
    let verdict = validate_merge(merged, &inputs, &mut DpllOracle::new()).unwrap();
    assert_eq!(verdict, Verdict::Passed);
}

#[test]
fn n_way_merge_with_different_roots_fails() {
    let inputs = [
        simple(Region::A, "Car", &[]),
        simple(Region::B, "Bike", &[]),
        simple(Region::C, "Car", &[]),
    ];
    let err = merge_models(&inputs, &mut DpllOracle::new(), &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, MergeError::RootMismatch { .. }), "{err}");
}

#[test]
fn multi_parent_feature_is_split_and_validates() {
    let mut a = Model::with_root(Region::A, "Car");
    a.mandatory("Car", "Body").unwrap();
    a.optional("Body", "Light").unwrap();
    let mut b = Model::with_root(Region::B, "Car");
    b.mandatory("Car", "Frame").unwrap();
    b.optional("Frame", "Light").unwrap();
    let inputs = [a, b];

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    assert_eq!(outcome.report.split_features, 1);
    let merged = &outcome.merged;
    assert!(matches!(
        merged.feature("Light@Body").map(|f| f.role()),
        Some(FeatureRole::Split { region: Region::A, .. })
    ));
    assert!(merged.contains_feature("Light@Frame"));
    assert_eq!(count(merged), 4);

    let verdict = validate_merge(merged, &inputs, &mut DpllOracle::new()).unwrap();
    assert_eq!(verdict, Verdict::Passed);
}

#[test]
fn shared_cross_tree_constraint_keeps_a_guard_per_region() {
    let mut a = simple(Region::A, "Car", &["Radio", "Gps"]);
    a.push_constraint(Constraint::implies("Gps", "Radio"));
    let mut b = simple(Region::B, "Car", &["Radio", "Gps"]);
    b.push_constraint(Constraint::implies("Gps", "Radio"));
    let inputs = [a, b];

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    let rendered: Vec<String> = outcome
        .merged
        .constraints()
        .iter()
        .map(ToString::to_string)
        .collect();
    // Each copy is only forced by itself, so neither is promoted or removed.
    assert!(rendered.contains(&"Gps => Radio @A".to_owned()), "{rendered:?}");
    assert!(rendered.contains(&"Gps => Radio @B".to_owned()), "{rendered:?}");
    assert!(!rendered.contains(&"Gps => Radio".to_owned()), "{rendered:?}");
    assert_eq!(count(&outcome.merged), 3 + 3);
    assert_eq!(
        validate_merge(&outcome.merged, &inputs, &mut DpllOracle::new()).unwrap(),
        Verdict::Passed
    );
}

#[test]
fn constraint_forced_by_other_regions_loses_its_guard() {
    let mut a = simple(Region::A, "Car", &["Radio", "Gps"]);
    a.push_constraint(Constraint::implies("Gps", "Radio"));
    let mut b = simple(Region::B, "Car", &["Radio", "Gps"]);
    b.push_constraint(Constraint::not(Constraint::feature("Gps")));
    b.push_constraint(Constraint::implies("Gps", "Radio"));
    let inputs = [a, b];

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    let global = outcome
        .merged
        .constraints()
        .iter()
        .filter(|c| c.to_string() == "Gps => Radio")
        .count();
    assert_eq!(global, 1);
    assert!(outcome.report.decontextualized >= 1);
    assert_eq!(count(&outcome.merged), 3 + 2);
    assert_eq!(
        validate_merge(&outcome.merged, &inputs, &mut DpllOracle::new()).unwrap(),
        Verdict::Passed
    );
}

#[test]
fn negated_input_constraint_only_binds_its_region() {
    let mut a = simple(Region::A, "Car", &["X"]);
    a.push_constraint(Constraint::feature("X").with_negation(true));
    let b = simple(Region::B, "Car", &["Y"]);
    let inputs = [a, b];
    assert_eq!(count(&inputs[0]), 1);

    let u = union(&inputs).unwrap();
    assert_eq!(count(&u), 1 + 2);

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    assert_eq!(count(&outcome.merged), 3);
    assert_eq!(
        validate_merge(&outcome.merged, &inputs, &mut DpllOracle::new()).unwrap(),
        Verdict::Passed
    );
}

#[test]
fn negated_compound_constraints_preserve_counts() {
    let mut a = simple(Region::A, "Car", &["Radio", "Gps"]);
    a.push_constraint(Constraint::iff("Radio", "Gps").with_negation(true));
    let mut b = simple(Region::B, "Car", &["Radio", "Tow"]);
    b.push_constraint(Constraint::comparison("Radio", CmpOp::Gte, "Tow").with_negation(true));
    let inputs = [a, b];
    // A: exactly one of Radio, Gps (2). B: Radio < Tow (1).
    assert_eq!(count(&inputs[0]), 2);
    assert_eq!(count(&inputs[1]), 1);

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    assert_eq!(outcome.report.solutions.unwrap().merged, 3);
    assert_eq!(
        validate_merge(&outcome.merged, &inputs, &mut DpllOracle::new()).unwrap(),
        Verdict::Passed
    );
}

#[test]
fn region_specific_cross_tree_constraint_keeps_its_guard() {
    let mut a = simple(Region::A, "Car", &["Radio", "Gps"]);
    a.push_constraint(Constraint::implies("Gps", "Radio"));
    let b = simple(Region::B, "Car", &["Radio", "Gps"]);
    let inputs = [a, b];

    let outcome = merge_models(&inputs, &mut DpllOracle::new(), &verified()).unwrap();
    let guarded = outcome
        .merged
        .constraints()
        .iter()
        .find(|c| c.to_string() == "Gps => Radio @A");
    assert!(guarded.is_some());
    assert_eq!(count(&outcome.merged), 3 + 4);
}

#[test]
fn oracle_budget_exhaustion_is_an_error() {
    let mut oracle = DpllOracle::with_limits(SolverLimits {
        max_decisions: Some(0),
        timeout: None,
    });
    let err = merge_models(&[car_a(), car_b()], &mut oracle, &MergeConfig::default()).unwrap_err();
    assert!(
        matches!(err, MergeError::Oracle(OracleError::BudgetExhausted { limit: 0 })),
        "{err}"
    );
}

#[test]
fn input_errors_are_reported_before_any_query() {
    let mut oracle = DpllOracle::new();
    let err = merge_models(&[car_a()], &mut oracle, &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, MergeError::InvalidInputCount { count: 1 }));

    let err = merge_models(
        &[car_a(), common::car_b_in(Region::A)],
        &mut oracle,
        &MergeConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MergeError::DuplicateRegion { region: Region::A }));

    let mut dangling = simple(Region::A, "Car", &["Radio"]);
    dangling.push_constraint(Constraint::implies("Radio", "Tow"));
    let err = merge_models(
        &[dangling, simple(Region::B, "Car", &["Tow"])],
        &mut oracle,
        &MergeConfig::default(),
    )
    .unwrap_err();
    assert!(
        matches!(
            &err,
            MergeError::Model(ModelError::UnknownFeatureReference { name }) if name == "Tow"
        ),
        "{err}"
    );
    assert_eq!(fm_oracle::Oracle::queries(&oracle), 0);
}
