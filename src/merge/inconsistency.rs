//! Inconsistency check: promote constraints that hold everywhere.
//!
//! The union's constraint list is drained front to back. For each
//! contextualized regular constraint the oracle is asked whether its global
//! violation is consistent with the constraints not yet visited and those
//! already accepted. If not, the rest already forces the constraint in every
//! configuration and its region guard is dropped; otherwise the guard stays.
//! Either way the accepted set has exactly the union's solutions.
//!
//! The result depends on list order. That is intended: the same input always
//! produces the same output.

use std::collections::VecDeque;

use fm_oracle::Oracle;
use tracing::{debug, instrument, trace};

use super::{trial_is_satisfiable, violated};
use crate::error::MergeError;
use crate::model::Model;

/// Run the inconsistency check over `union`.
///
/// The result has `union`'s features, root and region.
///
/// # Errors
/// Propagates compile and oracle failures; a failed query never decides a
/// constraint.
#[instrument(skip_all, fields(constraints = union.constraints().len()))]
pub fn inconsistency_check(union: &Model, oracle: &mut dyn Oracle) -> Result<Model, MergeError> {
    let start = oracle.queries();
    let mut remaining: VecDeque<_> = union.constraints().iter().cloned().collect();
    let mut ckb = union.clone();
    ckb.take_constraints();

    let mut promoted = 0_usize;
    while let Some(constraint) = remaining.pop_front() {
        if constraint.is_structural() || !constraint.is_contextualized() {
            ckb.push_constraint(constraint);
            continue;
        }

        let probe = violated(&constraint.clone().decontextualized());
        let counterexample = trial_is_satisfiable(
            &ckb,
            remaining
                .iter()
                .chain(ckb.constraints())
                .chain([&probe]),
            oracle,
        )?;
        trace!(constraint = %constraint, counterexample, "checked");

        if counterexample {
            ckb.push_constraint(constraint);
        } else {
            ckb.push_constraint(constraint.decontextualized());
            promoted += 1;
        }
    }

    let queries = oracle.queries().saturating_sub(start);
    ckb.record_queries(queries);
    debug!(promoted, queries, "inconsistency check done");
    Ok(ckb)
}

#[cfg(test)]
mod tests {
    use fm_oracle::DpllOracle;

    use super::*;
    use crate::compile::compile;
    use crate::merge::union;
    use crate::model::{Constraint, Region};

    fn count(model: &Model) -> u64 {
        DpllOracle::new()
            .count_solutions(&compile(model).unwrap())
            .unwrap()
    }

    fn pair() -> [Model; 2] {
        let mut a = Model::with_root(Region::A, "Car");
        a.mandatory("Car", "Engine").unwrap();
        a.optional("Car", "Radio").unwrap();
        let mut b = Model::with_root(Region::B, "Car");
        b.mandatory("Car", "Engine").unwrap();
        b.optional("Car", "Tow").unwrap();
        [a, b]
    }

    #[test]
    fn only_constraints_forced_by_the_rest_are_promoted() {
        let u = union(&pair()).unwrap();
        let mut oracle = DpllOracle::new();
        let ckb = inconsistency_check(&u, &mut oracle).unwrap();

        let rendered: Vec<String> = ckb.constraints().iter().map(ToString::to_string).collect();
        // Neither copy of Car -> [Engine] is forced by the rest, so both keep
        // their guards.
        assert!(rendered.contains(&"Car -> [Engine] 1..1 @A".to_owned()), "{rendered:?}");
        assert!(rendered.contains(&"Car -> [Engine] 1..1 @B".to_owned()), "{rendered:?}");
        // An optional child of the selected root constrains nothing.
        assert!(rendered.contains(&"Car -> [Radio] 0..1".to_owned()), "{rendered:?}");
        assert!(rendered.contains(&"Car -> [Tow] 0..1".to_owned()), "{rendered:?}");
        // Tow => REGION_B is feature-tree scaffolding and untouched.
        assert!(rendered.contains(&"Tow => REGION_B".to_owned()), "{rendered:?}");
        assert!(ckb.solver_queries() > 0);
        assert_eq!(ckb.constraints().len(), u.constraints().len());
    }

    #[test]
    fn solution_count_is_unchanged() {
        let u = union(&pair()).unwrap();
        let ckb = inconsistency_check(&u, &mut DpllOracle::new()).unwrap();
        assert_eq!(count(&ckb), count(&u));
        assert_eq!(ckb.region(), Region::Union);
        assert_eq!(ckb.features(), u.features());
    }

    #[test]
    fn region_specific_constraint_keeps_its_guard() {
        let mut a = Model::with_root(Region::A, "Car");
        a.optional("Car", "Radio").unwrap();
        a.push_constraint(Constraint::feature("Radio"));
        let mut b = Model::with_root(Region::B, "Car");
        b.optional("Car", "Radio").unwrap();
        let u = union(&[a, b]).unwrap();
        let ckb = inconsistency_check(&u, &mut DpllOracle::new()).unwrap();
        let radio = ckb
            .constraints()
            .iter()
            .find(|c| c.to_string().starts_with("Radio @"))
            .unwrap();
        assert_eq!(radio.context(), Some(Region::A));
        assert_eq!(count(&ckb), count(&u));
    }

    #[test]
    fn constraint_forced_by_other_regions_is_promoted() {
        let mut a = Model::with_root(Region::A, "Car");
        a.optional("Car", "Radio").unwrap();
        a.optional("Car", "Gps").unwrap();
        a.push_constraint(Constraint::implies("Gps", "Radio"));
        let mut b = Model::with_root(Region::B, "Car");
        b.optional("Car", "Radio").unwrap();
        b.optional("Car", "Gps").unwrap();
        b.push_constraint(Constraint::feature("Gps").with_negation(true));
        b.push_constraint(Constraint::implies("Gps", "Radio"));
        let u = union(&[a, b]).unwrap();
        let ckb = inconsistency_check(&u, &mut DpllOracle::new()).unwrap();

        let rendered: Vec<String> = ckb.constraints().iter().map(ToString::to_string).collect();
        // B's copy is forced by A's guarded copy plus ~[Gps] @B; A's copy is
        // not forced by anything else.
        assert!(rendered.contains(&"Gps => Radio @A".to_owned()), "{rendered:?}");
        assert!(rendered.contains(&"Gps => Radio".to_owned()), "{rendered:?}");
        assert!(rendered.contains(&"~[Gps] @B".to_owned()), "{rendered:?}");
        assert_eq!(count(&ckb), count(&u));
    }

    #[test]
    fn structural_constraints_pass_through_unchanged() {
        let u = union(&pair()).unwrap();
        let ckb = inconsistency_check(&u, &mut DpllOracle::new()).unwrap();
        let structural = |m: &Model| -> Vec<Constraint> {
            m.constraints()
                .iter()
                .filter(|c| c.is_structural())
                .cloned()
                .collect()
        };
        let before = structural(&u);
        let after = structural(&ckb);
        assert_eq!(before, after);
    }
}
