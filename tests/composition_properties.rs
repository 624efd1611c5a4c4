// tests/composition_properties.rs

//! Property tests for the runner over randomly shaped compositions.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use assetpipe::compose::{parallel, series, Step};
use assetpipe::engine::Runner;
use assetpipe::registry::TaskRegistry;
use assetpipe_test_utils::probe::Recorder;

const LEAVES: [&str; 5] = ["l0", "l1", "l2", "l3", "l4"];

fn arb_step() -> impl Strategy<Value = Step> {
    let leaf = prop::sample::select(LEAVES.to_vec()).prop_map(Step::from);
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(|members| series(members)),
            prop::collection::vec(inner, 1..4).prop_map(|members| parallel(members)),
        ]
    })
}

fn run(step: &Step, failing: Option<&str>) -> (Recorder, bool) {
    let rec = Recorder::new();
    let mut registry = TaskRegistry::new();
    for name in LEAVES {
        let action = if Some(name) == failing {
            rec.failing(name, Duration::ZERO, "fail")
        } else {
            rec.action(name, Duration::ZERO)
        };
        registry.register(name, action).unwrap();
    }
    let runner = Runner::new(Arc::new(registry));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let ok = rt.block_on(runner.run_step(step)).is_ok();
    (rec, ok)
}

/// Leaves that run when nothing fails: every referenced one.
fn referenced(step: &Step) -> BTreeSet<String> {
    step.referenced_tasks().into_iter().map(str::to_string).collect()
}

proptest! {
    #[test]
    fn every_referenced_leaf_runs_exactly_once(step in arb_step()) {
        let (rec, ok) = run(&step, None);
        prop_assert!(ok);
        for name in referenced(&step) {
            prop_assert_eq!(rec.starts(&name), 1);
        }
        prop_assert_eq!(rec.started().len(), referenced(&step).len());
    }

    #[test]
    fn a_failing_leaf_fails_the_run_iff_referenced(step in arb_step(), idx in 0usize..LEAVES.len()) {
        let failing = LEAVES[idx];
        let referenced = referenced(&step).contains(failing);
        let (rec, ok) = run(&step, Some(failing));

        // Only the failing leaf can short-circuit, so it is always reached
        // when referenced.
        prop_assert_eq!(ok, !referenced);
        prop_assert_eq!(rec.starts(failing), usize::from(referenced));
        for name in LEAVES {
            prop_assert!(rec.starts(name) <= 1);
        }
    }

    #[test]
    fn flattening_keeps_display_stable(step in arb_step()) {
        let again = series([step.clone()]);
        // Wrapping a series in series is a no-op; anything else gains one level.
        match &step {
            Step::Series(_) => prop_assert_eq!(again.to_string(), step.to_string()),
            _ => prop_assert_eq!(again.to_string(), format!("series({step})")),
        }
    }
}
