//! Agreement between reporting counts and execution over the built-in
//! corpus: listed counts must equal actual run counts for any selection.

use proptest::prelude::*;

use grainfs_harness::corpus;
use grainfs_harness::executor::{self, EmuBackend, RunOptions};
use grainfs_harness::report;
use grainfs_harness::resolver::Resolver;
use grainfs_harness::scheduler::StepWindow;
use grainfs_harness::selector::{PermCounts, Selection, case_perm_counts};
use grainfs_types::TestKinds;

fn total_counts(selection: &Selection) -> PermCounts {
    let catalog = corpus::catalog();
    let mut resolver = Resolver::new();
    resolver.stage_overrides(&[]);

    let mut counts = PermCounts::default();
    for suite in catalog.suites {
        if selection.skips_suite(suite) {
            continue;
        }
        resolver.stage_suite(suite);
        for case in suite.cases {
            if selection.skips_case(case) {
                continue;
            }
            resolver.stage_case(case);
            counts += case_perm_counts(catalog, &mut resolver, selection, case);
        }
    }
    counts
}

#[test]
fn test_run_totals_equal_selector_counts() {
    let selection = Selection::default();
    let counts = total_counts(&selection);
    assert!(counts.raw > 0, "corpus must not be empty");

    let mut backend = EmuBackend;
    let totals = executor::run(
        corpus::catalog(),
        &[],
        &selection,
        StepWindow::default(),
        &mut backend,
        &RunOptions::default(),
    )
    .unwrap();

    assert_eq!(totals.ran, counts.accepted);
    assert_eq!(totals.ran + totals.filtered, counts.raw);
}

#[test]
fn test_summary_reports_the_same_tallies() {
    let selection = Selection::default();
    let counts = total_counts(&selection);
    let summary = report::render_summary(corpus::catalog(), &[], &selection);
    assert!(
        summary.contains(&format!("{}/{}", counts.accepted, counts.raw)),
        "summary disagrees with the selector: {summary}"
    );
}

#[test]
fn test_suite_selection_restricts_execution() {
    let selection = Selection {
        suite: Some("wear".to_owned()),
        ..Selection::default()
    };
    let counts = total_counts(&selection);

    let mut backend = EmuBackend;
    let totals = executor::run(
        corpus::catalog(),
        &[],
        &selection,
        StepWindow::default(),
        &mut backend,
        &RunOptions::default(),
    )
    .unwrap();
    assert_eq!(totals.ran, counts.accepted);
}

#[test]
fn test_nand_filter_rejects_small_device_case() {
    // wear/spread requires at least 64 blocks; nand has 32, so its column
    // survives stages 1-3 but not the dynamic filter.
    let selection = Selection {
        suite: Some("wear".to_owned()),
        case: Some("spread".to_owned()),
        geometry: Some("nand".to_owned()),
        ..Selection::default()
    };
    let counts = total_counts(&selection);
    assert_eq!(
        counts,
        PermCounts {
            raw: 1,
            accepted: 0
        }
    );
}

fn selection_strategy() -> impl Strategy<Value = Selection> {
    let suites = prop_oneof![
        Just(None),
        Just(Some("bd".to_owned())),
        Just(Some("wear".to_owned())),
        Just(Some("missing".to_owned())),
    ];
    let cases = prop_oneof![
        Just(None),
        Just(Some("write_read".to_owned())),
        Just(Some("spread".to_owned())),
        Just(Some("missing".to_owned())),
    ];
    let geometries = prop_oneof![
        Just(None),
        Just(Some("default".to_owned())),
        Just(Some("nand".to_owned())),
        Just(Some("bogus".to_owned())),
    ];
    (
        suites,
        cases,
        proptest::option::of(0u64..40),
        geometries,
        0u8..8,
    )
        .prop_map(|(suite, case, perm, geometry, kind_bits)| Selection {
            suite,
            case,
            perm,
            geometry,
            kinds: TestKinds::from_bits_truncate(kind_bits),
        })
}

proptest! {
    /// Raw never undercounts accepted, for any selection.
    #[test]
    fn raw_is_at_least_accepted(selection in selection_strategy()) {
        let counts = total_counts(&selection);
        prop_assert!(counts.raw >= counts.accepted);
    }

    /// An exact permutation index admits at most one permutation per case.
    #[test]
    fn exact_perm_selects_at_most_one_per_case(perm in 0u64..40) {
        let catalog = corpus::catalog();
        let selection = Selection { perm: Some(perm), ..Selection::default() };
        let mut resolver = Resolver::new();
        resolver.stage_overrides(&[]);
        for suite in catalog.suites {
            resolver.stage_suite(suite);
            for case in suite.cases {
                resolver.stage_case(case);
                let counts = case_perm_counts(catalog, &mut resolver, &selection, case);
                prop_assert!(counts.raw <= 1);
            }
        }
    }
}
