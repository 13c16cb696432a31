//! End-to-end traversal behavior over miniature catalogs.

use grainfs_harness::catalog::{Catalog, TestCase, TestSuite};
use grainfs_harness::executor::{self, EmuBackend, RunContext, RunOptions, RunTotals};
use grainfs_harness::geometry::Geometry;
use grainfs_harness::resolver::{Override, Resolver};
use grainfs_harness::scheduler::StepWindow;
use grainfs_harness::selector::{PermCounts, Selection, case_perm_counts};
use grainfs_types::TestKinds;

const TWO_GEOMETRIES: [Geometry; 2] = [
    Geometry {
        name: "small",
        defines: [1, 1, 64, 16],
    },
    Geometry {
        name: "big",
        defines: [16, 16, 256, 32],
    },
];

/// X follows the case-local permutation; the geometry axis varies fastest.
fn beta_run(ctx: &mut RunContext<'_>, case_perm: u32) {
    let x = ctx.resolver.define_by_name("X").expect("X is declared");
    assert_eq!(x, i64::from(case_perm) + 1);
}

const BETA: TestCase = TestCase {
    id: "alpha_beta",
    name: "beta",
    path: "suites/alpha.toml",
    kinds: TestKinds::NORMAL,
    permutations: 2,
    defines: Some(&[&[1], &[2]]),
    define_map: &[Some(0)],
    filter: None,
    run: beta_run,
};

const ALPHA: TestSuite = TestSuite {
    id: "alpha",
    name: "alpha",
    kinds: TestKinds::NORMAL,
    define_names: &["X"],
    cases: &[BETA],
};

const CATALOG: Catalog = Catalog {
    suites: &[ALPHA],
    geometries: &TWO_GEOMETRIES,
};

#[test]
fn test_permutation_space_is_g_times_p() {
    assert_eq!(CATALOG.perm_space(&BETA), 4);
    let counts = count(&Selection::default());
    assert_eq!(
        counts,
        PermCounts {
            raw: 4,
            accepted: 4
        }
    );
}

#[test]
fn test_geometry_varies_fastest_through_resolution() {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(&[]);
    resolver.stage_suite(&ALPHA);
    resolver.stage_case(&BETA);

    let mut resolved = Vec::new();
    for perm in 0..CATALOG.perm_space(&BETA) {
        let (case_perm, geom_perm) = CATALOG.split_perm(perm);
        resolver.stage_permutation(&BETA, case_perm);
        resolver.stage_geometry(&CATALOG.geometries[geom_perm]);
        resolved.push(resolver.define_by_name("X").unwrap());
    }
    assert_eq!(resolved, vec![1, 1, 2, 2]);
}

#[test]
fn test_index_seven_under_two_geometries() {
    assert_eq!(CATALOG.split_perm(7), (3, 1));
    assert_eq!(CATALOG.join_perm(3, 1), 7);

    let selection = Selection {
        perm: Some(7),
        ..Selection::default()
    };
    let kept: Vec<u64> = (0..16)
        .filter(|&perm| !selection.skips_perm(&CATALOG, perm))
        .collect();
    assert_eq!(kept, vec![7], "no other index may be selected");
}

#[test]
fn test_override_wins_at_every_permutation() {
    let overrides = [Override {
        name: "X".to_owned(),
        value: 5,
    }];
    let mut resolver = Resolver::new();
    resolver.stage_overrides(&overrides);
    resolver.stage_suite(&ALPHA);
    resolver.stage_case(&BETA);

    for perm in 0..CATALOG.perm_space(&BETA) {
        let (case_perm, geom_perm) = CATALOG.split_perm(perm);
        resolver.stage_permutation(&BETA, case_perm);
        resolver.stage_geometry(&CATALOG.geometries[geom_perm]);
        assert_eq!(
            resolver.define_by_name("X").unwrap(),
            5,
            "override must shadow the case row at perm {perm}"
        );
    }
}

#[test]
fn test_execution_visits_every_permutation() {
    let totals = run(&Selection::default(), StepWindow::default());
    assert_eq!(
        totals,
        RunTotals {
            ran: 4,
            filtered: 0
        }
    );
}

#[test]
fn test_exact_permutation_selection_runs_once() {
    let selection = Selection {
        perm: Some(3),
        ..Selection::default()
    };
    let totals = run(&selection, StepWindow::default());
    assert_eq!(totals.ran, 1);
}

#[test]
fn test_window_bounds_execution() {
    let window = StepWindow {
        skip: 1,
        count: 2,
        every: 1,
    };
    let totals = run(&Selection::default(), window);
    assert_eq!(totals.ran, 2, "steps 1 and 2 fall inside the window");
}

// --- step accounting across the dynamic filter ---------------------------

/// Rejects case-local permutation 0; survivors must only see 1.
fn first_only(_resolver: &Resolver<'_>, case_perm: u32) -> bool {
    case_perm == 1
}

fn gamma_run(_ctx: &mut RunContext<'_>, case_perm: u32) {
    assert_eq!(case_perm, 1, "filtered permutation leaked through");
}

const GAMMA_CASE: TestCase = TestCase {
    id: "gamma_delta",
    name: "delta",
    path: "suites/gamma.toml",
    kinds: TestKinds::NORMAL,
    permutations: 2,
    defines: None,
    define_map: &[],
    filter: Some(first_only),
    run: gamma_run,
};

const GAMMA: TestSuite = TestSuite {
    id: "gamma",
    name: "gamma",
    kinds: TestKinds::NORMAL,
    define_names: &[],
    cases: &[GAMMA_CASE],
};

const GAMMA_CATALOG: Catalog = Catalog {
    suites: &[GAMMA],
    geometries: &TWO_GEOMETRIES,
};

#[test]
fn test_filter_rejection_still_consumes_step_slots() {
    // Steps 0 and 1 cover exactly the two filtered permutations: with
    // count=2 nothing runs, because the filtered permutations already
    // consumed the whole window.
    let window = StepWindow {
        skip: 0,
        count: 2,
        every: 1,
    };
    let mut backend = EmuBackend;
    let totals = executor::run(
        &GAMMA_CATALOG,
        &[],
        &Selection::default(),
        window,
        &mut backend,
        &RunOptions::default(),
    )
    .unwrap();
    assert_eq!(
        totals,
        RunTotals {
            ran: 0,
            filtered: 2
        }
    );

    // Widening the window reaches the surviving permutations.
    let totals = executor::run(
        &GAMMA_CATALOG,
        &[],
        &Selection::default(),
        StepWindow::default(),
        &mut backend,
        &RunOptions::default(),
    )
    .unwrap();
    assert_eq!(
        totals,
        RunTotals {
            ran: 2,
            filtered: 2
        }
    );
}

#[test]
fn test_persisted_image_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("disk.img");
    let opts = RunOptions {
        persist: Some(image.clone()),
        trace: None,
    };
    let mut backend = EmuBackend;
    executor::run(
        &CATALOG,
        &[],
        &Selection::default(),
        StepWindow::default(),
        &mut backend,
        &opts,
    )
    .unwrap();
    assert!(image.is_file(), "release must leave the disk image behind");
}

// --- helpers --------------------------------------------------------------

fn count(selection: &Selection) -> PermCounts {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(&[]);
    resolver.stage_suite(&ALPHA);
    resolver.stage_case(&BETA);
    case_perm_counts(&CATALOG, &mut resolver, selection, &BETA)
}

fn run(selection: &Selection, window: StepWindow) -> RunTotals {
    let mut backend = EmuBackend;
    executor::run(
        &CATALOG,
        &[],
        selection,
        window,
        &mut backend,
        &RunOptions::default(),
    )
    .unwrap()
}
