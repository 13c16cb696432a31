//! Read-only reporting traversals.
//!
//! Every listing walks the catalog through the exact selector/resolver
//! path the executor uses, so listed counts always equal actual run counts
//! for the same selection. None of these provision a backend. Renderers
//! return the finished text; the binary prints it.

use grainfs_error::Result;
use grainfs_types::{Predefine, TestKinds};

use crate::catalog::Catalog;
use crate::geometry::{DEFAULT_PREDEFINE_MAP, GEOMETRY_PREDEFINE_MAP};
use crate::resolver::{Override, Resolver};
use crate::selector::{PermCounts, Selection, case_perm_counts};

/// Aggregate summary: one TOTAL row over the surviving catalog.
pub fn render_summary(catalog: &Catalog, overrides: &[Override], selection: &Selection) -> String {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut cases = 0usize;
    let mut kinds = TestKinds::empty();
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

        cases += suite.cases.len();
        kinds |= suite.kinds;
    }

    let mut lines = vec![format!(
        "{:<36} {:>7} {:>7} {:>7} {:>11}",
        "", "types", "suites", "cases", "perms"
    )];
    lines.push(format!(
        "{:<36} {:>7} {:>7} {:>7} {:>11}",
        "TOTAL",
        kinds.letters(),
        catalog.suites.len(),
        cases,
        format!("{}/{}", counts.accepted, counts.raw),
    ));
    lines.join("\n")
}

/// List surviving suites with case counts and perm tallies.
pub fn render_suites(catalog: &Catalog, overrides: &[Override], selection: &Selection) -> String {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut lines = vec![format!(
        "{:<36} {:>7} {:>7} {:>11}",
        "suite", "types", "cases", "perms"
    )];
    for suite in catalog.suites {
        if selection.skips_suite(suite) {
            continue;
        }
        resolver.stage_suite(suite);

        let mut counts = PermCounts::default();
        for case in suite.cases {
            if selection.skips_case(case) {
                continue;
            }
            resolver.stage_case(case);
            counts += case_perm_counts(catalog, &mut resolver, selection, case);
        }

        lines.push(format!(
            "{:<36} {:>7} {:>7} {:>11}",
            suite.id,
            suite.kinds.letters(),
            suite.cases.len(),
            format!("{}/{}", counts.accepted, counts.raw),
        ));
    }
    lines.join("\n")
}

/// List surviving cases with their perm tallies.
pub fn render_cases(catalog: &Catalog, overrides: &[Override], selection: &Selection) -> String {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut lines = vec![format!("{:<36} {:>7} {:>11}", "case", "types", "perms")];
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
            let counts = case_perm_counts(catalog, &mut resolver, selection, case);

            lines.push(format!(
                "{:<36} {:>7} {:>11}",
                case.id,
                case.kinds.letters(),
                format!("{}/{}", counts.accepted, counts.raw),
            ));
        }
    }
    lines.join("\n")
}

/// Map each surviving case to the catalog path it was compiled from.
pub fn render_paths(catalog: &Catalog, selection: &Selection) -> String {
    let mut lines = Vec::new();
    for suite in catalog.suites {
        if selection.skips_suite(suite) {
            continue;
        }
        for case in suite.cases {
            if selection.skips_case(case) {
                continue;
            }
            lines.push(format!("{:<36} {:<36}", case.id, case.path));
        }
    }
    lines.join("\n")
}

/// List every surviving permutation's resolved, case-mapped define values.
pub fn render_defines(
    catalog: &Catalog,
    overrides: &[Override],
    selection: &Selection,
) -> Result<String> {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut lines = Vec::new();
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

            for perm in 0..catalog.perm_space(case) {
                if selection.skips_perm(catalog, perm) {
                    continue;
                }
                let (case_perm, geom_perm) = catalog.split_perm(perm);
                resolver.stage_permutation(case, case_perm);
                resolver.stage_geometry(&catalog.geometries[geom_perm]);

                let mut parts = vec![format!(
                    "GEOMETRY={}",
                    catalog.geometries[geom_perm].name
                )];
                for (i, name) in suite.define_names.iter().enumerate() {
                    if case.define_map.get(i).copied().flatten().is_some() {
                        parts.push(format!("{}={}", name, resolver.define(i)?));
                    }
                }
                lines.push(format!(
                    "{:<36} {}",
                    format!("{}#{}", case.id, perm),
                    parts.join(" ")
                ));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// List each geometry's resolved predefines, honoring the geometry filter.
pub fn render_geometries(
    catalog: &Catalog,
    overrides: &[Override],
    selection: &Selection,
) -> Result<String> {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut lines = Vec::new();
    for geometry in catalog.geometries {
        if selection
            .geometry
            .as_deref()
            .is_some_and(|name| name != geometry.name)
        {
            continue;
        }
        resolver.stage_geometry(geometry);

        let mut parts = Vec::new();
        for predefine in Predefine::ALL {
            if GEOMETRY_PREDEFINE_MAP[predefine.index()].is_some() {
                parts.push(format!("{}={}", predefine, resolver.predefine(predefine)?));
            }
        }
        lines.push(format!("{:<36} {}", geometry.name, parts.join(" ")));
    }
    Ok(lines.join("\n"))
}

/// List the built-in defaults (overrides still take precedence).
pub fn render_defaults(overrides: &[Override]) -> Result<String> {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut parts = Vec::new();
    for predefine in Predefine::ALL {
        if DEFAULT_PREDEFINE_MAP[predefine.index()].is_some() {
            parts.push(format!("{}={}", predefine, resolver.predefine(predefine)?));
        }
    }
    Ok(format!("{:<36} {}", "defaults", parts.join(" ")))
}
