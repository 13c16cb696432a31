//! Permutation selection: the ordered predicate chain deciding which
//! (suite, case, permutation) triples are in scope.
//!
//! Stages 1–3 (suite, case, permutation) are static name/kind/index checks.
//! Stage 4 is the case's own dynamic filter, evaluated only for survivors
//! of 1–3 and only after the resolver has staged that permutation's
//! values. Two counts fall out of the chain: "raw" survives 1–3,
//! "accepted" additionally survives 4.

use std::ops::AddAssign;

use grainfs_types::TestKinds;

use crate::catalog::{Catalog, TestCase, TestSuite};
use crate::resolver::Resolver;

/// Operator-requested selection criteria; every predicate is independently
/// toggleable and absent criteria reject nothing.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Exact suite name.
    pub suite: Option<String>,
    /// Exact case name.
    pub case: Option<String>,
    /// Exact flat permutation index.
    pub perm: Option<u64>,
    /// Exact geometry name.
    pub geometry: Option<String>,
    /// Kind mask; empty means no kind filtering.
    pub kinds: TestKinds,
}

impl Selection {
    /// Stage 1: suite name and kind mask.
    pub fn skips_suite(&self, suite: &TestSuite) -> bool {
        self.suite.as_deref().is_some_and(|name| name != suite.name)
            || (!self.kinds.is_empty() && (suite.kinds & self.kinds).is_empty())
    }

    /// Stage 2: case name and kind mask.
    pub fn skips_case(&self, case: &TestCase) -> bool {
        self.case.as_deref().is_some_and(|name| name != case.name)
            || (!self.kinds.is_empty() && (case.kinds & self.kinds).is_empty())
    }

    /// Stage 3: exact permutation index and geometry name.
    pub fn skips_perm(&self, catalog: &Catalog, perm: u64) -> bool {
        let (_, geom_perm) = catalog.split_perm(perm);
        self.perm.is_some_and(|requested| requested != perm)
            || self
                .geometry
                .as_deref()
                .is_some_and(|name| name != catalog.geometries[geom_perm].name)
    }
}

/// Raw/accepted permutation tallies; raw ≥ accepted always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermCounts {
    /// Survivors of selection stages 1–3.
    pub raw: u64,
    /// Survivors of all four stages.
    pub accepted: u64,
}

impl AddAssign for PermCounts {
    fn add_assign(&mut self, other: Self) {
        self.raw += other.raw;
        self.accepted += other.accepted;
    }
}

/// Count raw and accepted permutations of one case. The suite and case
/// must already be staged on `resolver`; the permutation and geometry
/// layers are staged here, exactly as the executor stages them.
pub fn case_perm_counts(
    catalog: &Catalog,
    resolver: &mut Resolver<'_>,
    selection: &Selection,
    case: &'static TestCase,
) -> PermCounts {
    let mut counts = PermCounts::default();
    for perm in 0..catalog.perm_space(case) {
        if selection.skips_perm(catalog, perm) {
            continue;
        }
        counts.raw += 1;

        let (case_perm, geom_perm) = catalog.split_perm(perm);
        resolver.stage_permutation(case, case_perm);
        resolver.stage_geometry(&catalog.geometries[geom_perm]);

        if let Some(filter) = case.filter {
            if !filter(resolver, case_perm) {
                continue;
            }
        }
        counts.accepted += 1;
    }
    counts
}
