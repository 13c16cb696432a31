//! Test catalog tables consumed by the harness.
//!
//! The harness does not compile catalogs: it consumes pre-built static
//! suite/case tables (the built-in corpus supplies one for the shipped
//! binary). A malformed catalog is fatal, unvalidated input: row lengths
//! and map indices are trusted.

use grainfs_types::{DefineValue, TestKinds};

use crate::executor::RunContext;
use crate::geometry::Geometry;
use crate::resolver::Resolver;

/// Dynamic permutation filter, evaluated only after the resolver has been
/// staged for the permutation; receives the case-local permutation number
/// and may reject it for catalog-specific validity reasons.
pub type FilterFn = fn(&Resolver<'_>, u32) -> bool;

/// Case entry point. Receives the run context and the case-local
/// permutation number; failed assertions abort the run.
pub type RunFn = fn(&mut RunContext<'_>, u32);

/// One test case of a suite.
#[derive(Debug, Clone, Copy)]
pub struct TestCase {
    /// Identifier printed by the listings, unique across the catalog.
    pub id: &'static str,
    /// Name matched by the case filter.
    pub name: &'static str,
    /// Path of the catalog source this case was compiled from.
    pub path: &'static str,
    /// Test-kind bitmask.
    pub kinds: TestKinds,
    /// Case-local permutation count P; the full space is P × geometries.
    pub permutations: u32,
    /// P rows of slot values; row layout is case-private and reached
    /// through `define_map`.
    pub defines: Option<&'static [&'static [DefineValue]]>,
    /// Suite-define-index → slot in a permutation row.
    pub define_map: &'static [Option<usize>],
    /// Optional dynamic permutation filter.
    pub filter: Option<FilterFn>,
    /// Entry point invoked per surviving permutation.
    pub run: RunFn,
}

/// A suite: a named group of cases sharing a declared define namespace.
#[derive(Debug, Clone, Copy)]
pub struct TestSuite {
    /// Identifier printed by the listings.
    pub id: &'static str,
    /// Name matched by the suite filter.
    pub name: &'static str,
    /// Union of the suite's case kinds.
    pub kinds: TestKinds,
    /// Declared define names; indices are the suite-scoped namespace.
    pub define_names: &'static [&'static str],
    /// Ordered cases.
    pub cases: &'static [TestCase],
}

/// The harness input: suite tables plus the geometry axis.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    /// Ordered suites.
    pub suites: &'static [TestSuite],
    /// Geometry table; the fast-varying axis of every permutation space.
    pub geometries: &'static [Geometry],
}

impl Catalog {
    /// Size of `case`'s permutation space: G × P.
    pub fn perm_space(&self, case: &TestCase) -> u64 {
        self.geometries.len() as u64 * u64::from(case.permutations)
    }

    /// Decompose a flat permutation index into (case-local permutation,
    /// geometry index); the geometry axis varies fastest.
    pub fn split_perm(&self, perm: u64) -> (u32, usize) {
        let g = self.geometries.len() as u64;
        ((perm / g) as u32, (perm % g) as usize)
    }

    /// Compose a flat permutation index back from its two axes.
    pub fn join_perm(&self, case_perm: u32, geom_perm: usize) -> u64 {
        u64::from(case_perm) * self.geometries.len() as u64 + geom_perm as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GEOMETRIES;

    #[test]
    fn test_split_join_round_trip() {
        let catalog = Catalog {
            suites: &[],
            geometries: GEOMETRIES,
        };
        for perm in 0..64 {
            let (case_perm, geom_perm) = catalog.split_perm(perm);
            assert_eq!(catalog.join_perm(case_perm, geom_perm), perm);
        }
    }

    #[test]
    fn test_geometry_axis_varies_fastest() {
        let catalog = Catalog {
            suites: &[],
            geometries: GEOMETRIES,
        };
        let g = GEOMETRIES.len() as u64;
        assert_eq!(catalog.split_perm(0), (0, 0));
        assert_eq!(catalog.split_perm(g - 1), (0, GEOMETRIES.len() - 1));
        assert_eq!(catalog.split_perm(g), (1, 0));
    }
}
