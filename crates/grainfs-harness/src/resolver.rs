//! Layered parameter resolution.
//!
//! A [`Resolver`] is an explicit value holding a fixed-size ordered array of
//! optional (index-map, values) layer pairs, staged against the traversal
//! scope:
//!
//! ```text
//!  layer 0  operator overrides          (highest precedence)
//!  layer 1  active case-permutation row
//!  layer 2  active geometry
//!  layer 3  built-in defaults           (lowest precedence)
//! ```
//!
//! Two namespaces share the mechanism. Predefines search all four layers;
//! suite-scoped defines search only the override and case layers. There is
//! no geometry or default fallback for defines, so an unresolved define is
//! always fatal. The first layer whose map entry is set determines the value.
//!
//! Scope transitions re-stage only what changed. Switching suites rebuilds
//! the override→define alias map and switching cases rebuilds the
//! case→predefine alias map, both by name comparison (quadratic, but suite
//! and case switches are rare). Switching permutation only rebinds the case
//! layer's values row; resolution runs for every parameter on every
//! permutation and must not re-scan names there.
//!
//! Each traversal owns its resolver; a caller must never read through a
//! layer before the matching staging call for the current scope.

use grainfs_error::{HarnessError, Result};
use grainfs_types::{DefineValue, Predefine};
use tracing::trace;

use crate::catalog::{TestCase, TestSuite};
use crate::geometry::{DEFAULT_PREDEFINE_MAP, DEFAULTS, GEOMETRY_PREDEFINE_MAP, Geometry};

/// Number of precedence layers.
pub const LAYER_COUNT: usize = 4;

const LAYER_OVERRIDE: usize = 0;
const LAYER_CASE: usize = 1;
const LAYER_GEOMETRY: usize = 2;
const LAYER_DEFAULT: usize = 3;

/// One operator-supplied `name=value` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Parameter name, matched against both namespaces.
    pub name: String,
    /// Value the override forces.
    pub value: DefineValue,
}

/// A values table: static tables are borrowed, override values are owned.
#[derive(Debug)]
enum ValuesRef<'a> {
    Owned(Vec<DefineValue>),
    Borrowed(&'a [DefineValue]),
}

impl ValuesRef<'_> {
    fn get(&self, slot: usize) -> Option<DefineValue> {
        match self {
            Self::Owned(values) => values.get(slot).copied(),
            Self::Borrowed(values) => values.get(slot).copied(),
        }
    }
}

/// An index map: static maps are borrowed, alias maps rebuilt on scope
/// changes are owned. An unmapped slot is `None`, never a reserved value.
#[derive(Debug)]
enum MapRef<'a> {
    Owned(Vec<Option<usize>>),
    Borrowed(&'a [Option<usize>]),
}

impl MapRef<'_> {
    fn slot(&self, index: usize) -> Option<usize> {
        match self {
            Self::Owned(map) => map.get(index).copied().flatten(),
            Self::Borrowed(map) => map.get(index).copied().flatten(),
        }
    }
}

/// Layered namespace lookup over the active scope.
#[derive(Debug)]
pub struct Resolver<'a> {
    values: [Option<ValuesRef<'a>>; LAYER_COUNT],
    predefine_maps: [Option<MapRef<'a>>; LAYER_COUNT],
    define_maps: [Option<MapRef<'a>>; LAYER_COUNT],
    /// Override names, kept for alias-map rebuilds on scope changes.
    override_names: Vec<String>,
    /// Declared define names of the active suite.
    define_names: &'a [&'a str],
}

impl<'a> Resolver<'a> {
    /// A resolver with only the built-in default layer staged.
    pub fn new() -> Self {
        let mut resolver = Self {
            values: [None, None, None, None],
            predefine_maps: [None, None, None, None],
            define_maps: [None, None, None, None],
            override_names: Vec::new(),
            define_names: &[],
        };
        resolver.values[LAYER_DEFAULT] = Some(ValuesRef::Borrowed(&DEFAULTS));
        resolver.predefine_maps[LAYER_DEFAULT] = Some(MapRef::Borrowed(&DEFAULT_PREDEFINE_MAP));
        // The geometry layer's map is fixed; only its values rebind.
        resolver.predefine_maps[LAYER_GEOMETRY] = Some(MapRef::Borrowed(&GEOMETRY_PREDEFINE_MAP));
        resolver
    }

    /// Stage the operator override layer. Called once, after option
    /// parsing; names are matched into the predefine namespace here and
    /// into each suite's define namespace at suite staging.
    pub fn stage_overrides(&mut self, overrides: &'a [Override]) {
        self.override_names = overrides.iter().map(|o| o.name.clone()).collect();
        self.values[LAYER_OVERRIDE] =
            Some(ValuesRef::Owned(overrides.iter().map(|o| o.value).collect()));

        let mut map = vec![None; Predefine::COUNT];
        for (i, override_) in overrides.iter().enumerate() {
            for predefine in Predefine::ALL {
                if override_.name == predefine.name() {
                    map[predefine.index()] = Some(i);
                }
            }
        }
        self.predefine_maps[LAYER_OVERRIDE] = Some(MapRef::Owned(map));
    }

    /// Stage a suite: adopt its define namespace and rebuild the
    /// override→define alias map.
    pub fn stage_suite(&mut self, suite: &'a TestSuite) {
        trace!(suite = suite.name, "staging suite defines");
        self.define_names = suite.define_names;

        let mut map = vec![None; suite.define_names.len()];
        for (i, name) in self.override_names.iter().enumerate() {
            for (j, define_name) in suite.define_names.iter().enumerate() {
                if name == define_name {
                    map[j] = Some(i);
                }
            }
        }
        self.define_maps[LAYER_OVERRIDE] = Some(MapRef::Owned(map));
    }

    /// Stage a case: adopt its define map and rebuild the case→predefine
    /// alias map, letting the case satisfy a global parameter through its
    /// own suite-scoped definition. The owning suite must be staged.
    pub fn stage_case(&mut self, case: &'a TestCase) {
        trace!(case = case.name, "staging case defines");
        self.define_maps[LAYER_CASE] = Some(MapRef::Borrowed(case.define_map));

        let mut map = vec![None; Predefine::COUNT];
        for (i, define_name) in self.define_names.iter().enumerate() {
            for predefine in Predefine::ALL {
                if *define_name == predefine.name() {
                    map[predefine.index()] = case.define_map.get(i).copied().flatten();
                }
            }
        }
        self.predefine_maps[LAYER_CASE] = Some(MapRef::Owned(map));
    }

    /// Stage a case-local permutation: rebind the case layer's values row.
    /// O(1); this runs for every permutation of every case.
    pub fn stage_permutation(&mut self, case: &'a TestCase, case_perm: u32) {
        self.values[LAYER_CASE] = case
            .defines
            .map(|rows| ValuesRef::Borrowed(rows[case_perm as usize]));
    }

    /// Stage a geometry: rebind the geometry layer's values. O(1).
    pub fn stage_geometry(&mut self, geometry: &'a Geometry) {
        self.values[LAYER_GEOMETRY] = Some(ValuesRef::Borrowed(&geometry.defines));
    }

    /// Resolve a global parameter through override > case > geometry >
    /// default precedence.
    pub fn predefine(&self, predefine: Predefine) -> Result<DefineValue> {
        self.lookup(&self.predefine_maps, predefine.index())
            .ok_or_else(|| HarnessError::UnresolvedPredefine(predefine.name()))
    }

    /// Resolve a suite-scoped parameter by its declared index; override >
    /// case row, no fallback.
    pub fn define(&self, define: usize) -> Result<DefineValue> {
        self.lookup(&self.define_maps, define).ok_or_else(|| {
            HarnessError::UnresolvedDefine(
                self.define_names
                    .get(define)
                    .map_or_else(|| format!("#{define}"), |name| (*name).to_owned()),
            )
        })
    }

    /// Resolve a suite-scoped parameter by its declared name.
    pub fn define_by_name(&self, name: &str) -> Result<DefineValue> {
        let index = self
            .define_names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| HarnessError::UnresolvedDefine(name.to_owned()))?;
        self.define(index)
    }

    /// Declared define names of the active suite.
    pub fn define_names(&self) -> &[&str] {
        self.define_names
    }

    fn lookup(&self, maps: &[Option<MapRef<'a>>; LAYER_COUNT], index: usize) -> Option<DefineValue> {
        for layer in 0..LAYER_COUNT {
            if let (Some(values), Some(map)) = (&self.values[layer], &maps[layer]) {
                if let Some(slot) = map.slot(index) {
                    return values.get(slot);
                }
            }
        }
        None
    }
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GEOMETRIES;
    use grainfs_types::TestKinds;

    fn noop_run(_ctx: &mut crate::executor::RunContext<'_>, _case_perm: u32) {}

    const ROWS: [&[DefineValue]; 2] = [&[100, 7], &[200, 9]];

    const CASE: TestCase = TestCase {
        id: "fixture_case",
        name: "fixture",
        path: "suites/fixture.toml",
        kinds: TestKinds::NORMAL,
        permutations: 2,
        defines: Some(&ROWS),
        define_map: &[Some(0), Some(1)],
        filter: None,
        run: noop_run,
    };

    // Declares BLOCK_COUNT as a suite define: the case row satisfies the
    // global parameter through the suite-scoped definition.
    const SUITE: TestSuite = TestSuite {
        id: "fixture_suite",
        name: "fixture",
        kinds: TestKinds::NORMAL,
        define_names: &["BLOCK_COUNT", "DEPTH"],
        cases: &[CASE],
    };

    #[test]
    fn test_defaults_resolve_without_staging() {
        let resolver = Resolver::new();
        assert_eq!(resolver.predefine(Predefine::CacheSize).unwrap(), 64);
        assert_eq!(resolver.predefine(Predefine::BlockCycles).unwrap(), -1);
    }

    #[test]
    fn test_geometry_beats_default() {
        let mut resolver = Resolver::new();
        resolver.stage_geometry(&GEOMETRIES[3]); // nor: 1/1/4096/256
        assert_eq!(resolver.predefine(Predefine::BlockSize).unwrap(), 4096);
        // Parameters the geometry does not map still fall through.
        assert_eq!(resolver.predefine(Predefine::CacheSize).unwrap(), 64);
    }

    #[test]
    fn test_case_row_beats_geometry() {
        let mut resolver = Resolver::new();
        resolver.stage_suite(&SUITE);
        resolver.stage_case(&CASE);
        resolver.stage_permutation(&CASE, 0);
        resolver.stage_geometry(&GEOMETRIES[0]);
        assert_eq!(
            resolver.predefine(Predefine::BlockCount).unwrap(),
            100,
            "case row must shadow the geometry value"
        );
    }

    #[test]
    fn test_override_wins_in_both_namespaces() {
        let overrides = [Override {
            name: "BLOCK_COUNT".to_owned(),
            value: 5,
        }];
        let mut resolver = Resolver::new();
        resolver.stage_overrides(&overrides);
        resolver.stage_suite(&SUITE);
        resolver.stage_case(&CASE);
        resolver.stage_permutation(&CASE, 1);
        resolver.stage_geometry(&GEOMETRIES[0]);

        assert_eq!(resolver.predefine(Predefine::BlockCount).unwrap(), 5);
        assert_eq!(resolver.define_by_name("BLOCK_COUNT").unwrap(), 5);
    }

    #[test]
    fn test_permutation_rebind_switches_rows() {
        let mut resolver = Resolver::new();
        resolver.stage_suite(&SUITE);
        resolver.stage_case(&CASE);

        resolver.stage_permutation(&CASE, 0);
        assert_eq!(resolver.define_by_name("DEPTH").unwrap(), 7);
        resolver.stage_permutation(&CASE, 1);
        assert_eq!(resolver.define_by_name("DEPTH").unwrap(), 9);
    }

    #[test]
    fn test_unresolved_define_is_fatal() {
        let mut resolver = Resolver::new();
        resolver.stage_suite(&SUITE);
        // No case staged: the define namespace has no mapped layer.
        let err = resolver.define_by_name("DEPTH").unwrap_err();
        assert_eq!(err.to_string(), "undefined define DEPTH");
    }

    #[test]
    fn test_unknown_define_name_is_fatal() {
        let resolver = Resolver::new();
        let err = resolver.define_by_name("NO_SUCH_DEFINE").unwrap_err();
        assert_eq!(err.to_string(), "undefined define NO_SUCH_DEFINE");
    }

    #[test]
    fn test_suite_switch_rebuilds_override_aliases() {
        const OTHER: TestSuite = TestSuite {
            id: "other_suite",
            name: "other",
            kinds: TestKinds::NORMAL,
            define_names: &["DEPTH"],
            cases: &[],
        };
        let overrides = [Override {
            name: "DEPTH".to_owned(),
            value: 42,
        }];
        let mut resolver = Resolver::new();
        resolver.stage_overrides(&overrides);

        resolver.stage_suite(&SUITE);
        assert_eq!(resolver.define(1).unwrap(), 42, "DEPTH is index 1 here");

        resolver.stage_suite(&OTHER);
        assert_eq!(resolver.define(0).unwrap(), 42, "DEPTH is index 0 here");
    }
}
