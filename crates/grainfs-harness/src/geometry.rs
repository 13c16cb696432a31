//! Disk geometries and built-in parameter defaults.
//!
//! A geometry is a named, immutable assignment of the four storage-shape
//! parameters; the geometry table is one axis of every case's permutation
//! space. The defaults here are the lowest-precedence resolver layer.

use grainfs_types::{DefineValue, Predefine};

/// Number of parameter slots in a geometry record.
pub const GEOMETRY_DEFINE_COUNT: usize = 4;

/// A named disk shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Name used by the geometry filter and the listings.
    pub name: &'static str,
    /// Slot values: READ_SIZE, PROG_SIZE, BLOCK_SIZE, BLOCK_COUNT.
    pub defines: [DefineValue; GEOMETRY_DEFINE_COUNT],
}

/// The built-in geometry table.
pub const GEOMETRIES: &[Geometry] = &[
    Geometry {
        name: "default",
        defines: [16, 16, 512, 2048],
    },
    Geometry {
        name: "eeprom",
        defines: [1, 1, 512, 2048],
    },
    Geometry {
        name: "emmc",
        defines: [512, 512, 512, 2048],
    },
    Geometry {
        name: "nor",
        defines: [1, 1, 4096, 256],
    },
    Geometry {
        name: "nand",
        defines: [4096, 4096, 32768, 32],
    },
];

/// Predefine-space index map of the geometry layer: every geometry binds
/// the four shape parameters, in slot order.
pub(crate) const GEOMETRY_PREDEFINE_MAP: [Option<usize>; Predefine::COUNT] = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    None,
    None,
    None,
    None,
    None,
    None,
];

/// Built-in default values, indexed like [`Predefine::ALL`].
pub(crate) const DEFAULTS: [DefineValue; Predefine::COUNT] =
    [16, 16, 512, 2048, -1, 64, 16, 0xff, 0, 0];

/// Every predefine carries a built-in default.
pub(crate) const DEFAULT_PREDEFINE_MAP: [Option<usize>; Predefine::COUNT] = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    Some(7),
    Some(8),
    Some(9),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_names_are_unique() {
        for (i, a) in GEOMETRIES.iter().enumerate() {
            for b in &GEOMETRIES[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_geometry_shapes_are_consistent() {
        for geometry in GEOMETRIES {
            let [read, prog, block, count] = geometry.defines;
            assert!(read > 0 && prog > 0 && block > 0 && count > 0);
            assert_eq!(block % read, 0, "{}: block/read mismatch", geometry.name);
            assert_eq!(block % prog, 0, "{}: block/prog mismatch", geometry.name);
        }
    }
}
