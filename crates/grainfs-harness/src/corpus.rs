//! Built-in test corpus.
//!
//! Catalog compilation is an external concern; these static tables stand in
//! for its output so the shipped binary has something real to drive. The
//! cases exercise the emulated block device across every geometry. Case
//! bodies follow the corpus convention: they assert, and a failed
//! assertion aborts the run.

use grainfs_types::{BdError, BlockDevice, Predefine, TestKinds};

use crate::catalog::{Catalog, TestCase, TestSuite};
use crate::executor::RunContext;
use crate::geometry::GEOMETRIES;
use crate::resolver::Resolver;

/// The catalog the binary and the integration tests run against.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

const CATALOG: Catalog = Catalog {
    suites: &[BD_SUITE, WEAR_SUITE],
    geometries: GEOMETRIES,
};

// ---------------------------------------------------------------------------
// suite bd: basic device behavior
// ---------------------------------------------------------------------------

const BD_SUITE: TestSuite = TestSuite {
    id: "bd",
    name: "bd",
    kinds: TestKinds::NORMAL.union(TestKinds::VALGRIND),
    define_names: &["N"],
    cases: &[
        TestCase {
            id: "bd_write_read",
            name: "write_read",
            path: "suites/bd.toml",
            kinds: TestKinds::NORMAL,
            permutations: 3,
            defines: Some(&[&[1], &[2], &[4]]),
            define_map: &[Some(0)],
            filter: None,
            run: bd_write_read,
        },
        TestCase {
            id: "bd_erase_fill",
            name: "erase_fill",
            path: "suites/bd.toml",
            kinds: TestKinds::NORMAL,
            permutations: 1,
            defines: None,
            define_map: &[None],
            filter: None,
            run: bd_erase_fill,
        },
        TestCase {
            id: "bd_sync_persist",
            name: "sync_persist",
            path: "suites/bd.toml",
            kinds: TestKinds::NORMAL.union(TestKinds::VALGRIND),
            permutations: 1,
            defines: None,
            define_map: &[None],
            filter: None,
            run: bd_sync_persist,
        },
    ],
};

fn pattern(block: u32, i: usize) -> u8 {
    (block as usize).wrapping_mul(31).wrapping_add(i) as u8
}

/// Program a pattern over N blocks, read it back at read granularity.
fn bd_write_read(ctx: &mut RunContext<'_>, _case_perm: u32) {
    let cfg = ctx.cfg.storage;
    let n = ctx.resolver.define_by_name("N").expect("N is declared") as u32;
    let n = n.min(cfg.block_count);

    for block in 0..n {
        ctx.bd.erase(block).expect("erase");
        let mut off = 0;
        while off < cfg.block_size {
            let data: Vec<u8> = (0..cfg.prog_size as usize)
                .map(|i| pattern(block, off as usize + i))
                .collect();
            ctx.bd.prog(block, off, &data).expect("prog");
            off += cfg.prog_size;
        }
    }

    for block in 0..n {
        let mut off = 0;
        while off < cfg.block_size {
            let mut buf = vec![0u8; cfg.read_size as usize];
            ctx.bd.read(block, off, &mut buf).expect("read");
            for (i, &byte) in buf.iter().enumerate() {
                assert_eq!(
                    byte,
                    pattern(block, off as usize + i),
                    "mismatch at block {block} offset {off}"
                );
            }
            off += cfg.read_size;
        }
    }

    ctx.bd.sync().expect("sync");
}

/// Erase must restore the configured fill value over prior contents.
fn bd_erase_fill(ctx: &mut RunContext<'_>, _case_perm: u32) {
    let cfg = ctx.cfg.storage;
    ctx.bd.erase(0).expect("erase");

    let data = vec![0x5a; cfg.prog_size as usize];
    ctx.bd.prog(0, 0, &data).expect("prog");
    ctx.bd.erase(0).expect("erase");

    if ctx.cfg.erase_value >= 0 {
        let mut buf = vec![0u8; cfg.read_size as usize];
        ctx.bd.read(0, 0, &mut buf).expect("read");
        let fill = ctx.cfg.erase_value as u8;
        assert!(
            buf.iter().all(|&byte| byte == fill),
            "erase left stale contents"
        );
    }
}

/// Contents must survive a sync (and land in the disk image when one is
/// configured).
fn bd_sync_persist(ctx: &mut RunContext<'_>, _case_perm: u32) {
    let cfg = ctx.cfg.storage;
    let last = cfg.block_count - 1;
    ctx.bd.erase(last).expect("erase");

    let data: Vec<u8> = (0..cfg.prog_size as usize).map(|i| pattern(last, i)).collect();
    ctx.bd.prog(last, 0, &data).expect("prog");
    ctx.bd.sync().expect("sync");

    let mut buf = vec![0u8; cfg.read_size as usize];
    ctx.bd.read(last, 0, &mut buf).expect("read");
    for (i, &byte) in buf.iter().enumerate() {
        assert_eq!(byte, pattern(last, i), "mismatch after sync at {i}");
    }
}

// ---------------------------------------------------------------------------
// suite wear: erase-cycle budgets and bad blocks
// ---------------------------------------------------------------------------

const WEAR_SUITE: TestSuite = TestSuite {
    id: "wear",
    name: "wear",
    kinds: TestKinds::NORMAL.union(TestKinds::REENTRANT),
    // ERASE_CYCLES and BADBLOCK_BEHAVIOR alias predefines: the case rows
    // below configure the provisioned device itself.
    define_names: &["ERASE_CYCLES", "BADBLOCK_BEHAVIOR"],
    cases: &[
        TestCase {
            id: "wear_erase_budget",
            name: "erase_budget",
            path: "suites/wear.toml",
            kinds: TestKinds::NORMAL,
            permutations: 2,
            defines: Some(&[&[4, 0], &[4, 1]]),
            define_map: &[Some(0), Some(1)],
            filter: None,
            run: wear_erase_budget,
        },
        TestCase {
            id: "wear_spread",
            name: "spread",
            path: "suites/wear.toml",
            kinds: TestKinds::NORMAL.union(TestKinds::REENTRANT),
            permutations: 1,
            defines: None,
            define_map: &[None, None],
            filter: Some(wide_enough),
            run: wear_spread,
        },
    ],
};

/// Exhaust a block's erase-cycle budget and check the configured bad-block
/// behavior kicks in.
fn wear_erase_budget(ctx: &mut RunContext<'_>, _case_perm: u32) {
    let budget = ctx
        .resolver
        .define_by_name("ERASE_CYCLES")
        .expect("ERASE_CYCLES is declared") as u32;
    let behavior = ctx
        .resolver
        .define_by_name("BADBLOCK_BEHAVIOR")
        .expect("BADBLOCK_BEHAVIOR is declared");

    for _ in 0..budget {
        ctx.bd.erase(1).expect("erase within budget");
    }

    let chunk = vec![0u8; ctx.cfg.storage.prog_size as usize];
    match behavior {
        0 => assert_eq!(
            ctx.bd.prog(1, 0, &chunk),
            Err(BdError::BadBlock),
            "prog past budget must fail"
        ),
        1 => assert_eq!(
            ctx.bd.erase(1),
            Err(BdError::BadBlock),
            "erase past budget must fail"
        ),
        other => panic!("corpus row carries unknown behavior {other}"),
    }
}

/// Small devices cannot spread wear meaningfully; skip them.
fn wide_enough(resolver: &Resolver<'_>, _case_perm: u32) -> bool {
    resolver
        .predefine(Predefine::BlockCount)
        .is_ok_and(|count| count >= 64)
}

/// Touch every block once and verify contents stay independent.
fn wear_spread(ctx: &mut RunContext<'_>, _case_perm: u32) {
    let cfg = ctx.cfg.storage;
    for block in 0..cfg.block_count {
        ctx.bd.erase(block).expect("erase");
    }
    for block in 0..cfg.block_count {
        let data: Vec<u8> = (0..cfg.prog_size as usize)
            .map(|i| pattern(block, i))
            .collect();
        ctx.bd.prog(block, 0, &data).expect("prog");
    }
    for block in 0..cfg.block_count {
        let mut buf = vec![0u8; cfg.read_size as usize];
        ctx.bd.read(block, 0, &mut buf).expect("read");
        for (i, &byte) in buf.iter().enumerate() {
            assert_eq!(byte, pattern(block, i), "cross-block bleed at {block}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_shape_is_consistent() {
        let catalog = catalog();
        for suite in catalog.suites {
            for case in suite.cases {
                assert_eq!(
                    case.define_map.len(),
                    suite.define_names.len(),
                    "{}: define_map length",
                    case.id
                );
                if let Some(rows) = case.defines {
                    assert_eq!(
                        rows.len(),
                        case.permutations as usize,
                        "{}: row count",
                        case.id
                    );
                }
                assert!(case.permutations > 0, "{}: empty case", case.id);
                assert!(
                    suite.kinds.contains(case.kinds),
                    "{}: kinds outside suite mask",
                    case.id
                );
            }
        }
    }

    #[test]
    fn test_corpus_ids_are_unique() {
        let catalog = catalog();
        let mut ids: Vec<&str> = catalog
            .suites
            .iter()
            .flat_map(|suite| suite.cases.iter().map(|case| case.id))
            .collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before, "duplicate case id in corpus");
    }
}
