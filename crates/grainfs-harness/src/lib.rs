//! Parameterized test-execution harness for the grainfs storage engine.
//!
//! The harness resolves test parameters from cooperating, precedence-ordered
//! sources, enumerates every case × geometry permutation of a catalog,
//! filters that space by operator-supplied criteria, and drives a bounded
//! sequence of isolated runs against a provisioned block-device backend.
//!
//! ```text
//!  Catalog + Geometry table
//!        │
//!        ▼
//!    Resolver ── layered lookup: override > case row > geometry > default
//!        │
//!        ▼
//!    Selector ── suite/case/permutation predicates + dynamic filter
//!        │
//!        ▼
//!    Scheduler ── skip/count/every step window        (run only)
//!        │
//!        ▼
//!    Executor ── provision backend, invoke case, release
//! ```
//!
//! Reporting operations reuse the selector/resolver path without the
//! executor, so listed counts always equal actual run counts for the same
//! selection. Everything is single-threaded; each traversal owns its
//! resolver.

pub mod catalog;
pub mod corpus;
pub mod executor;
pub mod geometry;
pub mod report;
pub mod resolver;
pub mod scheduler;
pub mod selector;
