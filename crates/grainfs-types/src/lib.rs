//! Shared value types for the grainfs test harness.
//!
//! This crate is the leaf of the workspace: the parameter value type, the
//! global parameter universe, the test-kind bitmask, and the block-device
//! abstraction the harness drives test cases against.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A resolved test parameter value.
///
/// Signed so sentinel-style catalog values like `BLOCK_CYCLES = -1`
/// (wear leveling disabled) stay representable; "unset" is always an
/// `Option::None`, never a value.
pub type DefineValue = i64;

bitflags! {
    /// Test-kind bitmask carried by suites and cases.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TestKinds: u8 {
        /// Ordinary functional test.
        const NORMAL = 1 << 0;
        /// Reentrant test, rerun against simulated power loss.
        const REENTRANT = 1 << 1;
        /// Test intended for execution under Valgrind.
        const VALGRIND = 1 << 2;
    }
}

impl TestKinds {
    /// Compact letter form used by the tabular listings, e.g. `nrV`.
    pub fn letters(self) -> String {
        let mut out = String::with_capacity(3);
        if self.contains(Self::NORMAL) {
            out.push('n');
        }
        if self.contains(Self::REENTRANT) {
            out.push('r');
        }
        if self.contains(Self::VALGRIND) {
            out.push('V');
        }
        out
    }
}

/// The fixed universe of global test parameters.
///
/// Every suite may consume these without declaring them; geometries and the
/// built-in defaults map subsets of this universe. Discriminants are the
/// stable indices used by the resolver's layer maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predefine {
    ReadSize,
    ProgSize,
    BlockSize,
    BlockCount,
    BlockCycles,
    CacheSize,
    LookaheadSize,
    EraseValue,
    EraseCycles,
    BadblockBehavior,
}

impl Predefine {
    /// Number of predefines in the universe.
    pub const COUNT: usize = 10;

    /// All predefines in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::ReadSize,
        Self::ProgSize,
        Self::BlockSize,
        Self::BlockCount,
        Self::BlockCycles,
        Self::CacheSize,
        Self::LookaheadSize,
        Self::EraseValue,
        Self::EraseCycles,
        Self::BadblockBehavior,
    ];

    /// Stable index of this predefine.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Catalog-facing name of this predefine.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadSize => "READ_SIZE",
            Self::ProgSize => "PROG_SIZE",
            Self::BlockSize => "BLOCK_SIZE",
            Self::BlockCount => "BLOCK_COUNT",
            Self::BlockCycles => "BLOCK_CYCLES",
            Self::CacheSize => "CACHE_SIZE",
            Self::LookaheadSize => "LOOKAHEAD_SIZE",
            Self::EraseValue => "ERASE_VALUE",
            Self::EraseCycles => "ERASE_CYCLES",
            Self::BadblockBehavior => "BADBLOCK_BEHAVIOR",
        }
    }

    /// Look a predefine up by its catalog-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Predefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage geometry handed to a provisioned backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Minimum read granularity in bytes.
    pub read_size: u32,
    /// Minimum program granularity in bytes.
    pub prog_size: u32,
    /// Erase block size in bytes.
    pub block_size: u32,
    /// Number of erase blocks on the device.
    pub block_count: u32,
    /// Wear-cycle budget before the engine rotates blocks; -1 disables.
    pub block_cycles: i32,
    /// Cache size in bytes.
    pub cache_size: u32,
    /// Lookahead buffer size in bytes.
    pub lookahead_size: u32,
}

/// Failure of a block-device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdError {
    /// Block index or byte range outside the device.
    OutOfRange,
    /// Offset or length not aligned to the device granularity.
    Alignment,
    /// Operation hit a block past its simulated erase-cycle budget.
    BadBlock,
    /// The configuration record could not be realized as a device.
    InvalidConfig,
    /// Simulated power budget exhausted mid-operation.
    PowerLoss,
    /// Host I/O failure while persisting or loading a disk image.
    Io,
}

impl BdError {
    /// Integer status code reported across the provisioning interface.
    pub fn code(self) -> i32 {
        match self {
            Self::OutOfRange | Self::Alignment | Self::InvalidConfig => -22,
            Self::BadBlock | Self::Io => -5,
            Self::PowerLoss => -4,
        }
    }
}

impl fmt::Display for BdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("block device access out of range"),
            Self::Alignment => f.write_str("block device access misaligned"),
            Self::BadBlock => f.write_str("operation on bad block"),
            Self::InvalidConfig => f.write_str("invalid block device configuration"),
            Self::PowerLoss => f.write_str("simulated power loss"),
            Self::Io => f.write_str("disk image i/o failure"),
        }
    }
}

impl std::error::Error for BdError {}

/// Block device surface a test case runs against.
///
/// Exactly one instance exists at a time, scoped around one case
/// invocation; the harness provisions and releases it.
pub trait BlockDevice {
    /// Read `buf.len()` bytes from `block` at byte offset `off`.
    fn read(&mut self, block: u32, off: u32, buf: &mut [u8]) -> Result<(), BdError>;

    /// Program `data` into `block` at byte offset `off`.
    fn prog(&mut self, block: u32, off: u32, data: &[u8]) -> Result<(), BdError>;

    /// Erase `block`, filling it with the configured erase value.
    fn erase(&mut self, block: u32) -> Result<(), BdError>;

    /// Flush any buffered state, including a persisted disk image.
    fn sync(&mut self) -> Result<(), BdError>;
}
