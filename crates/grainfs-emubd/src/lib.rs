//! Emulated block device for the grainfs test harness.
//!
//! A RAM-backed device with configurable geometry, erase-value fill,
//! per-block wear tracking against a simulated erase-cycle budget,
//! bad-block behaviors, optional disk-image persistence, and an optional
//! operation trace stream. The harness provisions one instance per test
//! permutation and releases it afterward.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use grainfs_types::{BdError, BlockDevice, DefineValue, StorageConfig};

/// Where the device writes its operation trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceTarget {
    /// Interleave trace lines with the operator stream.
    Stdout,
    /// Append trace lines to a file (the runner truncates it at startup).
    File(PathBuf),
}

/// What a block does once it exceeds its erase-cycle budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BadBlockBehavior {
    /// Programs to the block fail with an error.
    #[default]
    ProgError,
    /// Erases of the block fail with an error.
    EraseError,
    /// Reads of the block fail with an error.
    ReadError,
    /// Programs to the block are silently dropped.
    ProgNoop,
    /// Erases of the block silently leave its contents in place.
    EraseNoop,
}

impl TryFrom<DefineValue> for BadBlockBehavior {
    type Error = BdError;

    fn try_from(value: DefineValue) -> Result<Self, BdError> {
        match value {
            0 => Ok(Self::ProgError),
            1 => Ok(Self::EraseError),
            2 => Ok(Self::ReadError),
            3 => Ok(Self::ProgNoop),
            4 => Ok(Self::EraseNoop),
            _ => Err(BdError::InvalidConfig),
        }
    }
}

/// Emulation parameters beyond the storage geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmuBdConfig {
    /// Byte value an erased block reads back as; -1 leaves contents
    /// undefined (no fill is simulated).
    pub erase_value: i32,
    /// Erase-cycle budget per block; 0 means unlimited.
    pub erase_cycles: u32,
    /// Behavior of blocks past their erase-cycle budget.
    pub badblock_behavior: BadBlockBehavior,
    /// Abort with a simulated power loss after this many mutating
    /// operations; 0 disables the budget.
    pub power_cycles: u32,
    /// Persist the disk image to this path across provision/release.
    pub persist: Option<PathBuf>,
    /// Operation trace stream.
    pub trace: Option<TraceTarget>,
}

impl Default for EmuBdConfig {
    fn default() -> Self {
        Self {
            erase_value: -1,
            erase_cycles: 0,
            badblock_behavior: BadBlockBehavior::default(),
            power_cycles: 0,
            persist: None,
            trace: None,
        }
    }
}

enum TraceSink {
    Stdout,
    File(io::BufWriter<fs::File>),
}

impl TraceSink {
    fn open(target: &TraceTarget) -> Result<Self, BdError> {
        match target {
            TraceTarget::Stdout => Ok(Self::Stdout),
            TraceTarget::File(path) => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|_| BdError::Io)?;
                Ok(Self::File(io::BufWriter::new(file)))
            }
        }
    }

    // Trace output is best-effort; a full disk must not fail the test.
    fn line(&mut self, line: &str) {
        match self {
            Self::Stdout => println!("{line}"),
            Self::File(writer) => {
                let _ = writeln!(writer, "{line}");
            }
        }
    }

    fn flush(&mut self) {
        if let Self::File(writer) = self {
            let _ = writer.flush();
        }
    }
}

/// A provisioned emulated block device.
pub struct EmuBd {
    geometry: StorageConfig,
    cfg: EmuBdConfig,
    blocks: Vec<u8>,
    wear: Vec<u32>,
    power_budget: Option<u32>,
    trace: Option<TraceSink>,
}

impl EmuBd {
    /// Create a device from a storage geometry and emulation parameters.
    ///
    /// If a persistence path is configured and the file exists, the stored
    /// image seeds the device contents.
    pub fn new(geometry: StorageConfig, cfg: EmuBdConfig) -> Result<Self, BdError> {
        if geometry.read_size == 0
            || geometry.prog_size == 0
            || geometry.block_size == 0
            || geometry.block_count == 0
            || geometry.block_size % geometry.read_size != 0
            || geometry.block_size % geometry.prog_size != 0
        {
            return Err(BdError::InvalidConfig);
        }

        let size = geometry.block_size as usize * geometry.block_count as usize;
        let fill = if cfg.erase_value >= 0 {
            cfg.erase_value as u8
        } else {
            0
        };
        let mut blocks = vec![fill; size];

        if let Some(path) = &cfg.persist {
            if path.exists() {
                let image = fs::read(path).map_err(|_| BdError::Io)?;
                let n = image.len().min(size);
                blocks[..n].copy_from_slice(&image[..n]);
            }
        }

        let trace = match &cfg.trace {
            Some(target) => Some(TraceSink::open(target)?),
            None => None,
        };

        debug!(
            block_size = geometry.block_size,
            block_count = geometry.block_count,
            erase_cycles = cfg.erase_cycles,
            "emubd created"
        );

        Ok(Self {
            power_budget: (cfg.power_cycles > 0).then_some(cfg.power_cycles),
            wear: vec![0; geometry.block_count as usize],
            geometry,
            cfg,
            blocks,
            trace,
        })
    }

    /// Storage geometry this device was provisioned with.
    pub fn geometry(&self) -> &StorageConfig {
        &self.geometry
    }

    /// Erase count of `block` so far.
    pub fn wear(&self, block: u32) -> u32 {
        self.wear.get(block as usize).copied().unwrap_or(0)
    }

    fn is_bad(&self, block: u32) -> bool {
        self.cfg.erase_cycles > 0 && self.wear(block) >= self.cfg.erase_cycles
    }

    fn check_range(&self, block: u32, off: u32, len: usize, align: u32) -> Result<usize, BdError> {
        if block >= self.geometry.block_count {
            return Err(BdError::OutOfRange);
        }
        if off as usize + len > self.geometry.block_size as usize {
            return Err(BdError::OutOfRange);
        }
        if off % align != 0 || len % align as usize != 0 {
            return Err(BdError::Alignment);
        }
        Ok(block as usize * self.geometry.block_size as usize + off as usize)
    }

    fn spend_power(&mut self) -> Result<(), BdError> {
        if let Some(budget) = &mut self.power_budget {
            if *budget == 0 {
                return Err(BdError::PowerLoss);
            }
            *budget -= 1;
        }
        Ok(())
    }

    fn flush_image(&self) -> Result<(), BdError> {
        if let Some(path) = &self.cfg.persist {
            fs::write(path, &self.blocks).map_err(|_| BdError::Io)?;
        }
        Ok(())
    }

    fn trace_line(&mut self, line: &str) {
        if let Some(sink) = &mut self.trace {
            sink.line(line);
        }
    }
}

impl BlockDevice for EmuBd {
    fn read(&mut self, block: u32, off: u32, buf: &mut [u8]) -> Result<(), BdError> {
        self.trace_line(&format!("emubd_read(0x{block:x}, 0x{off:x}, {})", buf.len()));
        let start = self.check_range(block, off, buf.len(), self.geometry.read_size)?;
        if self.is_bad(block) && self.cfg.badblock_behavior == BadBlockBehavior::ReadError {
            return Err(BdError::BadBlock);
        }
        buf.copy_from_slice(&self.blocks[start..start + buf.len()]);
        Ok(())
    }

    fn prog(&mut self, block: u32, off: u32, data: &[u8]) -> Result<(), BdError> {
        self.trace_line(&format!("emubd_prog(0x{block:x}, 0x{off:x}, {})", data.len()));
        let start = self.check_range(block, off, data.len(), self.geometry.prog_size)?;
        self.spend_power()?;
        if self.is_bad(block) {
            match self.cfg.badblock_behavior {
                BadBlockBehavior::ProgError => return Err(BdError::BadBlock),
                BadBlockBehavior::ProgNoop => return Ok(()),
                _ => {}
            }
        }
        self.blocks[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, block: u32) -> Result<(), BdError> {
        self.trace_line(&format!("emubd_erase(0x{block:x})"));
        if block >= self.geometry.block_count {
            return Err(BdError::OutOfRange);
        }
        self.spend_power()?;
        if self.is_bad(block) {
            match self.cfg.badblock_behavior {
                BadBlockBehavior::EraseError => return Err(BdError::BadBlock),
                BadBlockBehavior::EraseNoop => return Ok(()),
                _ => {}
            }
        }
        self.wear[block as usize] += 1;
        if self.cfg.erase_value >= 0 {
            let start = block as usize * self.geometry.block_size as usize;
            let end = start + self.geometry.block_size as usize;
            self.blocks[start..end].fill(self.cfg.erase_value as u8);
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), BdError> {
        self.trace_line("emubd_sync()");
        self.flush_image()?;
        if let Some(sink) = &mut self.trace {
            sink.flush();
        }
        Ok(())
    }
}
