//! Backend provisioning and the execution traversal.
//!
//! For each permutation admitted by the step window and surviving the
//! dynamic filter, the executor stages the resolver, assembles a
//! [`RunConfig`] from the resolved predefines, provisions an isolated
//! backend instance, invokes the case body, and releases the instance.
//! Exactly one instance exists at a time. Provisioning or release failure
//! is fatal; the harness cannot continue meaningfully without a working
//! backend. A dynamic-filter rejection is reported on the operator stream
//! and scheduling continues.

use std::path::PathBuf;

use tracing::debug;

use grainfs_emubd::{BadBlockBehavior, EmuBd, EmuBdConfig, TraceTarget};
use grainfs_error::{HarnessError, Result};
use grainfs_types::{BdError, BlockDevice, DefineValue, Predefine, StorageConfig};

use crate::catalog::Catalog;
use crate::resolver::{Override, Resolver};
use crate::scheduler::StepWindow;
use crate::selector::Selection;

/// Configuration record assembled from one permutation's resolved
/// predefines, handed across the provisioning interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Storage geometry for the instance.
    pub storage: StorageConfig,
    /// Byte value erased blocks read back as; -1 disables fill emulation.
    pub erase_value: i32,
    /// Simulated erase-cycle budget per block; 0 means unlimited.
    pub erase_cycles: u32,
    /// Raw bad-block behavior value; the backend interprets it.
    pub badblock_behavior: DefineValue,
    /// Simulated power budget; 0 disables.
    pub power_cycles: u32,
    /// Persist the disk image to this path.
    pub persist: Option<PathBuf>,
    /// Redirect the device operation trace.
    pub trace: Option<TraceTarget>,
}

/// Provisions and releases isolated backend instances. Failures cross this
/// interface as integer status codes.
pub trait Backend {
    /// Provision an instance for one case invocation.
    fn provision(&mut self, cfg: &RunConfig) -> std::result::Result<Box<dyn BlockDevice>, i32>;

    /// Release an instance after the case body returns.
    fn release(&mut self, instance: Box<dyn BlockDevice>) -> std::result::Result<(), i32>;
}

/// The shipped backend: provisions `grainfs-emubd` devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmuBackend;

impl Backend for EmuBackend {
    fn provision(&mut self, cfg: &RunConfig) -> std::result::Result<Box<dyn BlockDevice>, i32> {
        let badblock_behavior =
            BadBlockBehavior::try_from(cfg.badblock_behavior).map_err(BdError::code)?;
        let emu = EmuBdConfig {
            erase_value: cfg.erase_value,
            erase_cycles: cfg.erase_cycles,
            badblock_behavior,
            power_cycles: cfg.power_cycles,
            persist: cfg.persist.clone(),
            trace: cfg.trace.clone(),
        };
        EmuBd::new(cfg.storage, emu)
            .map(|bd| Box::new(bd) as Box<dyn BlockDevice>)
            .map_err(BdError::code)
    }

    fn release(&mut self, mut instance: Box<dyn BlockDevice>) -> std::result::Result<(), i32> {
        instance.sync().map_err(BdError::code)
    }
}

/// Everything a case body may touch during one invocation.
pub struct RunContext<'a> {
    /// The configuration the backend was provisioned with.
    pub cfg: &'a RunConfig,
    /// The provisioned device.
    pub bd: &'a mut dyn BlockDevice,
    /// Resolver staged for this permutation, for suite-scoped defines.
    pub resolver: &'a Resolver<'a>,
}

/// Persistence/trace options threaded into every permutation's config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Persist disk images to this path.
    pub persist: Option<PathBuf>,
    /// Redirect device traces to this target.
    pub trace: Option<TraceTarget>,
}

/// Tallies of one execution traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Case invocations that ran to completion.
    pub ran: u64,
    /// Permutations rejected by their case's dynamic filter after being
    /// admitted by the window (they still consumed a step slot).
    pub filtered: u64,
}

/// Assemble the configuration record from the staged resolver.
pub fn assemble_config(resolver: &Resolver<'_>, opts: &RunOptions) -> Result<RunConfig> {
    Ok(RunConfig {
        storage: StorageConfig {
            read_size: resolver.predefine(Predefine::ReadSize)? as u32,
            prog_size: resolver.predefine(Predefine::ProgSize)? as u32,
            block_size: resolver.predefine(Predefine::BlockSize)? as u32,
            block_count: resolver.predefine(Predefine::BlockCount)? as u32,
            block_cycles: resolver.predefine(Predefine::BlockCycles)? as i32,
            cache_size: resolver.predefine(Predefine::CacheSize)? as u32,
            lookahead_size: resolver.predefine(Predefine::LookaheadSize)? as u32,
        },
        erase_value: resolver.predefine(Predefine::EraseValue)? as i32,
        erase_cycles: resolver.predefine(Predefine::EraseCycles)? as u32,
        badblock_behavior: resolver.predefine(Predefine::BadblockBehavior)?,
        power_cycles: 0,
        persist: opts.persist.clone(),
        trace: opts.trace.clone(),
    })
}

/// Execute every selected permutation inside the step window.
pub fn run(
    catalog: &Catalog,
    overrides: &[Override],
    selection: &Selection,
    window: StepWindow,
    backend: &mut dyn Backend,
    opts: &RunOptions,
) -> Result<RunTotals> {
    let mut resolver = Resolver::new();
    resolver.stage_overrides(overrides);

    let mut totals = RunTotals::default();
    let mut step: u64 = 0;

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
                // The step slot is consumed whether or not the dynamic
                // filter later rejects this permutation.
                if !window.admits(step) {
                    step += 1;
                    continue;
                }
                step += 1;

                let (case_perm, geom_perm) = catalog.split_perm(perm);
                resolver.stage_permutation(case, case_perm);
                resolver.stage_geometry(&catalog.geometries[geom_perm]);

                if let Some(filter) = case.filter {
                    if !filter(&resolver, case_perm) {
                        println!("skipped {}#{}", case.id, perm);
                        totals.filtered += 1;
                        continue;
                    }
                }

                let cfg = assemble_config(&resolver, opts)?;
                debug!(
                    case = case.id,
                    perm,
                    geometry = catalog.geometries[geom_perm].name,
                    "provisioning backend"
                );
                let mut bd = backend
                    .provision(&cfg)
                    .map_err(HarnessError::BackendCreate)?;

                println!("running {}#{}", case.id, perm);
                let mut ctx = RunContext {
                    cfg: &cfg,
                    bd: bd.as_mut(),
                    resolver: &resolver,
                };
                (case.run)(&mut ctx, case_perm);
                println!("finished {}#{}", case.id, perm);

                backend
                    .release(bd)
                    .map_err(HarnessError::BackendDestroy)?;
                totals.ran += 1;
            }
        }
    }

    Ok(totals)
}
