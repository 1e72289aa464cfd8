use crate::barrier::GroupBarrier;
use crate::dim::{Dim2, LaunchConfig};
use crate::error::{KernelFault, LaunchError};
use crate::fault::FaultLog;

/// A program executed by every worker of a launch grid.
///
/// Kernels own their arguments (device buffer handles, dimensions) and are
/// moved onto the device stream when launched, hence `'static`.
pub trait Kernel: Send + Sync + 'static {
    /// Scratch state shared by the workers of one group.
    ///
    /// Created once per group by [`Kernel::shared`], lives on the executing
    /// group's stack, and is dropped when the group finishes. Its size is
    /// charged against the device's per-group shared memory limit.
    type Shared: Sync;

    /// Whether workers call [`ThreadCtx::sync_group`].
    ///
    /// Barrier-free kernels may have their workers run one after another.
    const SYNCHRONIZES: bool;

    /// Returns the name of this kernel, used in logs and errors.
    fn name(&self) -> &str;

    /// Check the kernel's arguments against a launch configuration.
    fn validate(&self, _config: &LaunchConfig) -> Result<(), LaunchError> {
        Ok(())
    }

    /// Fresh scratch state for one group.
    fn shared(&self) -> Self::Shared;

    /// Body run by one worker.
    fn execute(&self, ctx: &ThreadCtx<'_>, shared: &Self::Shared);
}

/// Execution indices of one worker, plus its group barrier.
pub struct ThreadCtx<'g> {
    block_idx: Dim2,
    thread_idx: Dim2,
    config: LaunchConfig,
    barrier: Option<&'g GroupBarrier>,
    faults: &'g FaultLog,
}

impl<'g> ThreadCtx<'g> {
    pub(crate) fn new(
        block_idx: Dim2,
        thread_idx: Dim2,
        config: LaunchConfig,
        barrier: Option<&'g GroupBarrier>,
        faults: &'g FaultLog,
    ) -> Self {
        ThreadCtx {
            block_idx,
            thread_idx,
            config,
            barrier,
            faults,
        }
    }

    /// Position of this worker's group in the grid.
    pub fn block_idx(&self) -> Dim2 {
        self.block_idx
    }

    /// Position of this worker inside its group.
    pub fn thread_idx(&self) -> Dim2 {
        self.thread_idx
    }

    pub fn block_dim(&self) -> Dim2 {
        self.config.block
    }

    pub fn grid_dim(&self) -> Dim2 {
        self.config.grid
    }

    /// Global row: `block_idx.y * block_dim.y + thread_idx.y`.
    pub fn global_row(&self) -> usize {
        self.block_idx.y * self.config.block.y + self.thread_idx.y
    }

    /// Global column: `block_idx.x * block_dim.x + thread_idx.x`.
    pub fn global_col(&self) -> usize {
        self.block_idx.x * self.config.block.x + self.thread_idx.x
    }

    /// Wait until every worker of this group reaches this point.
    ///
    /// Writes to group-shared state made before the call are visible to all
    /// workers after it. Calling this from a kernel that declared
    /// `SYNCHRONIZES = false` records a fault instead of waiting.
    pub fn sync_group(&self) {
        match self.barrier {
            Some(barrier) => {
                barrier.wait();
            }
            None => self.faults.record(KernelFault::UndeclaredBarrier {
                block: self.block_idx,
                thread: self.thread_idx,
            }),
        }
    }
}
