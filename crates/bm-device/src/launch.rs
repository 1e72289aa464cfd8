use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::barrier::GroupBarrier;
use crate::dim::{Dim2, LaunchConfig};
use crate::error::KernelFault;
use crate::fault::FaultLog;
use crate::kernel::{Kernel, ThreadCtx};
use crate::workers::WorkerSet;

/// Run every group of the grid.
///
/// Each thread of `pool` acts as one multiprocessor: it takes the next
/// unclaimed group, runs it to completion on its own worker set, and repeats.
/// Groups are independent and finish in no particular order.
pub(crate) fn run_grid<K: Kernel>(
    kernel: &K,
    config: LaunchConfig,
    pool: &rayon::ThreadPool,
    sets: &[WorkerSet],
    faults: &FaultLog,
) {
    let next = AtomicUsize::new(0);
    let groups = config.grid.count();
    pool.broadcast(|ctx| {
        let set = &sets[ctx.index() % sets.len()];
        loop {
            let g = next.fetch_add(1, Ordering::Relaxed);
            if g >= groups {
                break;
            }
            run_group(kernel, config, config.grid.unflatten(g), set, faults);
        }
    });
}

fn run_group<K: Kernel>(
    kernel: &K,
    config: LaunchConfig,
    block_idx: Dim2,
    set: &WorkerSet,
    faults: &FaultLog,
) {
    let shared = match panic::catch_unwind(AssertUnwindSafe(|| kernel.shared())) {
        Ok(shared) => shared,
        Err(payload) => {
            faults.record(KernelFault::SharedSetupPanicked {
                block: block_idx,
                message: panic_message(payload.as_ref()),
            });
            return;
        }
    };
    let workers = config.block.count();

    if !K::SYNCHRONIZES {
        for t in 0..workers {
            let ctx = ThreadCtx::new(block_idx, config.block.unflatten(t), config, None, faults);
            run_worker(kernel, &ctx, &shared, None, faults);
        }
        return;
    }

    // Every worker needs its own thread: the barrier only opens once all of
    // them are blocked in it.
    let barrier = GroupBarrier::new(workers);
    let resident = set.with_pool(workers, |threads| {
        threads.scope(|s| {
            for t in 0..workers {
                let (barrier, shared) = (&barrier, &shared);
                s.spawn(move |_| {
                    let thread_idx = config.block.unflatten(t);
                    let ctx =
                        ThreadCtx::new(block_idx, thread_idx, config, Some(barrier), faults);
                    run_worker(kernel, &ctx, shared, Some(barrier), faults);
                });
            }
        })
    });
    if let Err(e) = resident {
        faults.record(KernelFault::WorkerPanicked {
            block: block_idx,
            thread: Dim2::default(),
            message: format!("failed to start group workers: {e}"),
        });
    }
}

fn run_worker<K: Kernel>(
    kernel: &K,
    ctx: &ThreadCtx<'_>,
    shared: &K::Shared,
    barrier: Option<&GroupBarrier>,
    faults: &FaultLog,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| kernel.execute(ctx, shared)));
    if let Err(payload) = outcome {
        // Release the rest of the group so it can run to completion.
        if let Some(barrier) = barrier {
            barrier.break_barrier();
        }
        faults.record(KernelFault::WorkerPanicked {
            block: ctx.block_idx(),
            thread: ctx.thread_idx(),
            message: panic_message(payload.as_ref()),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
