use std::sync::{Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Stack reserved for each worker thread of a synchronizing group.
const WORKER_STACK_SIZE: usize = 256 << 10;

/// The worker threads of one multiprocessor.
///
/// A group resident on the multiprocessor runs each of its workers on a
/// thread of this pool. The pool is built on first use, grown when a larger
/// group arrives, and otherwise reused by every later group and launch.
#[derive(Debug)]
pub(crate) struct WorkerSet {
    name: String,
    pool: Mutex<Option<ThreadPool>>,
}

impl WorkerSet {
    pub(crate) fn new(name: String) -> Self {
        WorkerSet {
            name,
            pool: Mutex::new(None),
        }
    }

    /// Run `op` on a pool holding at least `workers` threads.
    ///
    /// Holds the set for the duration of `op`, so at most one group is
    /// resident at a time.
    pub(crate) fn with_pool<R>(
        &self,
        workers: usize,
        op: impl FnOnce(&ThreadPool) -> R,
    ) -> Result<R, ThreadPoolBuildError> {
        let mut slot = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        let pool = match slot.take() {
            Some(pool) if pool.current_num_threads() >= workers => pool,
            _ => {
                let prefix = self.name.clone();
                log::trace!("{}: starting {workers} worker threads", self.name);
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .stack_size(WORKER_STACK_SIZE)
                    .thread_name(move |i| format!("{prefix}-w{i}"))
                    .build()?
            }
        };
        let result = op(&pool);
        *slot = Some(pool);
        Ok(result)
    }

    /// Threads currently owned by this set.
    #[cfg(test)]
    pub(crate) fn threads(&self) -> usize {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, ThreadPool::current_num_threads)
    }
}
