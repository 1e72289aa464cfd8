use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::buffer::{DeviceAllocation, DeviceBuffer};
use crate::config::DeviceConfig;
use crate::dim::LaunchConfig;
use crate::error::{DeviceError, LaunchError, Result};
use crate::fault::FaultLog;
use crate::kernel::Kernel;
use crate::launch::run_grid;
use crate::memory::{MemoryPool, MemoryUsage};
use crate::stream::Stream;
use crate::workers::WorkerSet;

/// An emulated SIMT accelerator.
///
/// Owns a memory pool, one in-order stream of asynchronous launches, and a
/// thread pool sized to `multiprocessors` on which the groups of a launch
/// run concurrently. Each multiprocessor keeps a reusable set of worker
/// threads for the groups it runs. Every failing operation both returns its
/// error and records it in the last-error slot.
///
/// A device may be shared between host threads. Synchronizing operations
/// wait for every launch submitted before they were called, and an
/// execution failure is sticky: every later synchronization reports it
/// until [`Device::reset`].
pub struct Device {
    config: DeviceConfig,
    memory: MemoryPool,
    faults: Arc<FaultLog>,
    stream: Stream,
    pool: Arc<rayon::ThreadPool>,
    worker_sets: Arc<[WorkerSet]>,
    last_error: Mutex<Option<DeviceError>>,
    next_id: AtomicU64,
}

impl Device {
    /// Bring up a device with the given configuration.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        if config.multiprocessors == 0 {
            return Err(DeviceError::Initialization(
                "multiprocessors must be > 0".to_string(),
            ));
        }
        let prefix = config.name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.multiprocessors)
            .thread_name(move |i| format!("{prefix}-sm{i}"))
            .build()
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;
        let worker_sets: Arc<[WorkerSet]> = (0..config.multiprocessors)
            .map(|i| WorkerSet::new(format!("{}-sm{i}", config.name)))
            .collect();
        let stream =
            Stream::new(&config.name).map_err(|e| DeviceError::Initialization(e.to_string()))?;

        log::debug!(
            "{}: {} bytes of memory, {} multiprocessors, {} workers/group, {} bytes shared/group",
            config.name,
            config.memory_capacity,
            config.multiprocessors,
            config.max_threads_per_group,
            config.shared_memory_per_group
        );

        Ok(Device {
            memory: MemoryPool::new(config.memory_capacity),
            faults: Arc::new(FaultLog::default()),
            stream,
            pool: Arc::new(pool),
            worker_sets,
            last_error: Mutex::new(None),
            next_id: AtomicU64::new(0),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Allocate `len` f32 elements (zero-initialized) from the pool.
    ///
    /// # Errors
    /// `AllocationFailure` when the pool cannot hold `len * 4` more bytes.
    pub fn allocate(&self, len: usize) -> Result<DeviceAllocation<'_>> {
        let bytes = len.saturating_mul(mem::size_of::<f32>());
        self.memory.reserve(bytes).map_err(|e| self.record(e))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("{}: allocated #{id} ({bytes} bytes)", self.name());
        let buffer = DeviceBuffer::zeroed(len, Arc::clone(&self.faults));
        Ok(DeviceAllocation::new(self, buffer, bytes, id))
    }

    /// Queue `kernel` for execution on a `config.grid` of `config.block`
    /// groups and return without waiting for it.
    ///
    /// # Errors
    /// `LaunchFailure` if the configuration or the kernel's arguments are
    /// invalid; nothing is queued in that case. Faults raised while the
    /// kernel runs are reported by the next synchronizing call.
    pub fn launch<K: Kernel>(&self, kernel: K, config: LaunchConfig) -> Result<()> {
        self.check_launch(&kernel, &config)
            .map_err(|e| self.record(e.into()))?;

        log::debug!(
            "{}: launching '{}' grid {} block {}",
            self.name(),
            kernel.name(),
            config.grid,
            config.block
        );

        let pool = Arc::clone(&self.pool);
        let worker_sets = Arc::clone(&self.worker_sets);
        let faults = Arc::clone(&self.faults);
        let device_name = self.config.name.clone();
        let task = Box::new(move || {
            // Launches run one at a time, so whatever is recorded from here
            // on belongs to this one.
            if let Some(stale) = faults.take() {
                log::warn!("{device_name}: dropping fault raised outside a launch: {stale}");
            }
            run_grid(&kernel, config, &pool, &worker_sets, &faults);
            log::debug!("{device_name}: '{}' finished", kernel.name());
            faults.take().map_or(Ok(()), Err)
        });
        let id = self
            .stream
            .submit(task)
            .map_err(|fault| self.record(fault.into()))?;
        log::trace!("{}: queued launch {id}", self.name());
        Ok(())
    }

    fn check_launch<K: Kernel>(
        &self,
        kernel: &K,
        config: &LaunchConfig,
    ) -> std::result::Result<(), LaunchError> {
        if config.grid.is_empty() {
            return Err(LaunchError::EmptyGrid { grid: config.grid });
        }
        if config.block.is_empty() {
            return Err(LaunchError::EmptyBlock {
                block: config.block,
            });
        }
        if config.block.count() > self.config.max_threads_per_group {
            return Err(LaunchError::TooManyThreads {
                requested: config.block.count(),
                limit: self.config.max_threads_per_group,
            });
        }
        let shared = mem::size_of::<K::Shared>();
        if shared > self.config.shared_memory_per_group {
            return Err(LaunchError::SharedMemoryExceeded {
                requested: shared,
                limit: self.config.shared_memory_per_group,
            });
        }
        kernel.validate(config)
    }

    /// Block until every launch queued before this call has completed.
    ///
    /// # Errors
    /// `ExecutionFailure` carrying the earliest fault not yet cleared by
    /// [`Device::reset`].
    pub fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|fault| self.record(fault.into()))
    }

    /// Take the most recent error, clearing the slot.
    pub fn last_error(&self) -> Option<DeviceError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Read the most recent error without clearing it.
    pub fn peek_last_error(&self) -> Option<DeviceError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait for outstanding work, then clear recorded execution failures and
    /// the last-error slot.
    pub fn reset(&self) {
        self.stream.wait();
        self.stream.clear_failures();
        self.last_error();
        log::debug!("{}: reset", self.name());
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory.usage()
    }

    /// Number of launches queued and not yet synchronized.
    pub fn queued_launches(&self) -> usize {
        self.stream.queued()
    }

    pub(crate) fn record(&self, err: DeviceError) -> DeviceError {
        log::warn!("{}: {err}", self.name());
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err.clone());
        err
    }

    /// Wait for queued launches without reporting their failures.
    pub(crate) fn wait_idle(&self) {
        self.stream.wait();
    }

    pub(crate) fn release(&self, bytes: usize, id: u64) {
        self.memory.release(bytes);
        log::debug!("{}: freed #{id} ({bytes} bytes)", self.name());
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("memory", &self.memory_usage())
            .finish_non_exhaustive()
    }
}
