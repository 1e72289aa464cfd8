use std::sync::{Mutex, PoisonError};

use crate::error::{DeviceError, Result};

/// Snapshot of device memory accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Bytes currently held by live allocations.
    pub bytes_in_use: usize,
    /// Highest value `bytes_in_use` has reached.
    pub bytes_peak: usize,
    /// Number of live allocations.
    pub allocations: usize,
    /// Pool capacity in bytes.
    pub capacity: usize,
}

impl MemoryUsage {
    pub fn available(&self) -> usize {
        self.capacity - self.bytes_in_use
    }
}

/// Byte accounting for the device memory pool.
///
/// Every successful `reserve` must be paired with exactly one `release` of
/// the same size; `DeviceAllocation` enforces this through `Drop`.
#[derive(Debug)]
pub(crate) struct MemoryPool {
    state: Mutex<MemoryUsage>,
}

impl MemoryPool {
    pub(crate) fn new(capacity: usize) -> Self {
        MemoryPool {
            state: Mutex::new(MemoryUsage {
                capacity,
                ..MemoryUsage::default()
            }),
        }
    }

    pub(crate) fn reserve(&self, bytes: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let available = state.available();
        if bytes > available {
            return Err(DeviceError::AllocationFailure {
                requested: bytes,
                available,
            });
        }
        state.bytes_in_use += bytes;
        state.bytes_peak = state.bytes_peak.max(state.bytes_in_use);
        state.allocations += 1;
        Ok(())
    }

    pub(crate) fn release(&self, bytes: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(state.allocations > 0 && state.bytes_in_use >= bytes);
        state.bytes_in_use = state.bytes_in_use.saturating_sub(bytes);
        state.allocations = state.allocations.saturating_sub(1);
    }

    pub(crate) fn usage(&self) -> MemoryUsage {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
