use std::fmt;
use std::sync::Arc;

use bm_matrix::{F32Cell, ReadElements, WriteElements};

use crate::device::Device;
use crate::error::{DeviceError, KernelFault, Result};
use crate::fault::FaultLog;

/// Device-resident f32 storage as seen by kernels.
///
/// Cheap to clone: clones share the same cells. Out-of-range accesses do not
/// panic; reads yield `0.0`, writes are dropped, and an illegal-address fault
/// is recorded against the running launch.
#[derive(Clone)]
pub struct DeviceBuffer {
    cells: Arc<[F32Cell]>,
    faults: Arc<FaultLog>,
}

impl DeviceBuffer {
    pub(crate) fn zeroed(len: usize, faults: Arc<FaultLog>) -> Self {
        DeviceBuffer {
            cells: (0..len).map(|_| F32Cell::default()).collect(),
            faults,
        }
    }

    fn illegal(&self, index: usize) {
        self.faults.record(KernelFault::IllegalAddress {
            index,
            len: self.cells.len(),
        });
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.cells.len())
            .finish()
    }
}

impl ReadElements for DeviceBuffer {
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn read(&self, index: usize) -> f32 {
        match self.cells.get(index) {
            Some(cell) => cell.load(),
            None => {
                self.illegal(index);
                0.0
            }
        }
    }
}

impl WriteElements for DeviceBuffer {
    #[inline]
    fn write(&self, index: usize, value: f32) {
        match self.cells.get(index) {
            Some(cell) => cell.store(value),
            None => self.illegal(index),
        }
    }
}

/// A live allocation in a device's memory pool.
///
/// The pool bytes are returned when the allocation is dropped (or passed to
/// [`DeviceAllocation::free`]), on every exit path. Dropping first waits for
/// in-flight launches so no kernel is still using the memory.
pub struct DeviceAllocation<'d> {
    device: &'d Device,
    buffer: DeviceBuffer,
    bytes: usize,
    id: u64,
}

impl<'d> DeviceAllocation<'d> {
    pub(crate) fn new(device: &'d Device, buffer: DeviceBuffer, bytes: usize, id: u64) -> Self {
        DeviceAllocation {
            device,
            buffer,
            bytes,
            id,
        }
    }

    /// Number of f32 elements.
    pub fn len(&self) -> usize {
        self.buffer.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes charged to the pool.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Handle to the storage, for passing to kernels.
    pub fn buffer(&self) -> &DeviceBuffer {
        &self.buffer
    }

    /// Copy `host` into the allocation. Waits for queued work first.
    ///
    /// # Errors
    /// `InvalidCopy` if lengths differ, or the execution failure of an
    /// earlier launch surfaced by the implicit synchronization.
    pub fn copy_from_host(&self, host: &[f32]) -> Result<()> {
        self.check_len(host.len())?;
        self.device.synchronize()?;
        for (cell, &value) in self.buffer.cells.iter().zip(host) {
            cell.store(value);
        }
        log::debug!(
            "{}: copied {} bytes host -> device #{}",
            self.device.name(),
            self.bytes,
            self.id
        );
        Ok(())
    }

    /// Copy the allocation into `host`. Waits for queued work first, so a
    /// kernel writing this buffer has finished before it is read.
    pub fn copy_to_host(&self, host: &mut [f32]) -> Result<()> {
        self.check_len(host.len())?;
        self.device.synchronize()?;
        for (slot, cell) in host.iter_mut().zip(self.buffer.cells.iter()) {
            *slot = cell.load();
        }
        log::debug!(
            "{}: copied {} bytes device #{} -> host",
            self.device.name(),
            self.bytes,
            self.id
        );
        Ok(())
    }

    /// Release the allocation now. Equivalent to dropping it.
    pub fn free(self) {
        drop(self);
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.len() {
            return Err(self.device.record(DeviceError::InvalidCopy {
                expected: self.len(),
                got,
            }));
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceAllocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAllocation")
            .field("id", &self.id)
            .field("len", &self.len())
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl Drop for DeviceAllocation<'_> {
    fn drop(&mut self) {
        // Faults stay recorded on the stream for the next synchronizing call.
        self.device.wait_idle();
        self.device.release(self.bytes, self.id);
    }
}
