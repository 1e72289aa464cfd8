//! `bm-device` - An emulated SIMT accelerator for blockmm.
//!
//! This crate provides:
//! - A `Device` with a bounded memory pool, an in-order asynchronous launch
//!   stream and a last-error slot
//! - RAII `DeviceAllocation`s that return their bytes to the pool on drop
//! - The `Kernel` trait: a per-worker body plus per-group shared scratch
//! - Grouped execution: each group's workers run on the reusable worker
//!   threads of one multiprocessor and share a barrier
//!
//! Groups of one launch run concurrently on a thread pool sized to the
//! configured number of multiprocessors and never synchronize with each other.

mod barrier;
pub mod buffer;
pub mod config;
pub mod device;
pub mod dim;
pub mod error;
mod fault;
pub mod kernel;
mod launch;
pub mod memory;
mod stream;
mod workers;

// Re-export primary types at the crate root for convenience.
pub use buffer::{DeviceAllocation, DeviceBuffer};
pub use config::DeviceConfig;
pub use device::Device;
pub use dim::{Dim2, LaunchConfig};
pub use error::{DeviceError, KernelFault, LaunchError, Result};
pub use kernel::{Kernel, ThreadCtx};
pub use memory::MemoryUsage;
