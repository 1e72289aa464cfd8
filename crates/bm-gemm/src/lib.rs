//! `bm-gemm` - Dense single-precision matrix multiplication on a SIMT device.
//!
//! Two kernels compute `C = A @ B`:
//! - `DirectKernel`: one worker per output element, every operand read from
//!   device memory
//! - `TiledKernel`: groups stage BLOCK x BLOCK tiles into shared scratch,
//!   synchronize, and reuse each staged element BLOCK times
//!
//! `multiply` stages the operands onto a `bm_device::Device`, launches the
//! chosen kernel, copies the result back and always frees what it allocated.
//! `HostBackend` is a reference implementation behind the same
//! `GemmBackend` trait.

pub mod args;
pub mod backend;
pub mod direct;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod tiled;

// Re-export primary types at the crate root for convenience.
pub use args::{DeviceMatrix, GemmArgs};
pub use backend::{DeviceBackend, GemmBackend};
pub use direct::DirectKernel;
pub use error::{GemmError, Result};
pub use host::HostBackend;
pub use orchestrator::{launch_config, matmul, multiply, Strategy};
pub use tiled::{SharedTile, SharedTiles, TiledKernel};
