use std::fmt::Debug;

use bm_device::Device;
use bm_matrix::Matrix;

use crate::error::Result;
use crate::orchestrator::{multiply, Strategy};

/// Trait for pluggable matrix-multiplication backends.
///
/// Lets the device strategies be checked against a plain host
/// implementation through one interface.
pub trait GemmBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "host", "device-tiled").
    fn name(&self) -> &str;

    /// Matrix multiplication into a caller-provided output: `c = a @ b`.
    ///
    /// - `a`: shape [m, k]
    /// - `b`: shape [k, n]
    /// - `c`: shape [m, n], every element overwritten on success
    fn matmul(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()>;
}

/// Runs products on an emulated device with a fixed strategy.
#[derive(Debug)]
pub struct DeviceBackend<'d> {
    device: &'d Device,
    strategy: Strategy,
    name: String,
}

impl<'d> DeviceBackend<'d> {
    pub fn new(device: &'d Device, strategy: Strategy) -> Self {
        DeviceBackend {
            device,
            strategy,
            name: format!("device-{strategy}"),
        }
    }
}

impl GemmBackend for DeviceBackend<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn matmul(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
        multiply(self.device, a, b, c, self.strategy)
    }
}
