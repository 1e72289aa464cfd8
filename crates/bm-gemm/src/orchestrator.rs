use std::fmt;

use bm_device::{Device, Dim2, LaunchConfig};
use bm_matrix::{Matrix, BLOCK_SIZE};

use crate::args::{DeviceMatrix, GemmArgs};
use crate::direct::DirectKernel;
use crate::error::Result;
use crate::tiled::TiledKernel;

/// Which kernel computes the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One worker per output element, no reuse.
    Direct,
    /// Shared-memory tiles of `BLOCK_SIZE x BLOCK_SIZE`.
    Tiled,
}

impl Strategy {
    /// Map a "use the tiled kernel" flag to a strategy.
    pub fn from_tiled_flag(use_tiled: bool) -> Self {
        if use_tiled {
            Strategy::Tiled
        } else {
            Strategy::Direct
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Tiled => "tiled",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid of `(B.width / BLOCK_SIZE, A.height / BLOCK_SIZE)` groups of
/// `BLOCK_SIZE x BLOCK_SIZE` workers. Covers `C` exactly when its dimensions
/// are multiples of `BLOCK_SIZE`.
pub fn launch_config(a: &Matrix, b: &Matrix) -> LaunchConfig {
    let (columns, _) = b.layout().blocks(BLOCK_SIZE);
    let (_, rows) = a.layout().blocks(BLOCK_SIZE);
    LaunchConfig::new(Dim2::new(columns, rows), Dim2::new(BLOCK_SIZE, BLOCK_SIZE))
}

/// Compute `c = a @ b` on `device` with the chosen kernel.
///
/// Stages `a` and `b` into fresh device allocations, launches one kernel over
/// a grid covering `c`, and copies the result back into `c`. The three
/// allocations are released on every path, including a rejected launch or a
/// fault during execution; the device's memory usage is unchanged on return.
///
/// `a` and `b` are only read. On error `c` is left untouched.
///
/// # Errors
/// The device's own error (allocation, launch or execution failure),
/// wrapped in `GemmError::Device`. The same error is left in the device's
/// last-error slot.
pub fn multiply(
    device: &Device,
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    strategy: Strategy,
) -> Result<()> {
    let d_a = device.allocate(a.len())?;
    let d_b = device.allocate(b.len())?;
    let d_c = device.allocate(c.len())?;

    d_a.copy_from_host(a.data())?;
    d_b.copy_from_host(b.data())?;

    let args = GemmArgs::new(
        DeviceMatrix::new(a.layout(), d_a.buffer().clone()),
        DeviceMatrix::new(b.layout(), d_b.buffer().clone()),
        DeviceMatrix::new(c.layout(), d_c.buffer().clone()),
    );
    let config = launch_config(a, b);
    log::debug!(
        "multiply {} @ {} ({strategy}) on grid {}",
        a.layout(),
        b.layout(),
        config.grid
    );

    match strategy {
        Strategy::Direct => device.launch(DirectKernel::new(args), config)?,
        Strategy::Tiled => device.launch(TiledKernel::new(args), config)?,
    }

    d_c.copy_to_host(c.data_mut())?;
    Ok(())
}

/// Allocate `c` and compute `a @ b` into it.
pub fn matmul(device: &Device, a: &Matrix, b: &Matrix, strategy: Strategy) -> Result<Matrix> {
    let mut c = Matrix::zeros(a.height(), b.width());
    multiply(device, a, b, &mut c, strategy)?;
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_device::DeviceConfig;

    fn device() -> Device {
        Device::new(DeviceConfig::default().with_name("orchestrator-test")).unwrap()
    }

    #[test]
    fn test_strategy_flag() {
        assert_eq!(Strategy::from_tiled_flag(true), Strategy::Tiled);
        assert_eq!(Strategy::from_tiled_flag(false), Strategy::Direct);
        assert_eq!(Strategy::Tiled.to_string(), "tiled");
    }

    #[test]
    fn test_launch_config_tiles_output() {
        let a = Matrix::zeros(48, 32);
        let b = Matrix::zeros(32, 64);
        let cfg = launch_config(&a, &b);
        assert_eq!(cfg.grid, Dim2::new(4, 3));
        assert_eq!(cfg.block, Dim2::new(BLOCK_SIZE, BLOCK_SIZE));
        assert_eq!(cfg.extent(), Dim2::new(64, 48));
    }

    #[test]
    fn test_launch_config_drops_partial_blocks() {
        let a = Matrix::zeros(40, 16);
        let b = Matrix::zeros(16, 24);
        let cfg = launch_config(&a, &b);
        assert_eq!(cfg.grid, Dim2::new(1, 2));
        // the grid no longer covers C, which the kernels reject
        assert_ne!(cfg.extent(), Dim2::new(24, 40));
    }

    #[test]
    fn test_matmul_small_known_values() {
        let dev = device();
        // A[r][c] = r + c, B = 2 * I  =>  C = 2 * A
        let a = Matrix::from_fn(16, 16, |r, c| (r + c) as f32);
        let b = Matrix::from_fn(16, 16, |r, c| if r == c { 2.0 } else { 0.0 });
        for strategy in [Strategy::Direct, Strategy::Tiled] {
            let c = matmul(&dev, &a, &b, strategy).unwrap();
            assert_eq!(c, Matrix::from_fn(16, 16, |r, c| 2.0 * (r + c) as f32));
        }
    }

    #[test]
    fn test_non_square_product() {
        let dev = device();
        let a = Matrix::ones(32, 48);
        let b = Matrix::ones(48, 16);
        for strategy in [Strategy::Direct, Strategy::Tiled] {
            let c = matmul(&dev, &a, &b, strategy).unwrap();
            assert_eq!(c.height(), 32);
            assert_eq!(c.width(), 16);
            assert!(c.data().iter().all(|&v| v == 48.0));
        }
    }

    #[test]
    fn test_failed_launch_leaves_c_untouched() {
        let dev = device();
        let a = Matrix::ones(24, 24);
        let b = Matrix::ones(24, 24);
        let mut c = Matrix::filled(24, 24, 7.0);
        assert!(multiply(&dev, &a, &b, &mut c, Strategy::Tiled).is_err());
        assert!(c.data().iter().all(|&v| v == 7.0));
    }
}
