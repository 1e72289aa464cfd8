//! Shared-memory tiled kernel.
//!
//! Each group of `BLOCK_SIZE x BLOCK_SIZE` workers computes one output tile
//! `Csub`. For every step `m` along the contraction dimension the group
//! stages `Tile(A, block_row, m)` and `Tile(B, m, block_col)` into two
//! scratch tiles, one element per worker, then every worker reuses the
//! staged row and column `BLOCK_SIZE` times. Global reads drop by a factor
//! of `BLOCK_SIZE` compared to the direct kernel.
//!
//! Two barriers per step: after staging (no worker reads a scratch cell
//! before its writer stored it) and after accumulating (no worker restages
//! while another still reads the previous step's tiles).

use bm_device::{Dim2, Kernel, LaunchConfig, LaunchError, ThreadCtx};
use bm_matrix::{tile, F32Cell, Layout, MatrixView, BLOCK_SIZE};

use crate::args::GemmArgs;

/// `BLOCK_SIZE x BLOCK_SIZE` cells of group-shared scratch.
pub type SharedTile = [F32Cell; BLOCK_SIZE * BLOCK_SIZE];

/// The two scratch tiles of one group.
#[derive(Debug)]
pub struct SharedTiles {
    a: SharedTile,
    b: SharedTile,
}

impl SharedTiles {
    fn new() -> Self {
        SharedTiles {
            a: std::array::from_fn(|_| F32Cell::default()),
            b: std::array::from_fn(|_| F32Cell::default()),
        }
    }

    fn views(&self) -> (MatrixView<'_, [F32Cell]>, MatrixView<'_, [F32Cell]>) {
        let layout = Layout::new(BLOCK_SIZE, BLOCK_SIZE);
        (
            MatrixView::new(layout, &self.a[..]),
            MatrixView::new(layout, &self.b[..]),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TiledKernel {
    args: GemmArgs,
}

impl TiledKernel {
    pub fn new(args: GemmArgs) -> Self {
        TiledKernel { args }
    }
}

impl Kernel for TiledKernel {
    type Shared = SharedTiles;
    const SYNCHRONIZES: bool = true;

    fn name(&self) -> &str {
        "gemm_tiled"
    }

    fn validate(&self, config: &LaunchConfig) -> Result<(), LaunchError> {
        if config.block != Dim2::new(BLOCK_SIZE, BLOCK_SIZE) {
            return Err(LaunchError::InvalidArguments {
                kernel: self.name().to_string(),
                reason: format!(
                    "group shape must be {BLOCK_SIZE}x{BLOCK_SIZE}, got {}",
                    config.block
                ),
            });
        }
        for (operand, layout) in [("A", self.args.a.layout()), ("B", self.args.b.layout())] {
            if !layout.is_block_aligned(BLOCK_SIZE) {
                return Err(LaunchError::InvalidArguments {
                    kernel: self.name().to_string(),
                    reason: format!(
                        "{operand} {layout} is not made of whole {BLOCK_SIZE}x{BLOCK_SIZE} tiles"
                    ),
                });
            }
        }
        self.args.validate(self.name(), config)
    }

    fn shared(&self) -> SharedTiles {
        SharedTiles::new()
    }

    fn execute(&self, ctx: &ThreadCtx<'_>, shared: &SharedTiles) {
        let a = self.args.a.view();
        let b = self.args.b.view();
        let c = self.args.c.view();

        let block_row = ctx.block_idx().y;
        let block_col = ctx.block_idx().x;
        let row = ctx.thread_idx().y;
        let col = ctx.thread_idx().x;

        let (scratch_a, scratch_b) = shared.views();
        let mut acc = 0.0f32;

        for m in 0..a.width() / BLOCK_SIZE {
            let a_sub = tile(&a, block_row, m);
            let b_sub = tile(&b, m, block_col);

            scratch_a.set(row, col, a_sub.get(row, col));
            scratch_b.set(row, col, b_sub.get(row, col));
            ctx.sync_group();

            for e in 0..BLOCK_SIZE {
                acc += scratch_a.get(row, e) * scratch_b.get(e, col);
            }
            ctx.sync_group();
        }

        tile(&c, block_row, block_col).set(row, col, acc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_fits_default_shared_memory() {
        let bytes = std::mem::size_of::<SharedTiles>();
        assert_eq!(bytes, 2 * BLOCK_SIZE * BLOCK_SIZE * 4);
        assert!(bytes <= bm_device::DeviceConfig::default().shared_memory_per_group);
    }

    #[test]
    fn test_rejects_operands_that_are_not_whole_tiles() {
        use crate::args::DeviceMatrix;
        use bm_device::{Device, DeviceConfig};

        let dev = Device::new(DeviceConfig::default()).unwrap();
        let a = dev.allocate(16 * 24).unwrap();
        let b = dev.allocate(24 * 16).unwrap();
        let c = dev.allocate(16 * 16).unwrap();
        let kernel = TiledKernel::new(GemmArgs::new(
            DeviceMatrix::new(Layout::new(16, 24), a.buffer().clone()),
            DeviceMatrix::new(Layout::new(24, 16), b.buffer().clone()),
            DeviceMatrix::new(Layout::new(16, 16), c.buffer().clone()),
        ));
        let config = LaunchConfig::new(Dim2::new(1, 1), Dim2::new(BLOCK_SIZE, BLOCK_SIZE));
        match kernel.validate(&config) {
            Err(LaunchError::InvalidArguments { kernel, reason }) => {
                assert_eq!(kernel, "gemm_tiled");
                assert!(reason.starts_with("A [16x24]"), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_scratch_views_are_disjoint() {
        let tiles = SharedTiles::new();
        let (sa, sb) = tiles.views();
        sa.set(3, 4, 1.5);
        sb.set(3, 4, -2.0);
        assert_eq!(sa.get(3, 4), 1.5);
        assert_eq!(sb.get(3, 4), -2.0);
        assert_eq!(sa.stride(), BLOCK_SIZE);
    }
}
