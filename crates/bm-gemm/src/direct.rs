use bm_device::{Kernel, LaunchConfig, LaunchError, ThreadCtx};

use crate::args::GemmArgs;

/// One worker per output element, no data reuse.
///
/// Worker `(row, col)` walks the whole contraction dimension, reading every
/// operand straight from device memory: `width(A)` multiply-adds per element
/// with two global reads each. Workers never synchronize.
#[derive(Debug, Clone)]
pub struct DirectKernel {
    args: GemmArgs,
}

impl DirectKernel {
    pub fn new(args: GemmArgs) -> Self {
        DirectKernel { args }
    }
}

impl Kernel for DirectKernel {
    type Shared = ();
    const SYNCHRONIZES: bool = false;

    fn name(&self) -> &str {
        "gemm_direct"
    }

    fn validate(&self, config: &LaunchConfig) -> Result<(), LaunchError> {
        self.args.validate(self.name(), config)
    }

    fn shared(&self) {}

    fn execute(&self, ctx: &ThreadCtx<'_>, _shared: &()) {
        let a = self.args.a.view();
        let b = self.args.b.view();
        let c = self.args.c.view();
        let row = ctx.global_row();
        let col = ctx.global_col();

        let mut value = 0.0f32;
        for e in 0..a.width() {
            value += a.get(row, e) * b.get(e, col);
        }
        c.set(row, col, value);
    }
}
