use bm_device::{DeviceBuffer, LaunchConfig, LaunchError};
use bm_matrix::{Layout, MatrixView, ReadElements};

/// A device buffer handle paired with the layout it holds.
#[derive(Debug, Clone)]
pub struct DeviceMatrix {
    layout: Layout,
    buffer: DeviceBuffer,
}

impl DeviceMatrix {
    pub fn new(layout: Layout, buffer: DeviceBuffer) -> Self {
        DeviceMatrix { layout, buffer }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn view(&self) -> MatrixView<'_, DeviceBuffer> {
        MatrixView::new(self.layout, &self.buffer)
    }
}

/// Operands of `c = a @ b`, shared by both kernels.
#[derive(Debug, Clone)]
pub struct GemmArgs {
    pub a: DeviceMatrix,
    pub b: DeviceMatrix,
    pub c: DeviceMatrix,
}

impl GemmArgs {
    pub fn new(a: DeviceMatrix, b: DeviceMatrix, c: DeviceMatrix) -> Self {
        GemmArgs { a, b, c }
    }

    /// Operands must agree, each buffer must hold its whole layout, and the
    /// launch must put exactly one worker on each element of `c`.
    pub(crate) fn validate(&self, kernel: &str, config: &LaunchConfig) -> Result<(), LaunchError> {
        let reject = |reason: String| LaunchError::InvalidArguments {
            kernel: kernel.to_string(),
            reason,
        };
        let (a, b, c) = (self.a.layout, self.b.layout, self.c.layout);
        Layout::check_product(&a, &b, &c).map_err(|e| reject(e.to_string()))?;

        for (name, operand) in [("A", &self.a), ("B", &self.b), ("C", &self.c)] {
            let (span, len) = (operand.layout.span(), operand.buffer.len());
            if span > len {
                return Err(reject(format!(
                    "{name} {} spans {span} elements but its buffer holds {len}",
                    operand.layout
                )));
            }
        }

        let extent = config.extent();
        if extent.x != c.width() || extent.y != c.height() {
            return Err(reject(format!(
                "launch covers {}x{} workers but output is {c}",
                extent.y, extent.x
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_device::{Device, DeviceConfig, Dim2};

    #[test]
    fn test_buffer_must_hold_layout() {
        let dev = Device::new(DeviceConfig::default()).unwrap();
        let full = dev.allocate(16 * 16).unwrap();
        let short = dev.allocate(16 * 16 - 1).unwrap();
        let args = GemmArgs::new(
            DeviceMatrix::new(Layout::new(16, 16), full.buffer().clone()),
            DeviceMatrix::new(Layout::new(16, 16), short.buffer().clone()),
            DeviceMatrix::new(Layout::new(16, 16), full.buffer().clone()),
        );
        let config = LaunchConfig::new(Dim2::new(1, 1), Dim2::new(16, 16));
        match args.validate("gemm_test", &config) {
            Err(LaunchError::InvalidArguments { reason, .. }) => {
                assert_eq!(reason, "B [16x16] spans 256 elements but its buffer holds 255");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_launch_must_cover_output() {
        let dev = Device::new(DeviceConfig::default()).unwrap();
        let buf = dev.allocate(32 * 32).unwrap();
        let square = || DeviceMatrix::new(Layout::new(32, 32), buf.buffer().clone());
        let args = GemmArgs::new(square(), square(), square());
        let one_group = LaunchConfig::new(Dim2::new(1, 1), Dim2::new(16, 16));
        assert!(args.validate("gemm_test", &one_group).is_err());
        let covering = LaunchConfig::new(Dim2::new(2, 2), Dim2::new(16, 16));
        assert!(args.validate("gemm_test", &covering).is_ok());
    }
}
