use crate::error::{MatrixError, Result};
use std::fmt;

/// Geometry of a row-major matrix inside a (possibly larger) element buffer.
///
/// Element `(r, c)` lives at `r * stride + c`, relative to the start of the
/// view. A layout with `stride > width` describes a window into a wider
/// parent, which is how block tiles address their parent's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    height: usize,
    width: usize,
    stride: usize,
}

impl Layout {
    /// Create a contiguous layout (`stride == width`).
    pub fn new(height: usize, width: usize) -> Self {
        Layout {
            height,
            width,
            stride: width,
        }
    }

    /// Create a layout whose rows are `stride` elements apart.
    ///
    /// # Errors
    /// Returns an error if `width > stride`, since rows would overlap.
    pub fn strided(height: usize, width: usize, stride: usize) -> Result<Self> {
        if width > stride {
            return Err(MatrixError::InvalidStride { width, stride });
        }
        Ok(Layout {
            height,
            width,
            stride,
        })
    }

    /// Layout of a `height x width` window that shares this layout's rows.
    pub fn window(&self, height: usize, width: usize) -> Layout {
        debug_assert!(width <= self.stride);
        Layout {
            height,
            width,
            stride: self.stride,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of logical elements (`height * width`).
    pub fn numel(&self) -> usize {
        self.height * self.width
    }

    /// Number of buffer elements spanned from the first element to one past
    /// the last one. Padding after the final row is not counted.
    pub fn span(&self) -> usize {
        if self.height == 0 || self.width == 0 {
            return 0;
        }
        (self.height - 1) * self.stride + self.width
    }

    /// Buffer index of element `(row, col)`, relative to the view origin.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.stride + col
    }

    /// True when rows are packed back to back with no padding.
    pub fn is_contiguous(&self) -> bool {
        self.stride == self.width
    }

    /// True when both dimensions are non-zero multiples of `block`.
    pub fn is_block_aligned(&self, block: usize) -> bool {
        block > 0
            && self.height > 0
            && self.width > 0
            && self.height % block == 0
            && self.width % block == 0
    }

    /// Number of whole `block`-sized tiles as `(columns, rows)`.
    ///
    /// Partial trailing tiles are not counted.
    pub fn blocks(&self, block: usize) -> (usize, usize) {
        (self.width / block, self.height / block)
    }

    /// Check that `c = a @ b` is dimensionally consistent.
    ///
    /// Requires `a.width == b.height`, `c.height == a.height` and
    /// `c.width == b.width`.
    pub fn check_product(a: &Layout, b: &Layout, c: &Layout) -> Result<()> {
        if a.width != b.height || c.height != a.height || c.width != b.width {
            return Err(MatrixError::ProductMismatch {
                m: a.height,
                k: a.width,
                k2: b.height,
                n: b.width,
                rows: c.height,
                cols: c.width,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}", self.height, self.width)?;
        if !self.is_contiguous() {
            write!(f, ", stride {}", self.stride)?;
        }
        write!(f, "]")
    }
}
