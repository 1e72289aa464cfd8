use std::fmt;

use crate::elements::{ReadElements, WriteElements};
use crate::error::{MatrixError, Result};
use crate::layout::Layout;

/// A dense, row-major, host-resident f32 matrix with no row padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    layout: Layout,
    data: Vec<f32>,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns an error if `data.len() != height * width`.
    pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        let layout = Layout::new(height, width);
        if data.len() != layout.numel() {
            return Err(MatrixError::LengthMismatch {
                expected: layout.numel(),
                got: data.len(),
            });
        }
        Ok(Matrix { layout, data })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self::filled(height, width, 0.0)
    }

    /// Create a matrix filled with ones.
    pub fn ones(height: usize, width: usize) -> Self {
        Self::filled(height, width, 1.0)
    }

    pub fn filled(height: usize, width: usize, value: f32) -> Self {
        Matrix {
            layout: Layout::new(height, width),
            data: vec![value; height * width],
        }
    }

    /// The `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |r, c| if r == c { 1.0 } else { 0.0 })
    }

    /// Build a matrix by evaluating `f(row, col)` for every element in
    /// row-major order.
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for r in 0..height {
            for c in 0..width {
                data.push(f(r, c));
            }
        }
        Matrix {
            layout: Layout::new(height, width),
            data,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.height() && col < self.width(),
            "({row}, {col}) out of bounds for {}",
            self.layout
        );
        self.data[self.layout.index(row, col)]
    }

    /// Overwrite the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        assert!(
            row < self.height() && col < self.width(),
            "({row}, {col}) out of bounds for {}",
            self.layout
        );
        let idx = self.layout.index(row, col);
        self.data[idx] = value;
    }

    /// Borrow the whole matrix as a view.
    pub fn view(&self) -> MatrixView<'_, [f32]> {
        MatrixView::new(self.layout, self.data.as_slice())
    }

    /// True when every element is exactly zero (either sign).
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}

/// A non-owning, possibly strided window into an element buffer.
///
/// Views are cheap to copy and may alias each other; the buffer is owned
/// elsewhere (a host [`Matrix`], a device buffer or a group scratch tile).
pub struct MatrixView<'a, E: ?Sized> {
    layout: Layout,
    offset: usize,
    data: &'a E,
}

impl<E: ?Sized> Clone for MatrixView<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for MatrixView<'_, E> {}

impl<E: ?Sized> fmt::Debug for MatrixView<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("layout", &self.layout)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<'a, E: ReadElements + ?Sized> MatrixView<'a, E> {
    /// View `data` from its first element with the given layout.
    pub fn new(layout: Layout, data: &'a E) -> Self {
        Self::with_offset(layout, 0, data)
    }

    /// View `data` starting at element `offset`.
    pub fn with_offset(layout: Layout, offset: usize, data: &'a E) -> Self {
        MatrixView {
            layout,
            offset,
            data,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn height(&self) -> usize {
        self.layout.height()
    }

    pub fn width(&self) -> usize {
        self.layout.width()
    }

    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Element offset of `(0, 0)` inside the backing buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The backing buffer, shared with every view derived from it.
    pub fn data(&self) -> &'a E {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data.read(self.offset + self.layout.index(row, col))
    }

    /// A `height x width` window whose origin is `(row, col)` of this view.
    ///
    /// Shares this view's stride and buffer. Bounds are only checked in
    /// debug builds.
    pub fn sub_view(&self, row: usize, col: usize, height: usize, width: usize) -> Self {
        debug_assert!(
            row + height <= self.height() && col + width <= self.width(),
            "window ({row}, {col}) [{height}x{width}] exceeds {}",
            self.layout
        );
        MatrixView {
            layout: self.layout.window(height, width),
            offset: self.offset + self.layout.index(row, col),
            data: self.data,
        }
    }

    /// Copy the viewed elements into a new contiguous matrix.
    pub fn to_matrix(&self) -> Matrix {
        Matrix::from_fn(self.height(), self.width(), |r, c| self.get(r, c))
    }
}

impl<E: WriteElements + ?Sized> MatrixView<'_, E> {
    #[inline]
    pub fn set(&self, row: usize, col: usize, value: f32) {
        self.data
            .write(self.offset + self.layout.index(row, col), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::zeroed_cells;

    #[test]
    fn test_new_matrix() {
        let m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.height(), 2);
        assert_eq!(m.width(), 3);
        assert_eq!(m.len(), 6);
        assert_eq!(m.get(1, 0), 4.0);
        assert!(m.layout().is_contiguous());
    }

    #[test]
    fn test_new_length_mismatch() {
        assert_eq!(
            Matrix::new(2, 2, vec![1.0, 2.0, 3.0]),
            Err(MatrixError::LengthMismatch {
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn test_zeros_ones_identity() {
        assert!(Matrix::zeros(2, 3).is_zero());
        assert_eq!(Matrix::ones(1, 3).data(), &[1.0, 1.0, 1.0]);
        let i = Matrix::identity(3);
        assert_eq!(i.data(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_fn_row_major() {
        let m = Matrix::from_fn(2, 3, |r, c| (r * 10 + c) as f32);
        assert_eq!(m.data(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_set() {
        let mut m = Matrix::zeros(2, 2);
        m.set(1, 1, 9.0);
        assert_eq!(m.data(), &[0.0, 0.0, 0.0, 9.0]);
        assert!(!m.is_zero());
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_bounds_panics() {
        let m = Matrix::zeros(2, 2);
        let _ = m.get(2, 0);
    }

    #[test]
    fn test_view_reads_parent() {
        let m = Matrix::from_fn(4, 4, |r, c| (r * 4 + c) as f32);
        let v = m.view();
        assert_eq!(v.get(2, 3), 11.0);
        assert_eq!(v.offset(), 0);
        assert_eq!(v.to_matrix(), m);
    }

    #[test]
    fn test_sub_view_aliases_parent() {
        let m = Matrix::from_fn(4, 6, |r, c| (r * 6 + c) as f32);
        let v = m.view().sub_view(1, 2, 2, 3);
        assert_eq!(v.stride(), 6);
        assert_eq!(v.offset(), 8);
        assert_eq!(v.get(0, 0), 8.0);
        assert_eq!(v.get(1, 2), 16.0);
        assert!(std::ptr::eq(v.data(), m.data()));
    }

    #[test]
    fn test_cell_view_set() {
        let cells = zeroed_cells(16);
        let v = MatrixView::new(Layout::new(4, 4), &cells[..]);
        let window = v.sub_view(2, 2, 2, 2);
        window.set(1, 1, 5.0);
        assert_eq!(v.get(3, 3), 5.0);
        assert_eq!(cells[15].load(), 5.0);
    }
}
