//! BLOCK x BLOCK tile addressing.
//!
//! A tile is a view into its parent's buffer at
//! `(block_row * BLOCK_SIZE, block_col * BLOCK_SIZE)`, sharing the parent's
//! stride. Deriving one only computes an offset, so any number of workers
//! may do it concurrently.

use crate::elements::ReadElements;
use crate::error::{MatrixError, Result};
use crate::matrix::MatrixView;

/// Edge length of a square tile, and of a thread group.
pub const BLOCK_SIZE: usize = 16;

/// The tile at block coordinates `(block_row, block_col)` of `parent`.
///
/// The caller guarantees `(block_row + 1) * BLOCK_SIZE <= parent.height()`
/// and `(block_col + 1) * BLOCK_SIZE <= parent.width()`; this is only
/// asserted in debug builds.
#[inline]
pub fn tile<'a, E: ReadElements + ?Sized>(
    parent: &MatrixView<'a, E>,
    block_row: usize,
    block_col: usize,
) -> MatrixView<'a, E> {
    parent.sub_view(
        block_row * BLOCK_SIZE,
        block_col * BLOCK_SIZE,
        BLOCK_SIZE,
        BLOCK_SIZE,
    )
}

/// Like [`tile`], but returns an error instead of relying on the caller.
pub fn checked_tile<'a, E: ReadElements + ?Sized>(
    parent: &MatrixView<'a, E>,
    block_row: usize,
    block_col: usize,
) -> Result<MatrixView<'a, E>> {
    let fits = |index: usize, extent: usize| {
        index
            .checked_add(1)
            .and_then(|n| n.checked_mul(BLOCK_SIZE))
            .is_some_and(|end| end <= extent)
    };
    if !fits(block_row, parent.height()) || !fits(block_col, parent.width()) {
        return Err(MatrixError::TileOutOfRange {
            block_row,
            block_col,
            block: BLOCK_SIZE,
            height: parent.height(),
            width: parent.width(),
        });
    }
    Ok(tile(parent, block_row, block_col))
}

impl<'a, E: ReadElements + ?Sized> MatrixView<'a, E> {
    /// See [`tile`].
    pub fn tile(&self, block_row: usize, block_col: usize) -> MatrixView<'a, E> {
        tile(self, block_row, block_col)
    }

    /// See [`checked_tile`].
    pub fn checked_tile(&self, block_row: usize, block_col: usize) -> Result<MatrixView<'a, E>> {
        checked_tile(self, block_row, block_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matrix;

    fn numbered(height: usize, width: usize) -> Matrix {
        Matrix::from_fn(height, width, |r, c| (r * width + c) as f32)
    }

    #[test]
    fn test_tile_origin_and_stride() {
        let m = numbered(32, 48);
        let t = m.view().tile(1, 2);
        assert_eq!(t.height(), BLOCK_SIZE);
        assert_eq!(t.width(), BLOCK_SIZE);
        assert_eq!(t.stride(), 48);
        assert_eq!(t.offset(), 16 * 48 + 32);
        assert_eq!(t.get(0, 0), m.get(16, 32));
        assert_eq!(t.get(15, 15), m.get(31, 47));
    }

    #[test]
    fn test_tiles_cover_parent_exactly() {
        let m = numbered(32, 32);
        let v = m.view();
        let mut seen = vec![0u32; m.len()];
        for br in 0..2 {
            for bc in 0..2 {
                let t = v.tile(br, bc);
                for r in 0..BLOCK_SIZE {
                    for c in 0..BLOCK_SIZE {
                        seen[t.get(r, c) as usize] += 1;
                    }
                }
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_tile_of_tile_shares_buffer() {
        let m = numbered(64, 64);
        let outer = m.view().sub_view(16, 16, 32, 32);
        let inner = outer.tile(1, 1);
        assert_eq!(inner.get(0, 0), m.get(32, 32));
        assert!(std::ptr::eq(inner.data(), m.data()));
    }

    #[test]
    fn test_checked_tile_out_of_range() {
        let m = numbered(32, 16);
        let v = m.view();
        assert!(v.checked_tile(1, 0).is_ok());
        assert_eq!(
            v.checked_tile(0, 1).unwrap_err(),
            MatrixError::TileOutOfRange {
                block_row: 0,
                block_col: 1,
                block: BLOCK_SIZE,
                height: 32,
                width: 16,
            }
        );
        assert!(v.checked_tile(2, 0).is_err());
        assert!(v.checked_tile(usize::MAX, 0).is_err());
    }

    #[test]
    fn test_partial_tile_rejected() {
        let m = numbered(24, 24);
        assert!(m.view().checked_tile(0, 0).is_ok());
        assert!(m.view().checked_tile(1, 1).is_err());
    }
}
