use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("data length mismatch: expected {expected} elements, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("row width {width} exceeds stride {stride}")]
    InvalidStride { width: usize, stride: usize },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}] into [{rows}x{cols}]")]
    ProductMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
        rows: usize,
        cols: usize,
    },
    #[error("tile ({block_row}, {block_col}) of size {block} lies outside a [{height}x{width}] matrix")]
    TileOutOfRange {
        block_row: usize,
        block_col: usize,
        block: usize,
        height: usize,
        width: usize,
    },
}

pub type Result<T> = std::result::Result<T, MatrixError>;
