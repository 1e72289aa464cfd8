//! `bm-matrix` - Row-major matrix descriptors for blockmm.
//!
//! This crate provides:
//! - `Layout`: height, width and row stride of a matrix inside a buffer
//! - `ReadElements` / `WriteElements`: element storage abstraction over host
//!   slices and shared `F32Cell` buffers
//! - `Matrix`: an owned host matrix
//! - `MatrixView`: a non-owning strided view, and the BLOCK x BLOCK tile
//!   accessor built on it

pub mod elements;
pub mod error;
pub mod layout;
pub mod matrix;
pub mod tile;

// Re-export primary types at the crate root for convenience.
pub use elements::{zeroed_cells, F32Cell, ReadElements, WriteElements};
pub use error::{MatrixError, Result};
pub use layout::Layout;
pub use matrix::{Matrix, MatrixView};
pub use tile::{checked_tile, tile, BLOCK_SIZE};
