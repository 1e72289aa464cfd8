use bm_matrix::{Layout, Matrix};

use crate::backend::GemmBackend;
use crate::error::Result;

/// Pure-Rust host backend.
///
/// A straightforward triple loop accumulating left to right over the
/// contraction dimension, the same order both device kernels use. Intended
/// as a reference for checking device results, not for speed. Accepts any
/// consistent shapes, block-aligned or not.
#[derive(Debug, Clone)]
pub struct HostBackend;

impl HostBackend {
    pub fn new() -> Self {
        HostBackend
    }
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GemmBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn matmul(&self, a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<()> {
        Layout::check_product(&a.layout(), &b.layout(), &c.layout())?;

        let (m, k, n) = (a.height(), a.width(), b.width());
        let (a, b) = (a.data(), b.data());
        let out = c.data_mut();
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for p in 0..k {
                    sum += a[i * k + p] * b[p * n + j];
                }
                out[i * n + j] = sum;
            }
        }
        Ok(())
    }
}
