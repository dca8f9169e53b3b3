//! Cosine similarity kernel

use crate::kernel::traits::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Cosine kernel: K(x, y) = <x, y> / (||x|| ||y||)
///
/// Defined as 0 when either vector is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CosineKernel;

impl CosineKernel {
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for CosineKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let denominator = x.dot(&x).sqrt() * y.dot(&y).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            x.dot(&y) / denominator
        }
    }
}
