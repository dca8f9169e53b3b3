//! Linear kernel implementation

use crate::kernel::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Linear kernel: K(x, y) = x^T * y
///
/// Max-kernel search with this kernel is maximum inner product search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        x.dot(&y)
    }
}
