//! Triangular kernel implementation

use crate::kernel::traits::{squared_distance, Kernel};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Triangular kernel: K(x, y) = max(0, 1 - ||x - y|| / h)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularKernel {
    bandwidth: f64,
}

impl TriangularKernel {
    /// Create a new triangular kernel
    ///
    /// # Panics
    /// Panics if bandwidth is not positive
    pub fn new(bandwidth: f64) -> Self {
        assert!(
            bandwidth > 0.0,
            "Bandwidth must be positive, got: {}",
            bandwidth
        );
        Self { bandwidth }
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Evaluate the kernel for a known distance between two points
    pub fn evaluate_distance(&self, distance: f64) -> f64 {
        (1.0 - distance / self.bandwidth).max(0.0)
    }
}

impl Default for TriangularKernel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Kernel for TriangularKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        self.evaluate_distance(squared_distance(x, y).sqrt())
    }

    fn self_kernel(&self, _x: ArrayView1<f64>) -> f64 {
        1.0
    }
}
