//! Gaussian kernel implementation
//!
//! The Gaussian kernel is defined as: K(x, y) = exp(-||x - y||² / (2σ²))
//! where σ (bandwidth) controls the kernel width.

use crate::kernel::traits::{squared_distance, Kernel};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Gaussian kernel: K(x, y) = exp(-||x - y||² / (2σ²))
///
/// The kernel is normalized (K(x, x) = 1), so in feature space every point
/// lies on the unit sphere. The bandwidth controls the "reach" of each point:
/// - Small bandwidth: only very close points have a large kernel value
/// - Large bandwidth: kernel values decay slowly with distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianKernel {
    bandwidth: f64,
}

impl GaussianKernel {
    /// Create a new Gaussian kernel with the given bandwidth
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

    /// Get the bandwidth parameter
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Evaluate the kernel for a known distance between two points
    pub fn evaluate_distance(&self, distance: f64) -> f64 {
        (-distance * distance / (2.0 * self.bandwidth * self.bandwidth)).exp()
    }
}

impl Default for GaussianKernel {
    /// Default Gaussian kernel with bandwidth = 1.0
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Kernel for GaussianKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let squared = squared_distance(x, y);
        (-squared / (2.0 * self.bandwidth * self.bandwidth)).exp()
    }

    fn self_kernel(&self, _x: ArrayView1<f64>) -> f64 {
        1.0
    }
}
