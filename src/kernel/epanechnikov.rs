//! Epanechnikov kernel implementation

use crate::kernel::traits::{squared_distance, Kernel};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Epanechnikov kernel: K(x, y) = max(0, 1 - ||x - y||² / h²)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpanechnikovKernel {
    bandwidth: f64,
}

impl EpanechnikovKernel {
    /// Create a new Epanechnikov kernel
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
        (1.0 - distance * distance / (self.bandwidth * self.bandwidth)).max(0.0)
    }
}

impl Default for EpanechnikovKernel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Kernel for EpanechnikovKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let scaled = squared_distance(x, y) / (self.bandwidth * self.bandwidth);
        (1.0 - scaled).max(0.0)
    }

    fn self_kernel(&self, _x: ArrayView1<f64>) -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_epanechnikov_inside_support() {
        let kernel = EpanechnikovKernel::new(2.0);
        let x = array![0.0, 0.0];
        let y = array![1.0, 0.0];
        assert_relative_eq!(kernel.compute(x.view(), y.view()), 0.75);
    }

    #[test]
    fn test_epanechnikov_outside_support() {
        let kernel = EpanechnikovKernel::new(1.0);
        let x = array![0.0];
        let y = array![3.0];
        assert_eq!(kernel.compute(x.view(), y.view()), 0.0);
    }

    #[test]
    fn test_epanechnikov_evaluate_distance() {
        let kernel = EpanechnikovKernel::new(2.0);
        assert_relative_eq!(kernel.evaluate_distance(1.0), 0.75);
        assert_eq!(kernel.evaluate_distance(2.5), 0.0);
        assert_eq!(kernel.evaluate_distance(0.0), 1.0);
    }

    #[test]
    #[should_panic(expected = "Bandwidth must be positive")]
    fn test_epanechnikov_negative_bandwidth() {
        EpanechnikovKernel::new(-1.0);
    }
}
