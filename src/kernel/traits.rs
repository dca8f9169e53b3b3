//! Kernel trait definition

use ndarray::ArrayView1;

/// Kernel function trait
///
/// A kernel K(x, y) must be symmetric. Kernels satisfying Mercer's condition are
/// inner products in some feature space, which is what makes the cover tree
/// bounds used by max-kernel search valid.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64;

    /// Compute K(x, x), the squared norm of x in feature space
    fn self_kernel(&self, x: ArrayView1<f64>) -> f64 {
        self.compute(x, x)
    }
}

/// Squared Euclidean distance between two dense vectors
pub(crate) fn squared_distance(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
}
