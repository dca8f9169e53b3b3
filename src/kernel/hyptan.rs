//! Hyperbolic Tangent Kernel Implementation
//!
//! The hyperbolic tangent (sigmoid) kernel is defined as:
//! K(x, y) = tanh(s * <x, y> + c)
//!
//! where:
//! - s (scale) is the scaling parameter for the dot product
//! - c (offset) is the bias parameter
//!
//! The kernel is not positive semi-definite in general, but it is monotone in
//! the inner product, which is what max-kernel search bounds.

use crate::kernel::traits::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Hyperbolic tangent kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperbolicTangentKernel {
    /// Scaling parameter for the dot product
    pub scale: f64,
    /// Bias/offset parameter (can be positive, negative, or zero)
    pub offset: f64,
}

impl HyperbolicTangentKernel {
    /// Creates a new hyperbolic tangent kernel
    ///
    /// # Examples
    /// ```
    /// use rtrees::kernel::HyperbolicTangentKernel;
    ///
    /// let kernel = HyperbolicTangentKernel::new(0.1, -1.0);
    /// assert_eq!(kernel.scale, 0.1);
    /// assert_eq!(kernel.offset, -1.0);
    /// ```
    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Evaluate the kernel for a known inner product `<x, y>`
    pub fn evaluate_inner_product(&self, inner_product: f64) -> f64 {
        (self.scale * inner_product + self.offset).tanh()
    }
}

impl Default for HyperbolicTangentKernel {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Kernel for HyperbolicTangentKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        self.evaluate_inner_product(x.dot(&y))
    }
}
