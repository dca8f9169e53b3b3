//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (<x, y> + c)^d
//!
//! Where:
//! - c (offset): independent term in the polynomial
//! - d (degree): degree of the polynomial
//!
//! Common configurations:
//! - Homogeneous quadratic: d=2, c=0 (the default)
//! - Inhomogeneous quadratic: d=2, c=1
//! - Cubic: d=3, c=1

use crate::kernel::traits::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Polynomial kernel with configurable degree and offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolynomialKernel {
    /// Degree of the polynomial (default: 2.0)
    pub degree: f64,
    /// Independent term in the polynomial (default: 0.0)
    pub offset: f64,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel with the specified parameters
    ///
    /// # Arguments
    /// * `degree` - Degree of the polynomial
    /// * `offset` - Independent term in the polynomial
    ///
    /// # Examples
    /// ```
    /// use rtrees::kernel::PolynomialKernel;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let kernel = PolynomialKernel::new(2.0, 1.0);
    /// assert_eq!(kernel.degree, 2.0);
    /// assert_eq!(kernel.offset, 1.0);
    /// ```
    pub fn new(degree: f64, offset: f64) -> Self {
        Self { degree, offset }
    }

    /// Evaluate the kernel for a known inner product `<x, y>`
    pub fn evaluate_inner_product(&self, inner_product: f64) -> f64 {
        (inner_product + self.offset).powf(self.degree)
    }

    /// Whether the degree is a non-negative integer
    pub fn has_integer_degree(&self) -> bool {
        self.degree >= 0.0 && self.degree.is_finite() && self.degree.fract() == 0.0
    }

    /// Integer degree and non-negative offset: an inner product in feature space
    pub fn is_positive_definite(&self) -> bool {
        self.has_integer_degree() && self.offset >= 0.0
    }
}

impl Default for PolynomialKernel {
    /// Homogeneous quadratic kernel: (x·y)²
    fn default() -> Self {
        Self::new(2.0, 0.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        self.evaluate_inner_product(x.dot(&y))
    }
}
