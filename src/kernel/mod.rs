//! Kernel functions for max-kernel search
//!
//! Every kernel is a small struct implementing [`Kernel`]. [`KernelFunction`]
//! closes the set into one enum so the search hot loops dispatch with a
//! `match` instead of a trait object.

pub mod cosine;
pub mod epanechnikov;
pub mod gaussian;
pub mod hyptan;
pub mod linear;
pub mod polynomial;
pub mod traits;
pub mod triangular;

pub use self::cosine::*;
pub use self::epanechnikov::*;
pub use self::gaussian::*;
pub use self::hyptan::*;
pub use self::linear::*;
pub use self::polynomial::*;
pub use self::traits::*;
pub use self::triangular::*;

use crate::core::{Result, TreeError};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names accepted by [`KernelFunction::from_name`]
pub const KERNEL_NAMES: [&str; 7] = [
    "linear",
    "polynomial",
    "cosine",
    "gaussian",
    "epanechnikov",
    "triangular",
    "hyptan",
];

/// Numeric parameters shared by the configurable kernels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    /// Degree of the polynomial kernel
    pub degree: f64,
    /// Offset of the polynomial and hyperbolic tangent kernels
    pub offset: f64,
    /// Bandwidth of the Gaussian, Epanechnikov and triangular kernels
    pub bandwidth: f64,
    /// Scale of the hyperbolic tangent kernel
    pub scale: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            degree: 2.0,
            offset: 0.0,
            bandwidth: 1.0,
            scale: 1.0,
        }
    }
}

/// Closed set of kernels, each carrying its own parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Cosine(CosineKernel),
    Gaussian(GaussianKernel),
    Epanechnikov(EpanechnikovKernel),
    Triangular(TriangularKernel),
    Hyptan(HyperbolicTangentKernel),
}

impl KernelFunction {
    /// Build a kernel from its name and the parameter set
    ///
    /// Unknown names fail with [`TreeError::UnknownKernel`]; non-positive
    /// bandwidths fail with [`TreeError::InvalidParameter`].
    pub fn from_name(name: &str, params: &KernelParams) -> Result<Self> {
        let needs_bandwidth = matches!(name, "gaussian" | "epanechnikov" | "triangular");
        if needs_bandwidth && params.bandwidth <= 0.0 {
            return Err(TreeError::InvalidParameter(format!(
                "Bandwidth must be positive, got: {}",
                params.bandwidth
            )));
        }

        match name {
            "linear" => Ok(Self::Linear(LinearKernel::new())),
            "polynomial" => Ok(Self::Polynomial(PolynomialKernel::new(
                params.degree,
                params.offset,
            ))),
            "cosine" => Ok(Self::Cosine(CosineKernel::new())),
            "gaussian" => Ok(Self::Gaussian(GaussianKernel::new(params.bandwidth))),
            "epanechnikov" => Ok(Self::Epanechnikov(EpanechnikovKernel::new(
                params.bandwidth,
            ))),
            "triangular" => Ok(Self::Triangular(TriangularKernel::new(params.bandwidth))),
            "hyptan" => Ok(Self::Hyptan(HyperbolicTangentKernel::new(
                params.scale,
                params.offset,
            ))),
            other => Err(TreeError::UnknownKernel(format!(
                "'{other}' (expected one of: {})",
                KERNEL_NAMES.join(", ")
            ))),
        }
    }

    /// The kernel's type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::Polynomial(_) => "polynomial",
            Self::Cosine(_) => "cosine",
            Self::Gaussian(_) => "gaussian",
            Self::Epanechnikov(_) => "epanechnikov",
            Self::Triangular(_) => "triangular",
            Self::Hyptan(_) => "hyptan",
        }
    }

    /// Distance between two points in the kernel's feature space
    ///
    /// `sqrt(K(x, x) + K(y, y) - 2 K(x, y))`, clamped at zero for kernels that
    /// are not positive semi-definite.
    pub fn feature_distance(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        let squared = self.self_kernel(x) + self.self_kernel(y) - 2.0 * self.compute(x, y);
        squared.max(0.0).sqrt()
    }

    /// Kernel value as a function of the Euclidean distance, for the
    /// kernels that only depend on it (non-increasing)
    pub fn distance_profile(&self, distance: f64) -> Option<f64> {
        match self {
            Self::Gaussian(k) => Some(k.evaluate_distance(distance)),
            Self::Epanechnikov(k) => Some(k.evaluate_distance(distance)),
            Self::Triangular(k) => Some(k.evaluate_distance(distance)),
            _ => None,
        }
    }

    /// Kernel value as a function of the inner product `<x, y>`, for the
    /// kernels that only depend on it
    pub fn inner_product_profile(&self, inner_product: f64) -> Option<f64> {
        match self {
            Self::Linear(_) => Some(inner_product),
            Self::Polynomial(k) => Some(k.evaluate_inner_product(inner_product)),
            Self::Hyptan(k) => Some(k.evaluate_inner_product(inner_product)),
            _ => None,
        }
    }
}

impl Default for KernelFunction {
    fn default() -> Self {
        Self::Linear(LinearKernel::new())
    }
}

impl fmt::Display for KernelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polynomial(k) => write!(f, "polynomial(degree={}, offset={})", k.degree, k.offset),
            Self::Gaussian(k) => write!(f, "gaussian(bandwidth={})", k.bandwidth()),
            Self::Epanechnikov(k) => write!(f, "epanechnikov(bandwidth={})", k.bandwidth()),
            Self::Triangular(k) => write!(f, "triangular(bandwidth={})", k.bandwidth()),
            Self::Hyptan(k) => write!(f, "hyptan(scale={}, offset={})", k.scale, k.offset),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for KernelFunction {
    type Err = TreeError;

    /// Parse a kernel name using default parameters
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s, &KernelParams::default())
    }
}

impl Kernel for KernelFunction {
    #[inline]
    fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        match self {
            Self::Linear(k) => k.compute(x, y),
            Self::Polynomial(k) => k.compute(x, y),
            Self::Cosine(k) => k.compute(x, y),
            Self::Gaussian(k) => k.compute(x, y),
            Self::Epanechnikov(k) => k.compute(x, y),
            Self::Triangular(k) => k.compute(x, y),
            Self::Hyptan(k) => k.compute(x, y),
        }
    }

    #[inline]
    fn self_kernel(&self, x: ArrayView1<f64>) -> f64 {
        match self {
            Self::Linear(k) => k.self_kernel(x),
            Self::Polynomial(k) => k.self_kernel(x),
            Self::Cosine(k) => k.self_kernel(x),
            Self::Gaussian(k) => k.self_kernel(x),
            Self::Epanechnikov(k) => k.self_kernel(x),
            Self::Triangular(k) => k.self_kernel(x),
            Self::Hyptan(k) => k.self_kernel(x),
        }
    }
}
