//! Upper bounds on kernel values over balls of points
//!
//! Tree search skips a reference node when no point below it can beat the
//! current k-th best value. A node is a ball: a center point and the largest
//! distance `λ` from it to any descendant, in the metric the cover tree was
//! built with. Which bound is valid depends on the kernel:
//!
//! - [`BoundKind::FeatureSpace`]: the kernel is an inner product in some
//!   feature space (linear, cosine, polynomial with integer degree and
//!   non-negative offset). The tree uses feature-space distances and
//!   Cauchy-Schwarz gives `K(q, r) <= K(c, p) + ||φc|| λr + ||φp|| λq + λq λr`.
//! - [`BoundKind::Distance`]: the kernel is a non-increasing function `f` of
//!   the Euclidean distance (gaussian, epanechnikov, triangular). The tree uses
//!   Euclidean distances and `K(q, r) <= f(max(0, d(c, p) - λq - λr))`.
//! - [`BoundKind::InnerProduct`]: the kernel is `g(<x, y>)` with `g` monotone
//!   or convex (hyperbolic tangent, polynomial with integer degree and a
//!   negative offset). The tree uses Euclidean distances, `<q, r>` lies within
//!   `<c, p> ± (||c|| λr + ||p|| λq + λq λr)` and the maximum of `g` over that
//!   interval sits at one of its ends.
//! - [`BoundKind::Unbounded`]: no valid bound, nothing is pruned.
//!
//! Single-tree search uses the same bounds with a query radius of zero.

use crate::kernel::{squared_distance, Kernel, KernelFunction};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Metric a cover tree is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `sqrt(K(x, x) + K(y, y) - 2 K(x, y))`
    FeatureSpace,
    /// `||x - y||`
    Euclidean,
}

/// Family of bound used for a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    FeatureSpace,
    Distance,
    InnerProduct,
    Unbounded,
}

impl BoundKind {
    pub fn for_kernel(kernel: &KernelFunction) -> Self {
        match kernel {
            KernelFunction::Linear(_) | KernelFunction::Cosine(_) => Self::FeatureSpace,
            KernelFunction::Polynomial(k) if k.is_positive_definite() => Self::FeatureSpace,
            KernelFunction::Polynomial(k) if k.has_integer_degree() => Self::InnerProduct,
            KernelFunction::Polynomial(_) => Self::Unbounded,
            KernelFunction::Gaussian(_)
            | KernelFunction::Epanechnikov(_)
            | KernelFunction::Triangular(_) => Self::Distance,
            KernelFunction::Hyptan(_) => Self::InnerProduct,
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            Self::FeatureSpace => Metric::FeatureSpace,
            Self::Distance | Self::InnerProduct | Self::Unbounded => Metric::Euclidean,
        }
    }
}

/// Kernel value of a query/reference pair plus what its bound starts from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairValue {
    /// `K(q, r)`
    pub kernel: f64,
    /// Euclidean distance for [`BoundKind::Distance`], inner product for
    /// [`BoundKind::InnerProduct`], unused otherwise
    pub base: f64,
}

/// A kernel together with its bound family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelBound {
    kernel: KernelFunction,
    kind: BoundKind,
}

impl KernelBound {
    pub fn new(kernel: KernelFunction) -> Self {
        Self {
            kind: BoundKind::for_kernel(&kernel),
            kernel,
        }
    }

    pub fn kernel(&self) -> &KernelFunction {
        &self.kernel
    }

    pub fn kind(&self) -> BoundKind {
        self.kind
    }

    pub fn metric(&self) -> Metric {
        self.kind.metric()
    }

    /// Distance between two points in the tree metric
    pub fn distance(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        match self.metric() {
            Metric::FeatureSpace => self.kernel.feature_distance(x, y),
            Metric::Euclidean => squared_distance(x, y).sqrt(),
        }
    }

    /// Norm of a point in the tree metric's space
    pub fn norm(&self, x: ArrayView1<f64>) -> f64 {
        match self.metric() {
            Metric::FeatureSpace => self.kernel.self_kernel(x).max(0.0).sqrt(),
            Metric::Euclidean => x.dot(&x).sqrt(),
        }
    }

    /// Evaluate the kernel on a (query, reference) pair
    pub fn evaluate(&self, query: ArrayView1<f64>, reference: ArrayView1<f64>) -> PairValue {
        let base = match self.kind {
            BoundKind::Distance => squared_distance(query, reference).sqrt(),
            BoundKind::InnerProduct => query.dot(&reference),
            BoundKind::FeatureSpace | BoundKind::Unbounded => 0.0,
        };
        PairValue {
            kernel: self.kernel.compute(query, reference),
            base,
        }
    }

    /// Upper bound on `K(q, r)` over every `q` within `query_radius` of the
    /// query center and every `r` within `reference_radius` of the reference
    /// center, given the centers' pair value and norms
    pub fn bound(
        &self,
        pair: PairValue,
        query_norm: f64,
        query_radius: f64,
        reference_norm: f64,
        reference_radius: f64,
    ) -> f64 {
        let slack = query_norm * reference_radius
            + reference_norm * query_radius
            + query_radius * reference_radius;
        match self.kind {
            BoundKind::FeatureSpace => pair.kernel + slack,
            BoundKind::Distance => {
                let closest = (pair.base - query_radius - reference_radius).max(0.0);
                self.kernel.distance_profile(closest).unwrap_or(f64::INFINITY)
            }
            BoundKind::InnerProduct => {
                let low = self.kernel.inner_product_profile(pair.base - slack);
                let high = self.kernel.inner_product_profile(pair.base + slack);
                match (low, high) {
                    (Some(low), Some(high)) if !low.is_nan() && !high.is_nan() => low.max(high),
                    _ => f64::INFINITY,
                }
            }
            BoundKind::Unbounded => f64::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{
        EpanechnikovKernel, GaussianKernel, HyperbolicTangentKernel, LinearKernel,
        PolynomialKernel, TriangularKernel,
    };
    use ndarray::{array, s, Array2};

    fn all_kernels() -> Vec<KernelFunction> {
        vec![
            KernelFunction::Linear(LinearKernel::new()),
            KernelFunction::Polynomial(PolynomialKernel::new(2.0, 1.0)),
            KernelFunction::Polynomial(PolynomialKernel::new(2.0, -0.5)),
            KernelFunction::Polynomial(PolynomialKernel::new(3.0, -0.5)),
            KernelFunction::Cosine(crate::kernel::CosineKernel::new()),
            KernelFunction::Gaussian(GaussianKernel::new(0.8)),
            KernelFunction::Epanechnikov(EpanechnikovKernel::new(1.2)),
            KernelFunction::Triangular(TriangularKernel::new(1.2)),
            KernelFunction::Hyptan(HyperbolicTangentKernel::new(0.5, 0.3)),
            KernelFunction::Hyptan(HyperbolicTangentKernel::new(-0.7, 0.1)),
        ]
    }

    #[test]
    fn test_kind_for_kernel() {
        let kind = |k: KernelFunction| BoundKind::for_kernel(&k);
        assert_eq!(kind(KernelFunction::default()), BoundKind::FeatureSpace);
        assert_eq!(
            kind(KernelFunction::Gaussian(GaussianKernel::new(1.0))),
            BoundKind::Distance
        );
        assert_eq!(
            kind(KernelFunction::Hyptan(HyperbolicTangentKernel::default())),
            BoundKind::InnerProduct
        );
        assert_eq!(
            kind(KernelFunction::Polynomial(PolynomialKernel::new(2.0, -1.0))),
            BoundKind::InnerProduct
        );
        assert_eq!(
            kind(KernelFunction::Polynomial(PolynomialKernel::new(2.5, 1.0))),
            BoundKind::Unbounded
        );
        assert_eq!(BoundKind::Distance.metric(), Metric::Euclidean);
        assert_eq!(BoundKind::FeatureSpace.metric(), Metric::FeatureSpace);
    }

    #[test]
    fn test_bounds_hold_over_balls() {
        // Two clusters of points around fixed centers
        let points = Array2::from_shape_fn((2, 24), |(i, j)| {
            let t = j as f64;
            let spread = 0.4 * ((t * 1.7 + i as f64).sin());
            if j < 12 {
                0.5 + spread
            } else {
                -0.8 + spread * 1.5
            }
        });
        let queries = points.slice(s![.., ..12]);
        let references = points.slice(s![.., 12..]);

        for kernel in all_kernels() {
            let bound = KernelBound::new(kernel);
            let (c, p) = (queries.column(0), references.column(0));
            let lambda_q = queries
                .columns()
                .into_iter()
                .map(|q| bound.distance(c, q))
                .fold(0.0, f64::max);
            let lambda_r = references
                .columns()
                .into_iter()
                .map(|r| bound.distance(p, r))
                .fold(0.0, f64::max);
            let dual = bound.bound(
                bound.evaluate(c, p),
                bound.norm(c),
                lambda_q,
                bound.norm(p),
                lambda_r,
            );

            for q in queries.columns() {
                let single = bound.bound(bound.evaluate(q, p), bound.norm(q), 0.0, 0.0, lambda_r);
                for r in references.columns() {
                    let value = kernel.compute(q, r);
                    assert!(value <= single + 1e-9, "single bound fails for {kernel}");
                    assert!(value <= dual + 1e-9, "dual bound fails for {kernel}");
                }
            }
        }
    }

    #[test]
    fn test_distance_bound_is_tight_at_zero_radius() {
        let bound = KernelBound::new(KernelFunction::Triangular(TriangularKernel::new(2.0)));
        let (q, r) = (array![0.0, 0.0], array![0.0, 1.0]);
        let pair = bound.evaluate(q.view(), r.view());
        assert_eq!(pair.base, 1.0);
        assert_eq!(bound.bound(pair, 0.0, 0.0, 0.0, 0.0), pair.kernel);
        // Radius larger than the distance reaches the kernel's peak
        assert_eq!(bound.bound(pair, 0.0, 0.0, 0.0, 1.5), 1.0);
    }

    #[test]
    fn test_unbounded_never_prunes() {
        let bound = KernelBound::new(KernelFunction::Polynomial(PolynomialKernel::new(1.5, 0.0)));
        let (q, r) = (array![1.0, 0.0], array![0.5, 0.5]);
        let pair = bound.evaluate(q.view(), r.view());
        assert_eq!(bound.bound(pair, 1.0, 0.0, 1.0, 0.0), f64::INFINITY);
    }
}
