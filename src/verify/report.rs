use std::fmt;
use std::ops::Range;

use crate::float::Float;

/// Finite-difference errors at one step size.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaylorStep<F> {
    /// Step size `ε`.
    pub eps: F,
    /// `|(q̂(m₀ + ε δm) − q̂(m₀)) / ε − ⟨∇q̂(m₀), δm⟩|`.
    pub gradient_error: F,
    /// `‖(∇q̂(m₀ + ε δm) − ∇q̂(m₀)) / ε − H δm‖`.
    pub hessian_error: F,
}

/// Hessian symmetry residual for one pair of directions `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymmetryCheck<F> {
    /// `⟨y, H x⟩`.
    pub y_t_hx: F,
    /// `⟨x, H y⟩`.
    pub x_t_hy: F,
    /// `|⟨y, Hx⟩ − ⟨x, Hy⟩| / (‖Hx‖‖y‖ + ‖Hy‖‖x‖)`; zero when `H` vanishes on
    /// both directions. Bounded by one.
    pub relative_error: F,
}

impl<F: Float> SymmetryCheck<F> {
    /// Build the check from the two bilinear values and the norm products
    /// `‖Hx‖‖y‖` and `‖Hy‖‖x‖`.
    pub fn new(y_t_hx: F, x_t_hy: F, hx_y: F, hy_x: F) -> Self {
        let scale = hx_y + hy_x;
        let relative_error = if scale > F::zero() {
            (y_t_hx - x_t_hy).abs() / scale
        } else {
            F::zero()
        };
        SymmetryCheck {
            y_t_hx,
            x_t_hy,
            relative_error,
        }
    }
}

/// Outcome of a Taylor-remainder test.
///
/// The verifier does not decide pass/fail: callers assert on the error
/// curves (e.g. via [`gradient_slope`](Self::gradient_slope)) and on the
/// symmetry residual.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerificationReport<F> {
    cost: F,
    directional_derivative: F,
    steps: Vec<TaylorStep<F>>,
    symmetry: SymmetryCheck<F>,
}

impl<F: Float> VerificationReport<F> {
    pub(crate) fn new(
        cost: F,
        directional_derivative: F,
        steps: Vec<TaylorStep<F>>,
        symmetry: SymmetryCheck<F>,
    ) -> Self {
        VerificationReport {
            cost,
            directional_derivative,
            steps,
            symmetry,
        }
    }

    /// `q̂(m₀)`.
    pub fn cost(&self) -> F {
        self.cost
    }

    /// `⟨∇q̂(m₀), δm⟩`.
    pub fn directional_derivative(&self) -> F {
        self.directional_derivative
    }

    /// One entry per step size, in the order the steps were given.
    pub fn steps(&self) -> &[TaylorStep<F>] {
        &self.steps
    }

    pub fn symmetry(&self) -> &SymmetryCheck<F> {
        &self.symmetry
    }

    pub fn relative_symmetry_error(&self) -> F {
        self.symmetry.relative_error
    }

    pub fn step_sizes(&self) -> Vec<F> {
        self.steps.iter().map(|s| s.eps).collect()
    }

    pub fn gradient_errors(&self) -> Vec<F> {
        self.steps.iter().map(|s| s.gradient_error).collect()
    }

    pub fn hessian_errors(&self) -> Vec<F> {
        self.steps.iter().map(|s| s.hessian_error).collect()
    }

    pub fn max_gradient_error(&self) -> F {
        self.steps
            .iter()
            .fold(F::zero(), |acc, s| acc.max(s.gradient_error))
    }

    pub fn max_hessian_error(&self) -> F {
        self.steps
            .iter()
            .fold(F::zero(), |acc, s| acc.max(s.hessian_error))
    }

    /// Least-squares slope of `log E_g` against `log ε` over `range`.
    ///
    /// Close to one for a correct gradient in the pre-asymptotic regime.
    /// `None` when fewer than two points in `range` have a positive error.
    pub fn gradient_slope(&self, range: Range<usize>) -> Option<F> {
        self.slope(range, |s| s.gradient_error)
    }

    /// Least-squares slope of `log E_H` against `log ε` over `range`.
    pub fn hessian_slope(&self, range: Range<usize>) -> Option<F> {
        self.slope(range, |s| s.hessian_error)
    }

    /// Observed order between consecutive steps,
    /// `log(E_k / E_{k+1}) / log(ε_k / ε_{k+1})`, for the gradient errors.
    ///
    /// Pairs where either error is zero or non-finite are skipped, so the
    /// result can be shorter than `steps().len() - 1`.
    pub fn gradient_rates(&self) -> Vec<F> {
        self.rates(|s| s.gradient_error)
    }

    /// Observed order between consecutive steps for the Hessian errors,
    /// skipping pairs the same way as [`gradient_rates`](Self::gradient_rates).
    pub fn hessian_rates(&self) -> Vec<F> {
        self.rates(|s| s.hessian_error)
    }

    fn slope(&self, range: Range<usize>, error: impl Fn(&TaylorStep<F>) -> F) -> Option<F> {
        let end = range.end.min(self.steps.len());
        let start = range.start.min(end);
        let points: Vec<(F, F)> = self.steps[start..end]
            .iter()
            .filter(|s| error(s) > F::zero() && s.eps > F::zero())
            .map(|s| (s.eps.ln(), error(s).ln()))
            .collect();
        if points.len() < 2 {
            return None;
        }
        let n = F::from_usize(points.len())?;
        let mean_x = points.iter().fold(F::zero(), |acc, p| acc + p.0) / n;
        let mean_y = points.iter().fold(F::zero(), |acc, p| acc + p.1) / n;
        let mut sxy = F::zero();
        let mut sxx = F::zero();
        for &(x, y) in &points {
            sxy = sxy + (x - mean_x) * (y - mean_y);
            sxx = sxx + (x - mean_x) * (x - mean_x);
        }
        if sxx > F::zero() {
            Some(sxy / sxx)
        } else {
            None
        }
    }

    fn rates(&self, error: impl Fn(&TaylorStep<F>) -> F) -> Vec<F> {
        self.steps
            .windows(2)
            .filter(|w| {
                let (a, b) = (error(&w[0]), error(&w[1]));
                a > F::zero() && b > F::zero() && a.is_finite() && b.is_finite()
            })
            .map(|w| (error(&w[0]) / error(&w[1])).ln() / (w[0].eps / w[1].eps).ln())
            .collect()
    }
}

impl<F: Float> fmt::Display for VerificationReport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "q(m0) = {:e}, <grad, dm> = {:e}", self.cost, self.directional_derivative)?;
        writeln!(f, "{:>12} {:>14} {:>14}", "eps", "err_grad", "err_H")?;
        for s in &self.steps {
            writeln!(
                f,
                "{:>12.4e} {:>14.6e} {:>14.6e}",
                s.eps, s.gradient_error, s.hessian_error
            )?;
        }
        write!(
            f,
            "yt*H*x = {:e}, xt*H*y = {:e}, relative symmetry error = {:e}",
            self.symmetry.y_t_hx, self.symmetry.x_t_hy, self.symmetry.relative_error
        )
    }
}
