//! Taylor-remainder verification of reduced gradients and Hessian actions.
//!
//! At a base point `m₀` and direction `δm`, for each step `ε` in a strictly
//! decreasing sequence:
//!
//! - `E_g(ε) = |(q̂(m₀ + ε δm) − q̂(m₀)) / ε − ⟨∇q̂(m₀), δm⟩|`
//! - `E_H(ε) = ‖(∇q̂(m₀ + ε δm) − ∇q̂(m₀)) / ε − H δm‖`
//!
//! Both are `O(ε)` for correct derivatives until round-off takes over. The
//! Hessian symmetry residual is an algebraic identity and is checked once,
//! with two independent random directions.

mod cancel;
#[cfg(feature = "parallel")]
pub mod parallel;
mod report;

pub use cancel::CancelToken;
pub use report::{SymmetryCheck, TaylorStep, VerificationReport};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::error::{check_dim, QoiError, Result};
use crate::float::Float;
use crate::problem::PdeProblem;
use crate::qoi::Qoi;
use crate::reduced::ReducedQoi;
use crate::vector::Vector;

/// Norm used for the Hessian finite-difference error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorNorm {
    /// Largest absolute entry.
    #[default]
    Inf,
    /// Norm induced by the vector inner product.
    Two,
}

impl ErrorNorm {
    pub fn measure<F: Float, V: Vector<F>>(self, v: &V) -> F {
        match self {
            ErrorNorm::Inf => v.norm_inf(),
            ErrorNorm::Two => v.norm(),
        }
    }
}

/// Settings for [`taylor_verify`].
#[derive(Debug, Clone)]
pub struct VerifyConfig<F> {
    /// Strictly decreasing positive step sizes (default: `1e-2 · 2^-k`,
    /// `k = 0..32` for `f64`; `1e-1 · 2^-k`, `k = 0..12` for `f32`).
    pub steps: Vec<F>,
    /// Seed for the random directions (default: 1).
    pub seed: u64,
    /// Norm of the Hessian error vector (default: [`ErrorNorm::Inf`]).
    pub hessian_norm: ErrorNorm,
}

impl Default for VerifyConfig<f64> {
    fn default() -> Self {
        VerifyConfig {
            steps: geometric_steps(1e-2, 0.5, 32),
            seed: 1,
            hessian_norm: ErrorNorm::Inf,
        }
    }
}

impl Default for VerifyConfig<f32> {
    fn default() -> Self {
        VerifyConfig {
            steps: geometric_steps(1e-1, 0.5, 12),
            seed: 1,
            hessian_norm: ErrorNorm::Inf,
        }
    }
}

/// `[first, first·ratio, first·ratio², …]`, `count` entries.
pub fn geometric_steps<F: Float>(first: F, ratio: F, count: usize) -> Vec<F> {
    let mut steps = Vec::with_capacity(count);
    let mut eps = first;
    for _ in 0..count {
        steps.push(eps);
        eps = eps * ratio;
    }
    steps
}

/// Reject empty, non-finite, non-positive or non-decreasing step sequences.
pub(crate) fn validate_steps<F: Float>(steps: &[F]) -> Result<()> {
    if steps.is_empty() {
        return Err(QoiError::InvalidStepSize("no step sizes given".into()));
    }
    for (k, &eps) in steps.iter().enumerate() {
        if !eps.is_finite() || eps <= F::zero() {
            return Err(QoiError::InvalidStepSize(format!(
                "step {k} is {eps}, expected a finite positive value"
            )));
        }
        if k > 0 && eps >= steps[k - 1] {
            return Err(QoiError::InvalidStepSize(format!(
                "steps must be strictly decreasing: step {k} ({eps}) >= step {} ({})",
                k - 1,
                steps[k - 1]
            )));
        }
    }
    Ok(())
}

/// A standard-normal random vector in the space of `template`.
pub fn random_direction<F, V, R>(template: &V, rng: &mut R) -> V
where
    F: Float,
    V: Vector<F>,
    R: Rng + ?Sized,
{
    let mut v = template.zeros_like();
    v.fill_with(|| {
        let z: f64 = StandardNormal.sample(rng);
        F::from_f64_or_zero(z)
    });
    v
}

/// Everything the sweep needs from the base point.
pub(crate) struct Baseline<F, M> {
    pub(crate) direction: M,
    pub(crate) cost: F,
    pub(crate) gradient: M,
    pub(crate) slope: F,
    pub(crate) hessian_direction: M,
}

pub(crate) fn baseline<F, P, Q, R>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    direction: Option<&P::Param>,
    rng: &mut R,
) -> Result<Baseline<F, P::Param>>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
    R: Rng + ?Sized,
{
    let direction = match direction {
        Some(d) => {
            check_dim("verification direction", m0.len(), d.len())?;
            d.clone()
        }
        None => random_direction(m0, rng),
    };
    let (cost, gradient) = rqoi.cost_and_gradient(m0)?;
    let slope = gradient.dot(&direction);
    let hessian_direction = rqoi.hessian_action(m0, &direction)?;
    debug!("taylor: q(m0) = {cost:e}, <g, dm> = {slope:e}");
    Ok(Baseline {
        direction,
        cost,
        gradient,
        slope,
        hessian_direction,
    })
}

/// Finite-difference errors at `m₀ + ε δm`.
pub(crate) fn taylor_step<F, P, Q>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    eps: F,
    base: &Baseline<F, P::Param>,
    norm: ErrorNorm,
) -> Result<TaylorStep<F>>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
{
    let one = F::one();
    let mut m_plus = m0.clone();
    m_plus.axpy(eps, &base.direction);

    let (cost, mut diff) = rqoi.cost_and_gradient(&m_plus)?;
    let gradient_error = ((cost - base.cost) / eps - base.slope).abs();

    diff.axpy(-one, &base.gradient);
    diff.scale(one / eps);
    diff.axpy(-one, &base.hessian_direction);
    let hessian_error = norm.measure(&diff);

    debug!("taylor: eps = {eps:e}, err_grad = {gradient_error:e}, err_H = {hessian_error:e}");
    Ok(TaylorStep {
        eps,
        gradient_error,
        hessian_error,
    })
}

pub(crate) fn symmetry_check<F, P, Q, R>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    rng: &mut R,
) -> Result<SymmetryCheck<F>>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
    R: Rng + ?Sized,
{
    let x: P::Param = random_direction(m0, rng);
    let y: P::Param = random_direction(m0, rng);
    let mut hessian = rqoi.hessian(m0)?;
    let hx = hessian.apply(&x)?;
    let hy = hessian.apply(&y)?;
    let check = SymmetryCheck::new(
        y.dot(&hx),
        x.dot(&hy),
        hx.norm() * y.norm(),
        hy.norm() * x.norm(),
    );
    debug!(
        "taylor: yt*H*x = {:e}, xt*H*y = {:e}, relative error = {:e}",
        check.y_t_hx, check.x_t_hy, check.relative_error
    );
    Ok(check)
}

/// Run the Taylor-remainder test at `m0`.
///
/// `direction` defaults to a standard-normal draw from a generator seeded
/// with `config.seed`; the two symmetry directions come from the same
/// generator, so a report is reproducible from its configuration.
///
/// Any solve failure aborts the whole sweep.
pub fn taylor_verify<F, P, Q>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    direction: Option<&P::Param>,
    config: &VerifyConfig<F>,
) -> Result<VerificationReport<F>>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
{
    taylor_verify_with_cancel(rqoi, m0, direction, config, &CancelToken::new())
}

/// [`taylor_verify`] with cooperative cancellation, checked before each step
/// size. Returns [`QoiError::Cancelled`] once `cancel` is set.
pub fn taylor_verify_with_cancel<F, P, Q>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    direction: Option<&P::Param>,
    config: &VerifyConfig<F>,
    cancel: &CancelToken,
) -> Result<VerificationReport<F>>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
{
    validate_steps(&config.steps)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let base = baseline(rqoi, m0, direction, &mut rng)?;

    let mut steps = Vec::with_capacity(config.steps.len());
    for &eps in &config.steps {
        if cancel.is_cancelled() {
            info!("taylor: cancelled after {} of {} steps", steps.len(), config.steps.len());
            return Err(QoiError::Cancelled);
        }
        steps.push(taylor_step(rqoi, m0, eps, &base, config.hessian_norm)?);
    }

    let symmetry = symmetry_check(rqoi, m0, &mut rng)?;
    Ok(VerificationReport::new(
        base.cost,
        base.slope,
        steps,
        symmetry,
    ))
}
