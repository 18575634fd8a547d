use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::{
    baseline, symmetry_check, taylor_step, validate_steps, CancelToken, TaylorStep,
    VerificationReport, VerifyConfig,
};
use crate::error::{QoiError, Result};
use crate::float::Float;
use crate::problem::PdeProblem;
use crate::qoi::Qoi;
use crate::reduced::ReducedQoi;

/// Parallel Taylor test: step sizes are evaluated concurrently.
///
/// Each step runs on its own clone of `rqoi`, so no cache is shared between
/// threads. The report is identical to the one from
/// [`taylor_verify`](super::taylor_verify) with the same configuration.
pub fn taylor_verify_par<F, P, Q>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    direction: Option<&P::Param>,
    config: &VerifyConfig<F>,
) -> Result<VerificationReport<F>>
where
    F: Float,
    P: PdeProblem<F> + Clone + Send + Sync,
    Q: Qoi<F, P::State, P::Param> + Clone + Send + Sync,
{
    taylor_verify_par_with_cancel(rqoi, m0, direction, config, &CancelToken::new())
}

/// [`taylor_verify_par`] with cooperative cancellation, checked before each
/// step size is started.
pub fn taylor_verify_par_with_cancel<F, P, Q>(
    rqoi: &mut ReducedQoi<F, P, Q>,
    m0: &P::Param,
    direction: Option<&P::Param>,
    config: &VerifyConfig<F>,
    cancel: &CancelToken,
) -> Result<VerificationReport<F>>
where
    F: Float,
    P: PdeProblem<F> + Clone + Send + Sync,
    Q: Qoi<F, P::State, P::Param> + Clone + Send + Sync,
{
    validate_steps(&config.steps)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let base = baseline(rqoi, m0, direction, &mut rng)?;

    let template: &ReducedQoi<F, P, Q> = rqoi;
    let steps: Vec<TaylorStep<F>> = config
        .steps
        .par_iter()
        .map(|&eps| {
            if cancel.is_cancelled() {
                return Err(QoiError::Cancelled);
            }
            let mut local = template.clone();
            taylor_step(&mut local, m0, eps, &base, config.hessian_norm)
        })
        .collect::<Result<Vec<_>>>()?;

    if cancel.is_cancelled() {
        info!("taylor: cancelled after the parallel sweep");
        return Err(QoiError::Cancelled);
    }

    let symmetry = symmetry_check(rqoi, m0, &mut rng)?;
    Ok(VerificationReport::new(
        base.cost,
        base.slope,
        steps,
        symmetry,
    ))
}
