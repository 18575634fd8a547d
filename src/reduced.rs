use std::fmt;
use std::marker::PhantomData;

use log::{debug, trace};

use crate::error::{check_dim, IncrementalStage, QoiError, Result};
use crate::float::Float;
use crate::problem::PdeProblem;
use crate::qoi::Qoi;
use crate::vector::Vector;

/// Forward solution, and adjoint once computed, at one parameter value.
struct CachedSolution<S, M> {
    m: M,
    u: S,
    p: Option<S>,
}

/// The reduced map `m ↦ q̂(m) = q(u(m), m)` with adjoint derivatives.
///
/// Holds at most one cached `(m, u, p)` triple so that a gradient or a
/// Hessian action following a cost evaluation at the same `m` does not
/// repeat the forward solve. The cache is replaced whenever a different
/// parameter is evaluated, and is only written after the solve that produced
/// it succeeded.
///
/// Each instance is single-threaded; evaluate different points concurrently
/// by cloning (a clone starts with an empty cache).
pub struct ReducedQoi<F, P, Q>
where
    F: Float,
    P: PdeProblem<F>,
{
    problem: P,
    qoi: Q,
    cache: Option<CachedSolution<P::State, P::Param>>,
    solves: usize,
    _float: PhantomData<F>,
}

impl<F, P, Q> Clone for ReducedQoi<F, P, Q>
where
    F: Float,
    P: PdeProblem<F> + Clone,
    Q: Clone,
{
    fn clone(&self) -> Self {
        ReducedQoi {
            problem: self.problem.clone(),
            qoi: self.qoi.clone(),
            cache: None,
            solves: 0,
            _float: PhantomData,
        }
    }
}

impl<F, P, Q> fmt::Debug for ReducedQoi<F, P, Q>
where
    F: Float,
    P: PdeProblem<F>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducedQoi")
            .field("cached", &self.cache.is_some())
            .field("solves", &self.solves)
            .finish_non_exhaustive()
    }
}

impl<F, P, Q> ReducedQoi<F, P, Q>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
{
    /// Compose a forward model and a quantity of interest.
    pub fn new(problem: P, qoi: Q) -> Self {
        ReducedQoi {
            problem,
            qoi,
            cache: None,
            solves: 0,
            _float: PhantomData,
        }
    }

    /// Borrow the forward model.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Mutably borrow the forward model. Drops the cached solution, since
    /// the caller may change the model under it.
    pub fn problem_mut(&mut self) -> &mut P {
        self.cache = None;
        &mut self.problem
    }

    /// Borrow the quantity of interest.
    pub fn qoi(&self) -> &Q {
        &self.qoi
    }

    /// Take the collaborators back.
    pub fn into_parts(self) -> (P, Q) {
        (self.problem, self.qoi)
    }

    /// Drop the cached forward/adjoint solution.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Whether a forward solution for exactly `m` is cached.
    pub fn is_cached(&self, m: &P::Param) -> bool {
        self.cache.as_ref().is_some_and(|c| c.m == *m)
    }

    /// Number of forward, adjoint and incremental solves issued so far,
    /// failed attempts included.
    pub fn solve_count(&self) -> usize {
        self.solves
    }

    /// Evaluate `q̂(m)`: one forward solve unless `u(m)` is cached.
    pub fn cost(&mut self, m: &P::Param) -> Result<F> {
        let solution = self.take_solution(m)?;
        let value = self.qoi.value(&solution.u, m);
        self.cache = Some(solution);
        Ok(value)
    }

    /// Adjoint gradient `∇q̂(m) = q_m(u, m) + r_m(u, m)ᵀ p`, where
    /// `r_uᵀ p = -q_u(u, m)`.
    ///
    /// Costs one adjoint solve on top of the forward solve; both are reused
    /// from the cache when available.
    pub fn gradient(&mut self, m: &P::Param) -> Result<P::Param> {
        let mut solution = self.take_solution(m)?;
        let result = match self.adjoint(&solution.u, m, &mut solution.p) {
            Ok(p) => self.assemble_gradient(&solution.u, m, p),
            Err(err) => Err(err),
        };
        self.cache = Some(solution);
        result
    }

    /// `(q̂(m), ∇q̂(m))` from a single forward and adjoint solve.
    pub fn cost_and_gradient(&mut self, m: &P::Param) -> Result<(F, P::Param)> {
        let mut solution = self.take_solution(m)?;
        let value = self.qoi.value(&solution.u, m);
        let result = match self.adjoint(&solution.u, m, &mut solution.p) {
            Ok(p) => self.assemble_gradient(&solution.u, m, p),
            Err(err) => Err(err),
        };
        self.cache = Some(solution);
        Ok((value, result?))
    }

    /// Hessian-vector product `∇²q̂(m) · dm` by the second-order adjoint method.
    ///
    /// 1. `r_u û = -r_m dm`
    /// 2. `r_uᵀ p̂ = -(L_uu û + L_um dm)`
    /// 3. `H dm = L_mm dm + L_mu û + r_mᵀ p̂`
    ///
    /// where `L = q + ⟨p, r⟩`. Two solves per product, whatever the parameter
    /// dimension.
    pub fn hessian_action(&mut self, m: &P::Param, dm: &P::Param) -> Result<P::Param> {
        check_dim("Hessian direction", m.len(), dm.len())?;
        let mut solution = self.take_solution(m)?;
        let result = match self.adjoint(&solution.u, m, &mut solution.p) {
            Ok(p) => self.second_order(&solution.u, m, p, dm),
            Err(err) => Err(err),
        };
        self.cache = Some(solution);
        result
    }

    /// The reduced Hessian at `m` as a matrix-free operator.
    ///
    /// Forward and adjoint solutions are computed up front, so solve failures
    /// at `m` surface here rather than on the first product.
    pub fn hessian(&mut self, m: &P::Param) -> Result<ReducedHessian<'_, F, P, Q>> {
        let mut solution = self.take_solution(m)?;
        let result = self.adjoint(&solution.u, m, &mut solution.p).map(|_| ());
        self.cache = Some(solution);
        result?;
        Ok(ReducedHessian {
            rqoi: self,
            m: m.clone(),
        })
    }

    fn check_param(&self, m: &P::Param) -> Result<()> {
        match &self.cache {
            Some(cached) => check_dim("parameter", cached.m.len(), m.len()),
            None => Ok(()),
        }
    }

    /// Move the solution for `m` out of the cache, solving the forward
    /// problem on a miss. On failure the previous cache entry is restored.
    fn take_solution(&mut self, m: &P::Param) -> Result<CachedSolution<P::State, P::Param>> {
        self.check_param(m)?;
        match self.cache.take() {
            Some(cached) if cached.m == *m => {
                trace!("reduced qoi: reusing cached forward solution");
                Ok(cached)
            }
            stale => {
                debug!("reduced qoi: forward solve (parameter dim {})", m.len());
                self.solves += 1;
                match self.problem.solve_forward(m) {
                    Ok(u) => Ok(CachedSolution {
                        m: m.clone(),
                        u,
                        p: None,
                    }),
                    Err(err) => {
                        self.cache = stale;
                        Err(QoiError::ForwardSolve(err))
                    }
                }
            }
        }
    }

    /// Adjoint `p` for the state `u`, solving `r_uᵀ p = -q_u` unless `slot`
    /// already holds it.
    fn adjoint<'s>(
        &mut self,
        u: &P::State,
        m: &P::Param,
        slot: &'s mut Option<P::State>,
    ) -> Result<&'s P::State> {
        let p = match slot.take() {
            Some(p) => {
                trace!("reduced qoi: reusing cached adjoint");
                p
            }
            None => {
                let mut rhs = self.qoi.gradient_state(u, m);
                check_dim("QOI state gradient", u.len(), rhs.len())?;
                rhs.scale(-F::one());
                debug!("reduced qoi: adjoint solve");
                self.solves += 1;
                let p = self
                    .problem
                    .solve_adjoint(u, m, &rhs)
                    .map_err(QoiError::AdjointSolve)?;
                check_dim("adjoint", u.len(), p.len())?;
                p
            }
        };
        Ok(slot.insert(p))
    }

    fn assemble_gradient(&self, u: &P::State, m: &P::Param, p: &P::State) -> Result<P::Param> {
        let mut g = self.qoi.gradient_param(u, m);
        check_dim("QOI parameter gradient", m.len(), g.len())?;
        let coupled = self.problem.apply_coupling_transpose(u, m, p);
        check_dim("coupling transpose", m.len(), coupled.len())?;
        g.axpy(F::one(), &coupled);
        trace!("reduced qoi: |gradient| = {}", g.norm());
        Ok(g)
    }

    fn second_order(
        &mut self,
        u: &P::State,
        m: &P::Param,
        p: &P::State,
        dm: &P::Param,
    ) -> Result<P::Param> {
        let one = F::one();

        debug!("reduced qoi: incremental forward solve");
        self.solves += 1;
        let uhat = self
            .problem
            .solve_incremental_forward(u, m, dm)
            .map_err(|source| QoiError::IncrementalSolve {
                stage: IncrementalStage::Forward,
                source,
            })?;
        check_dim("incremental state", u.len(), uhat.len())?;

        let mut rhs = self.qoi.apply_uu(u, m, &uhat);
        rhs.axpy(one, &self.problem.apply_uu(u, m, p, &uhat));
        rhs.axpy(one, &self.qoi.apply_um(u, m, dm));
        rhs.axpy(one, &self.problem.apply_um(u, m, p, dm));
        rhs.scale(-one);

        debug!("reduced qoi: incremental adjoint solve");
        self.solves += 1;
        let phat = self
            .problem
            .solve_incremental_adjoint(u, m, &rhs)
            .map_err(|source| QoiError::IncrementalSolve {
                stage: IncrementalStage::Adjoint,
                source,
            })?;
        check_dim("incremental adjoint", u.len(), phat.len())?;

        let mut hd = self.qoi.apply_mm(u, m, dm);
        check_dim("Hessian action", m.len(), hd.len())?;
        hd.axpy(one, &self.problem.apply_mm(u, m, p, dm));
        hd.axpy(one, &self.qoi.apply_mu(u, m, &uhat));
        hd.axpy(one, &self.problem.apply_mu(u, m, p, &uhat));
        hd.axpy(one, &self.problem.apply_coupling_transpose(u, m, &phat));
        trace!("reduced qoi: |H dm| = {}", hd.norm());
        Ok(hd)
    }
}

/// Matrix-free reduced Hessian at a fixed linearisation point.
///
/// Obtained from [`ReducedQoi::hessian`]; every product reuses the cached
/// forward and adjoint solutions and performs two incremental solves.
pub struct ReducedHessian<'a, F, P, Q>
where
    F: Float,
    P: PdeProblem<F>,
{
    rqoi: &'a mut ReducedQoi<F, P, Q>,
    m: P::Param,
}

impl<F, P, Q> ReducedHessian<'_, F, P, Q>
where
    F: Float,
    P: PdeProblem<F>,
    Q: Qoi<F, P::State, P::Param>,
{
    /// Linearisation point.
    pub fn point(&self) -> &P::Param {
        &self.m
    }

    /// Parameter dimension.
    pub fn dim(&self) -> usize {
        self.m.len()
    }

    /// `H · dm`.
    pub fn apply(&mut self, dm: &P::Param) -> Result<P::Param> {
        self.rqoi.hessian_action(&self.m, dm)
    }

    /// `⟨y, H x⟩`.
    pub fn inner(&mut self, x: &P::Param, y: &P::Param) -> Result<F> {
        let hx = self.apply(x)?;
        Ok(y.dot(&hx))
    }
}
