use crate::error::SolveError;
use crate::float::Float;
use crate::vector::Vector;

/// A parameter-dependent forward model `r(u, m) = 0`.
///
/// Implementors own discretisation, boundary conditions and linear solvers;
/// the reduced-QOI engine only sees the operations below. All second
/// derivatives refer to the weighted residual `⟨p, r(u, m)⟩`, where `p` is
/// the adjoint variable, and are applied matrix-free.
///
/// Solve methods take `&mut self` so implementors may keep factorisations or
/// preconditioners between the forward, adjoint and incremental solves at the
/// same linearisation point.
pub trait PdeProblem<F: Float> {
    /// State space: forward, adjoint and incremental solutions live here.
    type State: Vector<F>;
    /// Parameter space.
    type Param: Vector<F>;

    /// Solve `r(u, m) = 0` for `u`.
    fn solve_forward(&mut self, m: &Self::Param) -> Result<Self::State, SolveError>;

    /// Solve the adjoint system `r_u(u, m)ᵀ p = rhs` for `p`.
    fn solve_adjoint(
        &mut self,
        u: &Self::State,
        m: &Self::Param,
        rhs: &Self::State,
    ) -> Result<Self::State, SolveError>;

    /// Solve the incremental forward system `r_u(u, m) û = -r_m(u, m) δm` for `û`.
    fn solve_incremental_forward(
        &mut self,
        u: &Self::State,
        m: &Self::Param,
        dm: &Self::Param,
    ) -> Result<Self::State, SolveError>;

    /// Solve the incremental adjoint system `r_u(u, m)ᵀ p̂ = rhs` for `p̂`.
    fn solve_incremental_adjoint(
        &mut self,
        u: &Self::State,
        m: &Self::Param,
        rhs: &Self::State,
    ) -> Result<Self::State, SolveError>;

    /// `r_m(u, m) · dm`.
    fn apply_coupling(&self, u: &Self::State, m: &Self::Param, dm: &Self::Param) -> Self::State;

    /// `r_m(u, m)ᵀ · p`.
    fn apply_coupling_transpose(
        &self,
        u: &Self::State,
        m: &Self::Param,
        p: &Self::State,
    ) -> Self::Param;

    /// `∂²⟨p, r⟩/∂u² · du`.
    fn apply_uu(
        &self,
        u: &Self::State,
        m: &Self::Param,
        p: &Self::State,
        du: &Self::State,
    ) -> Self::State;

    /// `∂²⟨p, r⟩/∂u∂m · dm`.
    fn apply_um(
        &self,
        u: &Self::State,
        m: &Self::Param,
        p: &Self::State,
        dm: &Self::Param,
    ) -> Self::State;

    /// `∂²⟨p, r⟩/∂m∂u · du`, the transpose of [`apply_um`](Self::apply_um).
    fn apply_mu(
        &self,
        u: &Self::State,
        m: &Self::Param,
        p: &Self::State,
        du: &Self::State,
    ) -> Self::Param;

    /// `∂²⟨p, r⟩/∂m² · dm`.
    fn apply_mm(
        &self,
        u: &Self::State,
        m: &Self::Param,
        p: &Self::State,
        dm: &Self::Param,
    ) -> Self::Param;
}
