use crate::float::Float;

/// A scalar quantity of interest `q(u, m)`.
///
/// Derivatives are returned in weak form: `gradient_state` is the vector `g`
/// with `⟨g, du⟩ = ∂q/∂u · du`, and the second-derivative methods apply the
/// corresponding bilinear forms to a direction.
pub trait Qoi<F: Float, S, M> {
    /// `q(u, m)`.
    fn value(&self, u: &S, m: &M) -> F;

    /// `∂q/∂u`.
    fn gradient_state(&self, u: &S, m: &M) -> S;

    /// `∂q/∂m`.
    fn gradient_param(&self, u: &S, m: &M) -> M;

    /// `∂²q/∂u² · du`.
    fn apply_uu(&self, u: &S, m: &M, du: &S) -> S;

    /// `∂²q/∂u∂m · dm`.
    fn apply_um(&self, u: &S, m: &M, dm: &M) -> S;

    /// `∂²q/∂m∂u · du`.
    fn apply_mu(&self, u: &S, m: &M, du: &S) -> M;

    /// `∂²q/∂m² · dm`.
    fn apply_mm(&self, u: &S, m: &M, dm: &M) -> M;
}
