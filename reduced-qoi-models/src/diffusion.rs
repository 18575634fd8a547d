//! 1D log-coefficient diffusion: `-(e^m u')' = f` on `(0, 1)`.
//!
//! Piecewise-linear finite elements on a uniform mesh of `n` elements. The
//! parameter holds one log-coefficient per element, the state holds the
//! `n − 1` interior nodal values; Dirichlet values are fixed at both ends.
//!
//! With `k_e = exp(m_e)` and the element gradient `g_e(v) = (v_{e+1} − v_e)/h`,
//! the weak residual is
//!
//! ```text
//! ⟨p, r(u, m)⟩ = h Σ_e k_e g_e(u) g_e(p) − h Σ_i f_i p_i
//! ```
//!
//! where `u` carries the boundary values and `p` vanishes on the boundary.
//! The residual is linear in `u`, so `∂²⟨p, r⟩/∂u² = 0`, while every
//! parameter derivative picks up another factor of `k_e`.

use log::trace;
use reduced_qoi::{Float, PdeProblem, SolveError, Vector};

use crate::linalg::{lu_factor, LuFactors};

/// Finite-element diffusion model with a log-normal-style coefficient.
///
/// Keeps the LU factors of the stiffness matrix for the last parameter it
/// saw, so the adjoint and both incremental solves at a linearisation point
/// reuse the forward factorisation.
#[derive(Debug, Clone)]
pub struct Diffusion1d<F> {
    n: usize,
    h: F,
    left: F,
    right: F,
    source: Vec<F>,
    factors: Option<(Vec<F>, LuFactors<F>)>,
}

impl<F: Float> Diffusion1d<F> {
    /// `n` elements, zero source, `u(0) = 0` and `u(1) = 1`.
    ///
    /// # Panics
    ///
    /// Panics if `n < 2` (there would be no interior unknowns).
    pub fn new(n: usize) -> Self {
        assert!(n >= 2, "Diffusion1d needs at least 2 elements, got {}", n);
        let h = F::one() / F::from_usize(n).unwrap_or_else(F::one);
        Diffusion1d {
            n,
            h,
            left: F::zero(),
            right: F::one(),
            source: vec![F::zero(); n - 1],
            factors: None,
        }
    }

    /// Dirichlet values at `x = 0` and `x = 1`.
    pub fn with_boundary(mut self, left: F, right: F) -> Self {
        self.left = left;
        self.right = right;
        self.factors = None;
        self
    }

    /// Spatially constant source `f`.
    pub fn with_source(mut self, f: F) -> Self {
        self.source = vec![f; self.n - 1];
        self.factors = None;
        self
    }

    /// Number of elements (= parameter dimension).
    pub fn num_elements(&self) -> usize {
        self.n
    }

    /// Number of interior nodes (= state dimension).
    pub fn num_unknowns(&self) -> usize {
        self.n - 1
    }

    /// Mesh size.
    pub fn h(&self) -> F {
        self.h
    }

    pub fn boundary(&self) -> (F, F) {
        (self.left, self.right)
    }

    /// Interior values padded with the Dirichlet data.
    pub fn with_boundary_values(&self, u: &[F]) -> Vec<F> {
        self.pad(u, self.left, self.right)
    }

    /// Interior values padded with zeros (adjoint and incremental fields).
    pub fn with_zero_boundary(&self, v: &[F]) -> Vec<F> {
        self.pad(v, F::zero(), F::zero())
    }

    /// `g_e(v)` for every element of a padded nodal vector.
    pub fn element_gradients(&self, full: &[F]) -> Vec<F> {
        debug_assert_eq!(full.len(), self.n + 1);
        full.windows(2).map(|w| (w[1] - w[0]) / self.h).collect()
    }

    fn pad(&self, v: &[F], left: F, right: F) -> Vec<F> {
        debug_assert_eq!(v.len(), self.n - 1);
        let mut full = Vec::with_capacity(self.n + 1);
        full.push(left);
        full.extend_from_slice(v);
        full.push(right);
        full
    }

    fn coefficients(m: &[F]) -> Vec<F> {
        m.iter().map(|&me| me.exp()).collect()
    }

    /// Interior rows of `v ↦ h Σ_e c_e g_e(full) g_e(v)`.
    fn apply_form(&self, c: &[F], full: &[F]) -> Vec<F> {
        let mut out = vec![F::zero(); self.n - 1];
        for (e, g) in self.element_gradients(full).into_iter().enumerate() {
            let flux = c[e] * g;
            if e + 1 < self.n {
                out[e] = out[e] + flux;
            }
            if e >= 1 {
                out[e - 1] = out[e - 1] - flux;
            }
        }
        out
    }

    /// `(h c_e g_e(a) g_e(b))_e` for padded `a`, `b`.
    fn element_products(&self, c: &[F], a: &[F], b: &[F]) -> Vec<F> {
        let ga = self.element_gradients(a);
        let gb = self.element_gradients(b);
        (0..self.n)
            .map(|e| self.h * c[e] * ga[e] * gb[e])
            .collect()
    }

    /// Stiffness matrix on the interior nodes for coefficients `k`.
    fn stiffness(&self, k: &[F]) -> Vec<Vec<F>> {
        let size = self.n - 1;
        let mut a = vec![vec![F::zero(); size]; size];
        for e in 0..self.n {
            let ke = k[e] / self.h;
            // element e joins full nodes e and e + 1, interior indices e - 1 and e
            let lo = e.checked_sub(1);
            let hi = if e < size { Some(e) } else { None };
            if let Some(i) = lo {
                a[i][i] = a[i][i] + ke;
            }
            if let Some(j) = hi {
                a[j][j] = a[j][j] + ke;
            }
            if let (Some(i), Some(j)) = (lo, hi) {
                a[i][j] = a[i][j] - ke;
                a[j][i] = a[j][i] - ke;
            }
        }
        a
    }

    /// LU factors of the stiffness matrix at `m`, reused when `m` is unchanged.
    fn factors(&mut self, m: &[F]) -> Result<&LuFactors<F>, SolveError> {
        let entry = match self.factors.take() {
            Some(cached) if cached.0.as_slice() == m => cached,
            _ => {
                trace!("diffusion: factorizing {0}x{0} stiffness", self.n - 1);
                let k = Self::coefficients(m);
                let lu = lu_factor(&self.stiffness(&k)).ok_or(SolveError::Singular)?;
                (m.to_vec(), lu)
            }
        };
        let (_, lu) = self.factors.insert(entry);
        Ok(lu)
    }
}

impl<F: Float> PdeProblem<F> for Diffusion1d<F> {
    type State = Vec<F>;
    type Param = Vec<F>;

    fn solve_forward(&mut self, m: &Vec<F>) -> Result<Vec<F>, SolveError> {
        if m.len() != self.n {
            return Err(SolveError::Breakdown(format!(
                "expected {} element coefficients, got {}",
                self.n,
                m.len()
            )));
        }
        // r(u) = K u + (boundary terms) - h f, linear in the interior unknowns
        let k = Self::coefficients(m);
        let lifted = self.apply_form(&k, &self.with_boundary_values(&vec![F::zero(); self.n - 1]));
        let rhs: Vec<F> = self
            .source
            .iter()
            .zip(lifted.iter())
            .map(|(&f, &b)| self.h * f - b)
            .collect();
        let lu = self.factors(m)?;
        Ok(lu.solve(&rhs))
    }

    fn solve_adjoint(&mut self, _u: &Vec<F>, m: &Vec<F>, rhs: &Vec<F>) -> Result<Vec<F>, SolveError> {
        let lu = self.factors(m)?;
        Ok(lu.solve_transpose(rhs))
    }

    fn solve_incremental_forward(
        &mut self,
        u: &Vec<F>,
        m: &Vec<F>,
        dm: &Vec<F>,
    ) -> Result<Vec<F>, SolveError> {
        let mut rhs = self.apply_coupling(u, m, dm);
        rhs.scale(-F::one());
        let lu = self.factors(m)?;
        Ok(lu.solve(&rhs))
    }

    fn solve_incremental_adjoint(
        &mut self,
        _u: &Vec<F>,
        m: &Vec<F>,
        rhs: &Vec<F>,
    ) -> Result<Vec<F>, SolveError> {
        let lu = self.factors(m)?;
        Ok(lu.solve_transpose(rhs))
    }

    fn apply_coupling(&self, u: &Vec<F>, m: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        let c: Vec<F> = Self::coefficients(m)
            .into_iter()
            .zip(dm.iter())
            .map(|(k, &d)| k * d)
            .collect();
        self.apply_form(&c, &self.with_boundary_values(u))
    }

    fn apply_coupling_transpose(&self, u: &Vec<F>, m: &Vec<F>, p: &Vec<F>) -> Vec<F> {
        self.element_products(
            &Self::coefficients(m),
            &self.with_boundary_values(u),
            &self.with_zero_boundary(p),
        )
    }

    fn apply_uu(&self, u: &Vec<F>, _m: &Vec<F>, _p: &Vec<F>, _du: &Vec<F>) -> Vec<F> {
        u.zeros_like()
    }

    fn apply_um(&self, _u: &Vec<F>, m: &Vec<F>, p: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        let c: Vec<F> = Self::coefficients(m)
            .into_iter()
            .zip(dm.iter())
            .map(|(k, &d)| k * d)
            .collect();
        self.apply_form(&c, &self.with_zero_boundary(p))
    }

    fn apply_mu(&self, _u: &Vec<F>, m: &Vec<F>, p: &Vec<F>, du: &Vec<F>) -> Vec<F> {
        self.element_products(
            &Self::coefficients(m),
            &self.with_zero_boundary(du),
            &self.with_zero_boundary(p),
        )
    }

    fn apply_mm(&self, u: &Vec<F>, m: &Vec<F>, p: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        let mut out = self.element_products(
            &Self::coefficients(m),
            &self.with_boundary_values(u),
            &self.with_zero_boundary(p),
        );
        for (o, &d) in out.iter_mut().zip(dm.iter()) {
            *o = *o * d;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_coefficient_gives_linear_profile() {
        // -(u')' = 0, u(0) = 0, u(1) = 1  =>  u(x) = x at the nodes
        let mut model = Diffusion1d::<f64>::new(8);
        let u = model.solve_forward(&vec![0.0; 8]).unwrap();
        assert_eq!(u.len(), 7);
        for (i, &ui) in u.iter().enumerate() {
            let x = (i + 1) as f64 / 8.0;
            assert!((ui - x).abs() < 1e-12, "u[{}] = {}, expected {}", i, ui, x);
        }
    }

    #[test]
    fn scaled_coefficient_leaves_homogeneous_solution_unchanged() {
        // Without a source, multiplying k by a constant does not change u.
        let mut model = Diffusion1d::<f64>::new(6);
        let u0 = model.solve_forward(&vec![0.0; 6]).unwrap();
        let u1 = model.solve_forward(&vec![1.3; 6]).unwrap();
        for (a, b) in u0.iter().zip(u1.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn small_uniform_coefficient_still_solves() {
        // k = e^-32 scales the stiffness by ~1e-14 without changing u = x
        let mut model = Diffusion1d::<f64>::new(16);
        let u = model.solve_forward(&vec![-32.0; 16]).unwrap();
        for (i, &ui) in u.iter().enumerate() {
            let x = (i + 1) as f64 / 16.0;
            assert!((ui - x).abs() < 1e-10, "u[{}] = {}, expected {}", i, ui, x);
        }
    }

    #[test]
    fn source_term_matches_parabola() {
        // -u'' = 2, u(0) = u(1) = 0  =>  u = x (1 - x); linear FEM is nodally exact
        let mut model = Diffusion1d::<f64>::new(10)
            .with_boundary(0.0, 0.0)
            .with_source(2.0);
        let u = model.solve_forward(&vec![0.0; 10]).unwrap();
        for (i, &ui) in u.iter().enumerate() {
            let x = (i + 1) as f64 / 10.0;
            assert!((ui - x * (1.0 - x)).abs() < 1e-12, "u[{}] = {}", i, ui);
        }
    }

    #[test]
    fn forward_residual_vanishes() {
        let mut model = Diffusion1d::<f64>::new(5).with_source(0.7);
        let m = vec![0.1, -0.4, 0.3, 0.9, -0.2];
        let u = model.solve_forward(&m).unwrap();
        let k = Diffusion1d::<f64>::coefficients(&m);
        let r = model.apply_form(&k, &model.with_boundary_values(&u));
        for (ri, fi) in r.iter().zip(model.source.iter()) {
            assert!((ri - model.h * fi).abs() < 1e-12);
        }
    }

    #[test]
    fn coupling_transpose_is_adjoint_of_coupling() {
        let mut model = Diffusion1d::<f64>::new(5);
        let m = vec![0.2, -0.1, 0.0, 0.5, 0.3];
        let u = model.solve_forward(&m).unwrap();
        let dm = vec![1.0, -0.5, 0.25, 2.0, -1.0];
        let p = vec![0.3, -0.7, 1.1, 0.4];
        let lhs = p.dot(&model.apply_coupling(&u, &m, &dm));
        let rhs = dm.dot(&model.apply_coupling_transpose(&u, &m, &p));
        assert!((lhs - rhs).abs() < 1e-12, "{} vs {}", lhs, rhs);
    }

    #[test]
    fn mixed_second_derivatives_are_transposes() {
        let model = Diffusion1d::<f64>::new(4);
        let m = vec![0.2, -0.3, 0.1, 0.4];
        let u = vec![0.2, 0.5, 0.8];
        let p = vec![1.0, -2.0, 0.5];
        let du = vec![0.3, 0.1, -0.6];
        let dm = vec![0.5, 1.5, -1.0, 0.2];
        let lhs = du.dot(&model.apply_um(&u, &m, &p, &dm));
        let rhs = dm.dot(&model.apply_mu(&u, &m, &p, &du));
        assert!((lhs - rhs).abs() < 1e-12, "{} vs {}", lhs, rhs);
    }

    #[test]
    fn factorization_is_reused_for_same_parameter() {
        let mut model = Diffusion1d::<f64>::new(4);
        let m = vec![0.0, 0.1, 0.2, 0.3];
        let u = model.solve_forward(&m).unwrap();
        let key = model.factors.as_ref().map(|(k, _)| k.clone());
        assert_eq!(key, Some(m.clone()));
        let p = model.solve_adjoint(&u, &m, &vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(model.factors.as_ref().map(|(k, _)| k.clone()), Some(m));
    }

    #[test]
    fn wrong_parameter_length_is_breakdown() {
        let mut model = Diffusion1d::<f64>::new(4);
        let err = model.solve_forward(&vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, SolveError::Breakdown(_)));
    }
}
