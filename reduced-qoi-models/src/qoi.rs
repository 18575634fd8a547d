//! Quantities of interest for the reference models.

use reduced_qoi::{Float, Qoi, Vector};

use crate::diffusion::Diffusion1d;

/// `q(u, m) = w ⟨u, u⟩`. Works with any state and parameter vector type.
#[derive(Debug, Clone, Copy)]
pub struct StateNormQoi<F> {
    weight: F,
}

impl<F: Float> StateNormQoi<F> {
    pub fn new(weight: F) -> Self {
        StateNormQoi { weight }
    }

    pub fn weight(&self) -> F {
        self.weight
    }

    fn twice_weight(&self) -> F {
        self.weight + self.weight
    }
}

impl<F: Float> Default for StateNormQoi<F> {
    fn default() -> Self {
        StateNormQoi::new(F::one())
    }
}

impl<F, S, M> Qoi<F, S, M> for StateNormQoi<F>
where
    F: Float,
    S: Vector<F>,
    M: Vector<F>,
{
    fn value(&self, u: &S, _m: &M) -> F {
        self.weight * u.dot(u)
    }

    fn gradient_state(&self, u: &S, _m: &M) -> S {
        let mut g = u.clone();
        g.scale(self.twice_weight());
        g
    }

    fn gradient_param(&self, _u: &S, m: &M) -> M {
        m.zeros_like()
    }

    fn apply_uu(&self, _u: &S, _m: &M, du: &S) -> S {
        let mut out = du.clone();
        out.scale(self.twice_weight());
        out
    }

    fn apply_um(&self, u: &S, _m: &M, _dm: &M) -> S {
        u.zeros_like()
    }

    fn apply_mu(&self, _u: &S, m: &M, _du: &S) -> M {
        m.zeros_like()
    }

    fn apply_mm(&self, _u: &S, m: &M, _dm: &M) -> M {
        m.zeros_like()
    }
}

/// Diffusive flux through one element of a [`Diffusion1d`] mesh:
/// `q = e^{m_e} (u_{e+1} − u_e) / h`, boundary values included.
///
/// Depends on both state and parameter, so every block of the QOI Hessian
/// except `q_uu` is non-zero.
#[derive(Debug, Clone)]
pub struct FluxQoi<F> {
    element: usize,
    n: usize,
    h: F,
    left: F,
    right: F,
}

impl<F: Float> FluxQoi<F> {
    /// Flux through `element` of `model`'s mesh.
    ///
    /// # Panics
    ///
    /// Panics if `element` is not an element of the mesh.
    pub fn new(model: &Diffusion1d<F>, element: usize) -> Self {
        let n = model.num_elements();
        assert!(element < n, "element {} out of range for {} elements", element, n);
        let (left, right) = model.boundary();
        FluxQoi {
            element,
            n,
            h: model.h(),
            left,
            right,
        }
    }

    pub fn element(&self) -> usize {
        self.element
    }

    /// Nodal value at full-mesh node `node`, Dirichlet data at the ends.
    fn node(&self, u: &[F], node: usize, with_boundary: bool) -> F {
        if node == 0 {
            if with_boundary {
                self.left
            } else {
                F::zero()
            }
        } else if node == self.n {
            if with_boundary {
                self.right
            } else {
                F::zero()
            }
        } else {
            u[node - 1]
        }
    }

    fn slope(&self, u: &[F], with_boundary: bool) -> F {
        let e = self.element;
        (self.node(u, e + 1, with_boundary) - self.node(u, e, with_boundary)) / self.h
    }

    /// `∂q/∂u` scaled by `factor`.
    fn state_gradient(&self, u: &[F], m: &[F], factor: F) -> Vec<F> {
        let e = self.element;
        let c = factor * m[e].exp() / self.h;
        let mut g = vec![F::zero(); u.len()];
        if e + 1 < self.n {
            g[e] = c;
        }
        if e >= 1 {
            g[e - 1] = -c;
        }
        g
    }

    fn unit(&self, m: &[F], value: F) -> Vec<F> {
        let mut v = vec![F::zero(); m.len()];
        v[self.element] = value;
        v
    }
}

impl<F: Float> Qoi<F, Vec<F>, Vec<F>> for FluxQoi<F> {
    fn value(&self, u: &Vec<F>, m: &Vec<F>) -> F {
        m[self.element].exp() * self.slope(u, true)
    }

    fn gradient_state(&self, u: &Vec<F>, m: &Vec<F>) -> Vec<F> {
        self.state_gradient(u, m, F::one())
    }

    fn gradient_param(&self, u: &Vec<F>, m: &Vec<F>) -> Vec<F> {
        self.unit(m, self.value(u, m))
    }

    fn apply_uu(&self, u: &Vec<F>, _m: &Vec<F>, _du: &Vec<F>) -> Vec<F> {
        u.zeros_like()
    }

    fn apply_um(&self, u: &Vec<F>, m: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        self.state_gradient(u, m, dm[self.element])
    }

    fn apply_mu(&self, _u: &Vec<F>, m: &Vec<F>, du: &Vec<F>) -> Vec<F> {
        self.unit(m, m[self.element].exp() * self.slope(du, false))
    }

    fn apply_mm(&self, u: &Vec<F>, m: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        self.unit(m, dm[self.element] * self.value(u, m))
    }
}

/// Pointwise data misfit `q = Σ_j (u_{i_j} − d_j)² / (2σ²)`.
#[derive(Debug, Clone)]
pub struct ObservationMisfitQoi<F> {
    indices: Vec<usize>,
    data: Vec<F>,
    noise_variance: F,
}

impl<F: Float> ObservationMisfitQoi<F> {
    /// Observe the state entries `indices` against `data` with noise
    /// variance `noise_variance`.
    ///
    /// # Panics
    ///
    /// Panics if `indices` and `data` differ in length or the variance is
    /// not positive. Indices are checked against the state on every
    /// evaluation; an index past the end of `u` panics there with the
    /// offending index.
    pub fn new(indices: Vec<usize>, data: Vec<F>, noise_variance: F) -> Self {
        assert_eq!(
            indices.len(),
            data.len(),
            "one datum per observed index"
        );
        assert!(noise_variance > F::zero(), "noise variance must be positive");
        ObservationMisfitQoi {
            indices,
            data,
            noise_variance,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[F] {
        &self.data
    }

    fn check_state(&self, len: usize) {
        if let Some(&i) = self.indices.iter().find(|&&i| i >= len) {
            panic!("observation index {} out of range for state of length {}", i, len);
        }
    }

    fn scatter(&self, len: usize, values: impl Iterator<Item = F>) -> Vec<F> {
        let mut out = vec![F::zero(); len];
        for (&i, v) in self.indices.iter().zip(values) {
            out[i] = out[i] + v / self.noise_variance;
        }
        out
    }
}

impl<F: Float> Qoi<F, Vec<F>, Vec<F>> for ObservationMisfitQoi<F> {
    fn value(&self, u: &Vec<F>, _m: &Vec<F>) -> F {
        self.check_state(u.len());
        let two = F::one() + F::one();
        let sum = self
            .indices
            .iter()
            .zip(self.data.iter())
            .fold(F::zero(), |acc, (&i, &d)| {
                let r = u[i] - d;
                acc + r * r
            });
        sum / (two * self.noise_variance)
    }

    fn gradient_state(&self, u: &Vec<F>, _m: &Vec<F>) -> Vec<F> {
        self.check_state(u.len());
        let residuals = self
            .indices
            .iter()
            .zip(self.data.iter())
            .map(|(&i, &d)| u[i] - d);
        self.scatter(u.len(), residuals)
    }

    fn gradient_param(&self, _u: &Vec<F>, m: &Vec<F>) -> Vec<F> {
        m.zeros_like()
    }

    fn apply_uu(&self, u: &Vec<F>, _m: &Vec<F>, du: &Vec<F>) -> Vec<F> {
        self.check_state(u.len());
        self.scatter(u.len(), self.indices.iter().map(|&i| du[i]))
    }

    fn apply_um(&self, u: &Vec<F>, _m: &Vec<F>, _dm: &Vec<F>) -> Vec<F> {
        u.zeros_like()
    }

    fn apply_mu(&self, _u: &Vec<F>, m: &Vec<F>, _du: &Vec<F>) -> Vec<F> {
        m.zeros_like()
    }

    fn apply_mm(&self, _u: &Vec<F>, m: &Vec<F>, _dm: &Vec<F>) -> Vec<F> {
        m.zeros_like()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_norm_derivatives() {
        let q = StateNormQoi::new(0.5_f64);
        let u = vec![1.0, -2.0];
        let m = vec![3.0];
        assert_eq!(q.value(&u, &m), 2.5);
        assert_eq!(q.gradient_state(&u, &m), vec![1.0, -2.0]);
        assert_eq!(q.gradient_param(&u, &m), vec![0.0]);
        assert_eq!(q.apply_uu(&u, &m, &vec![4.0, 1.0]), vec![4.0, 1.0]);
    }

    #[test]
    fn flux_state_gradient_matches_difference() {
        let model = Diffusion1d::<f64>::new(4);
        let q = FluxQoi::new(&model, 2);
        let u = vec![0.2, 0.45, 0.8];
        let m = vec![0.1, -0.2, 0.3, 0.0];
        let g = q.gradient_state(&u, &m);
        let du = vec![0.3, -0.5, 0.7];
        let eps = 1e-7;
        let mut up = u.clone();
        up.axpy(eps, &du);
        let fd = (q.value(&up, &m) - q.value(&u, &m)) / eps;
        assert!((fd - g.dot(&du)).abs() < 1e-6, "{} vs {}", fd, g.dot(&du));
    }

    #[test]
    fn flux_on_boundary_elements() {
        let model = Diffusion1d::<f64>::new(3);
        let u = vec![1.0 / 3.0, 2.0 / 3.0];
        let m = vec![0.0; 3];
        // u(x) = x has unit flux everywhere
        for e in 0..3 {
            let q = FluxQoi::new(&model, e);
            assert!((q.value(&u, &m) - 1.0).abs() < 1e-12);
        }
        let first = FluxQoi::new(&model, 0).gradient_state(&u, &m);
        assert_eq!(first, vec![3.0, 0.0]);
        let last = FluxQoi::new(&model, 2).gradient_state(&u, &m);
        assert_eq!(last, vec![0.0, -3.0]);
    }

    #[test]
    fn flux_mixed_blocks_agree() {
        let model = Diffusion1d::<f64>::new(4);
        let q = FluxQoi::new(&model, 1);
        let u = vec![0.2, 0.5, 0.9];
        let m = vec![0.3, -0.4, 0.2, 0.1];
        let du = vec![1.0, -0.5, 0.25];
        let dm = vec![0.7, 1.3, -0.2, 0.4];
        let lhs = du.dot(&q.apply_um(&u, &m, &dm));
        let rhs = dm.dot(&q.apply_mu(&u, &m, &du));
        assert!((lhs - rhs).abs() < 1e-12);
    }

    #[test]
    fn misfit_value_and_gradient() {
        let q = ObservationMisfitQoi::new(vec![0, 2], vec![1.0_f64, -1.0], 0.5);
        let u = vec![2.0, 7.0, 0.0];
        let m = vec![0.0];
        // ((2-1)^2 + (0+1)^2) / (2 * 0.5)
        assert!((q.value(&u, &m) - 2.0).abs() < 1e-15);
        assert_eq!(q.gradient_state(&u, &m), vec![2.0, 0.0, 2.0]);
        assert_eq!(q.apply_uu(&u, &m, &vec![1.0, 1.0, 1.0]), vec![2.0, 0.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "observation index 5 out of range for state of length 3")]
    fn misfit_reports_index_past_state() {
        let q = ObservationMisfitQoi::new(vec![0, 5], vec![1.0_f64, 2.0], 1.0);
        let _ = q.value(&vec![0.0; 3], &vec![0.0]);
    }

    #[test]
    #[should_panic(expected = "one datum per observed index")]
    fn misfit_rejects_mismatched_data() {
        let _ = ObservationMisfitQoi::new(vec![0, 1], vec![1.0_f64], 1.0);
    }
}
