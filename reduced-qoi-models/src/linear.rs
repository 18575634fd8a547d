use reduced_qoi::{Float, PdeProblem, SolveError, Vector};

use crate::linalg::{mat_t_vec, mat_vec};

/// Linear parameter-to-state map `u = A·m`, written as the residual
/// `r(u, m) = u − A·m`.
///
/// The state Jacobian is the identity, so every solve is exact and the
/// reduced Hessian of a quadratic QOI is independent of `m`. Used as the
/// linear-Gaussian reference problem.
#[derive(Debug, Clone)]
pub struct LinearModel<F> {
    a: Vec<Vec<F>>,
    cols: usize,
}

impl<F: Float> LinearModel<F> {
    /// Wrap a row-major `state_dim × param_dim` operator.
    ///
    /// # Panics
    ///
    /// Panics if the rows of `a` have different lengths.
    pub fn new(a: Vec<Vec<F>>) -> Self {
        let cols = a.first().map_or(0, |row| row.len());
        assert!(
            a.iter().all(|row| row.len() == cols),
            "LinearModel operator rows must all have {} columns",
            cols
        );
        LinearModel { a, cols }
    }

    pub fn state_dim(&self) -> usize {
        self.a.len()
    }

    pub fn param_dim(&self) -> usize {
        self.cols
    }

    pub fn operator(&self) -> &[Vec<F>] {
        &self.a
    }

    /// `Aᵀ·A·x`, the Gauss-Newton operator of the model.
    pub fn normal_apply(&self, x: &[F]) -> Vec<F> {
        mat_t_vec(&self.a, &mat_vec(&self.a, x), self.cols)
    }
}

impl<F: Float> PdeProblem<F> for LinearModel<F> {
    type State = Vec<F>;
    type Param = Vec<F>;

    fn solve_forward(&mut self, m: &Vec<F>) -> Result<Vec<F>, SolveError> {
        if m.len() != self.cols {
            return Err(SolveError::Breakdown(format!(
                "expected {} parameters, got {}",
                self.cols,
                m.len()
            )));
        }
        Ok(mat_vec(&self.a, m))
    }

    fn solve_adjoint(&mut self, _u: &Vec<F>, _m: &Vec<F>, rhs: &Vec<F>) -> Result<Vec<F>, SolveError> {
        Ok(rhs.clone())
    }

    fn solve_incremental_forward(
        &mut self,
        u: &Vec<F>,
        m: &Vec<F>,
        dm: &Vec<F>,
    ) -> Result<Vec<F>, SolveError> {
        let mut rhs = self.apply_coupling(u, m, dm);
        rhs.scale(-F::one());
        Ok(rhs)
    }

    fn solve_incremental_adjoint(
        &mut self,
        _u: &Vec<F>,
        _m: &Vec<F>,
        rhs: &Vec<F>,
    ) -> Result<Vec<F>, SolveError> {
        Ok(rhs.clone())
    }

    fn apply_coupling(&self, _u: &Vec<F>, _m: &Vec<F>, dm: &Vec<F>) -> Vec<F> {
        let mut out = mat_vec(&self.a, dm);
        out.scale(-F::one());
        out
    }

    fn apply_coupling_transpose(&self, _u: &Vec<F>, _m: &Vec<F>, p: &Vec<F>) -> Vec<F> {
        let mut out = mat_t_vec(&self.a, p, self.cols);
        out.scale(-F::one());
        out
    }

    fn apply_uu(&self, u: &Vec<F>, _m: &Vec<F>, _p: &Vec<F>, _du: &Vec<F>) -> Vec<F> {
        u.zeros_like()
    }

    fn apply_um(&self, u: &Vec<F>, _m: &Vec<F>, _p: &Vec<F>, _dm: &Vec<F>) -> Vec<F> {
        u.zeros_like()
    }

    fn apply_mu(&self, _u: &Vec<F>, m: &Vec<F>, _p: &Vec<F>, _du: &Vec<F>) -> Vec<F> {
        m.zeros_like()
    }

    fn apply_mm(&self, _u: &Vec<F>, m: &Vec<F>, _p: &Vec<F>, _dm: &Vec<F>) -> Vec<F> {
        m.zeros_like()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearModel<f64> {
        LinearModel::new(vec![vec![1.0, 2.0, 0.0], vec![0.0, -1.0, 3.0]])
    }

    #[test]
    fn forward_is_matvec() {
        let mut model = model();
        assert_eq!(model.state_dim(), 2);
        assert_eq!(model.param_dim(), 3);
        let u = model.solve_forward(&vec![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(u, vec![3.0, 2.0]);
    }

    #[test]
    fn incremental_forward_is_linear_response() {
        let mut model = model();
        let m = vec![0.0, 0.0, 0.0];
        let u = model.solve_forward(&m).unwrap();
        let du = model
            .solve_incremental_forward(&u, &m, &vec![0.0, 1.0, 0.0])
            .unwrap();
        assert_eq!(du, vec![2.0, -1.0]);
    }

    #[test]
    fn coupling_transpose_is_adjoint_of_coupling() {
        let model = model();
        let u = vec![0.0, 0.0];
        let m = vec![0.0, 0.0, 0.0];
        let dm = vec![0.3, -1.2, 0.7];
        let p = vec![1.5, -0.4];
        let lhs = p.dot(&model.apply_coupling(&u, &m, &dm));
        let rhs = dm.dot(&model.apply_coupling_transpose(&u, &m, &p));
        assert!((lhs - rhs).abs() < 1e-14);
    }

    #[test]
    fn wrong_parameter_length_is_breakdown() {
        let mut model = model();
        let err = model.solve_forward(&vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SolveError::Breakdown(_)));
    }

    #[test]
    #[should_panic(expected = "rows must all have")]
    fn ragged_operator_panics() {
        let _ = LinearModel::new(vec![vec![1.0_f64, 2.0], vec![1.0]]);
    }
}
