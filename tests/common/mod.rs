//! Small nonlinear model shared by the integration tests.
//!
//! Residual `r_i(u, m) = u_i + u_i³ − (B m)_i`, solved row by row with
//! Newton's method, and the QOI `q = ½‖u‖² + u_0 m_0 + m_1³ / 3`. Every
//! block of the Lagrangian Hessian that can be non-zero for this pair is.

#![allow(dead_code)]

use reduced_qoi::{PdeProblem, Qoi, SolveError};

/// Which solve the model should refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAt {
    #[default]
    Nothing,
    Adjoint,
    IncrementalForward,
    IncrementalAdjoint,
}

#[derive(Debug, Clone)]
pub struct CubicModel {
    pub b: Vec<Vec<f64>>,
    pub fail_at: FailAt,
}

impl CubicModel {
    pub fn new(b: Vec<Vec<f64>>) -> Self {
        CubicModel {
            b,
            fail_at: FailAt::Nothing,
        }
    }

    /// Three states, two parameters.
    pub fn standard() -> Self {
        CubicModel::new(vec![
            vec![1.0, 0.5],
            vec![-0.5, 2.0],
            vec![0.3, -1.0],
        ])
    }

    /// Residual independent of `m`.
    pub fn uncoupled() -> Self {
        CubicModel::new(vec![vec![0.0, 0.0]; 3])
    }

    fn forcing(&self, m: &[f64]) -> Vec<f64> {
        self.b
            .iter()
            .map(|row| row.iter().zip(m).map(|(a, x)| a * x).sum())
            .collect()
    }

    fn jacobian_diag(u: &[f64]) -> Vec<f64> {
        u.iter().map(|ui| 1.0 + 3.0 * ui * ui).collect()
    }

    fn refuse(&self, stage: FailAt) -> Result<(), SolveError> {
        if self.fail_at == stage {
            Err(SolveError::Breakdown(format!("{:?} refused", stage)))
        } else {
            Ok(())
        }
    }
}

impl PdeProblem<f64> for CubicModel {
    type State = Vec<f64>;
    type Param = Vec<f64>;

    fn solve_forward(&mut self, m: &Vec<f64>) -> Result<Vec<f64>, SolveError> {
        let f = self.forcing(m);
        let mut u = vec![0.0; f.len()];
        for iteration in 1..=60 {
            let r: Vec<f64> = u
                .iter()
                .zip(f.iter())
                .map(|(ui, fi)| ui + ui * ui * ui - fi)
                .collect();
            let residual = if r.iter().all(|v| v.is_finite()) {
                r.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
            } else {
                f64::NAN
            };
            if residual < 1e-14 {
                return Ok(u);
            }
            if residual.is_nan() || iteration == 60 {
                return Err(SolveError::NotConverged {
                    iterations: iteration,
                    residual,
                });
            }
            let j = Self::jacobian_diag(&u);
            for ((ui, ri), ji) in u.iter_mut().zip(r.iter()).zip(j.iter()) {
                *ui -= ri / ji;
            }
        }
        unreachable!()
    }

    fn solve_adjoint(
        &mut self,
        u: &Vec<f64>,
        _m: &Vec<f64>,
        rhs: &Vec<f64>,
    ) -> Result<Vec<f64>, SolveError> {
        self.refuse(FailAt::Adjoint)?;
        Ok(rhs.iter().zip(Self::jacobian_diag(u)).map(|(r, j)| r / j).collect())
    }

    fn solve_incremental_forward(
        &mut self,
        u: &Vec<f64>,
        m: &Vec<f64>,
        dm: &Vec<f64>,
    ) -> Result<Vec<f64>, SolveError> {
        self.refuse(FailAt::IncrementalForward)?;
        let rhs = self.apply_coupling(u, m, dm);
        Ok(rhs.iter().zip(Self::jacobian_diag(u)).map(|(r, j)| -r / j).collect())
    }

    fn solve_incremental_adjoint(
        &mut self,
        u: &Vec<f64>,
        _m: &Vec<f64>,
        rhs: &Vec<f64>,
    ) -> Result<Vec<f64>, SolveError> {
        self.refuse(FailAt::IncrementalAdjoint)?;
        Ok(rhs.iter().zip(Self::jacobian_diag(u)).map(|(r, j)| r / j).collect())
    }

    fn apply_coupling(&self, _u: &Vec<f64>, _m: &Vec<f64>, dm: &Vec<f64>) -> Vec<f64> {
        self.forcing(dm).into_iter().map(|v| -v).collect()
    }

    fn apply_coupling_transpose(&self, _u: &Vec<f64>, m: &Vec<f64>, p: &Vec<f64>) -> Vec<f64> {
        let mut out = vec![0.0; m.len()];
        for (row, pi) in self.b.iter().zip(p.iter()) {
            for (o, a) in out.iter_mut().zip(row.iter()) {
                *o -= a * pi;
            }
        }
        out
    }

    fn apply_uu(&self, u: &Vec<f64>, _m: &Vec<f64>, p: &Vec<f64>, du: &Vec<f64>) -> Vec<f64> {
        u.iter()
            .zip(p.iter())
            .zip(du.iter())
            .map(|((ui, pi), di)| 6.0 * ui * pi * di)
            .collect()
    }

    fn apply_um(&self, u: &Vec<f64>, _m: &Vec<f64>, _p: &Vec<f64>, _dm: &Vec<f64>) -> Vec<f64> {
        vec![0.0; u.len()]
    }

    fn apply_mu(&self, _u: &Vec<f64>, m: &Vec<f64>, _p: &Vec<f64>, _du: &Vec<f64>) -> Vec<f64> {
        vec![0.0; m.len()]
    }

    fn apply_mm(&self, _u: &Vec<f64>, m: &Vec<f64>, _p: &Vec<f64>, _dm: &Vec<f64>) -> Vec<f64> {
        vec![0.0; m.len()]
    }
}

/// `q = ½‖u‖² + u_0 m_0 + m_1³ / 3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedQoi;

impl Qoi<f64, Vec<f64>, Vec<f64>> for MixedQoi {
    fn value(&self, u: &Vec<f64>, m: &Vec<f64>) -> f64 {
        0.5 * u.iter().map(|v| v * v).sum::<f64>() + u[0] * m[0] + m[1].powi(3) / 3.0
    }

    fn gradient_state(&self, u: &Vec<f64>, m: &Vec<f64>) -> Vec<f64> {
        let mut g = u.clone();
        g[0] += m[0];
        g
    }

    fn gradient_param(&self, u: &Vec<f64>, m: &Vec<f64>) -> Vec<f64> {
        vec![u[0], m[1] * m[1]]
    }

    fn apply_uu(&self, _u: &Vec<f64>, _m: &Vec<f64>, du: &Vec<f64>) -> Vec<f64> {
        du.clone()
    }

    fn apply_um(&self, u: &Vec<f64>, _m: &Vec<f64>, dm: &Vec<f64>) -> Vec<f64> {
        let mut out = vec![0.0; u.len()];
        out[0] = dm[0];
        out
    }

    fn apply_mu(&self, _u: &Vec<f64>, _m: &Vec<f64>, du: &Vec<f64>) -> Vec<f64> {
        vec![du[0], 0.0]
    }

    fn apply_mm(&self, _u: &Vec<f64>, m: &Vec<f64>, dm: &Vec<f64>) -> Vec<f64> {
        vec![0.0, 2.0 * m[1] * dm[1]]
    }
}

/// Central finite-difference gradient of `f` at `m`.
pub fn central_difference<G: FnMut(&Vec<f64>) -> f64>(mut f: G, m: &[f64], h: f64) -> Vec<f64> {
    (0..m.len())
        .map(|k| {
            let mut mp = m.to_vec();
            let mut mm = m.to_vec();
            mp[k] += h;
            mm[k] -= h;
            (f(&mp) - f(&mm)) / (2.0 * h)
        })
        .collect()
}
