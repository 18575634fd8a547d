use num_traits::Float;

/// Result of LU factorization with partial pivoting.
///
/// Stores the combined L/U factors in a single matrix (L below diagonal,
/// U on and above diagonal) plus the row permutation, so that `P·A = L·U`.
/// One factorization serves both `A x = b` and `Aᵀ x = b`.
#[derive(Debug, Clone)]
pub struct LuFactors<F> {
    lu: Vec<Vec<F>>,
    /// `perm[i]` is the original row index for factored row `i`.
    perm: Vec<usize>,
    n: usize,
}

/// Factorize an `n x n` matrix via LU decomposition with partial pivoting.
///
/// Returns `None` if the matrix is singular: a pivot at or below
/// `n · ε · max|a_ij|`, or a non-finite entry. The threshold scales with the
/// matrix, so uniformly small but well-conditioned operators still factor.
// Explicit indexing is clearer for pivoted LU: row/col indices drive pivot search and elimination
#[allow(clippy::needless_range_loop)]
pub fn lu_factor<F: Float>(a: &[Vec<F>]) -> Option<LuFactors<F>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let mut lu: Vec<Vec<F>> = a.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();

    if a.iter().flatten().any(|v| !v.is_finite()) {
        return None;
    }
    let scale = a
        .iter()
        .flatten()
        .fold(F::zero(), |acc, &v| acc.max(v.abs()));
    if n > 0 && scale == F::zero() {
        return None;
    }
    let eps = F::from(n).unwrap_or_else(F::one) * F::epsilon() * scale;

    for col in 0..n {
        let mut max_val = lu[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let v = lu[row][col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if max_val <= eps {
            return None;
        }

        if max_row != col {
            lu.swap(col, max_row);
            perm.swap(col, max_row);
        }

        let pivot = lu[col][col];

        for row in (col + 1)..n {
            let factor = lu[row][col] / pivot;
            lu[row][col] = factor;
            for j in (col + 1)..n {
                let val = lu[col][j];
                lu[row][j] = lu[row][j] - factor * val;
            }
        }
    }

    Some(LuFactors { lu, perm, n })
}

impl<F: Float> LuFactors<F> {
    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `A x = b`.
    #[allow(clippy::needless_range_loop)]
    pub fn solve(&self, b: &[F]) -> Vec<F> {
        let n = self.n;
        debug_assert_eq!(b.len(), n);

        let mut y = vec![F::zero(); n];
        for i in 0..n {
            y[i] = b[self.perm[i]];
        }

        // L y' = P b, L has unit diagonal
        for i in 1..n {
            for j in 0..i {
                let l_ij = self.lu[i][j];
                let y_j = y[j];
                y[i] = y[i] - l_ij * y_j;
            }
        }

        // U x = y'
        let mut x = vec![F::zero(); n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum = sum - self.lu[i][j] * x[j];
            }
            x[i] = sum / self.lu[i][i];
        }

        x
    }

    /// Solve `Aᵀ x = b` with the same factors: `Uᵀ z = b`, `Lᵀ y = z`,
    /// then undo the row permutation.
    #[allow(clippy::needless_range_loop)]
    pub fn solve_transpose(&self, b: &[F]) -> Vec<F> {
        let n = self.n;
        debug_assert_eq!(b.len(), n);

        let mut z = vec![F::zero(); n];
        for i in 0..n {
            let mut sum = b[i];
            for j in 0..i {
                sum = sum - self.lu[j][i] * z[j];
            }
            z[i] = sum / self.lu[i][i];
        }

        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let l_ji = self.lu[j][i];
                let z_j = z[j];
                z[i] = z[i] - l_ji * z_j;
            }
        }

        let mut x = vec![F::zero(); n];
        for i in 0..n {
            x[self.perm[i]] = z[i];
        }
        x
    }
}

#[cfg(test)]
fn lu_solve<F: Float>(a: &[Vec<F>], b: &[F]) -> Option<Vec<F>> {
    let factors = lu_factor(a)?;
    Some(factors.solve(b))
}

/// `A · x` for a row-major `A`.
pub fn mat_vec<F: Float>(a: &[Vec<F>], x: &[F]) -> Vec<F> {
    a.iter()
        .map(|row| {
            debug_assert_eq!(row.len(), x.len());
            row.iter()
                .zip(x.iter())
                .fold(F::zero(), |acc, (&aij, &xj)| acc + aij * xj)
        })
        .collect()
}

/// `Aᵀ · y` for a row-major `A` with `cols` columns.
pub fn mat_t_vec<F: Float>(a: &[Vec<F>], y: &[F], cols: usize) -> Vec<F> {
    debug_assert_eq!(a.len(), y.len());
    let mut out = vec![F::zero(); cols];
    for (row, &yi) in a.iter().zip(y.iter()) {
        for (o, &aij) in out.iter_mut().zip(row.iter()) {
            *o = *o + aij * yi;
        }
    }
    out
}
