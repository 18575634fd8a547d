//! ndarray adapters: [`Vector`] for `Array1<F>`.
//!
//! Lets forward models that store states and parameters as `Array1` plug
//! into [`ReducedQoi`](crate::ReducedQoi) and the Taylor verifier directly.

use ndarray::{Array1, Zip};

use crate::float::Float;
use crate::vector::Vector;

impl<F: Float> Vector<F> for Array1<F> {
    fn len(&self) -> usize {
        self.dim()
    }

    fn zeros_like(&self) -> Self {
        Array1::from_elem(self.dim(), F::zero())
    }

    fn dot(&self, other: &Self) -> F {
        debug_assert_eq!(self.dim(), other.dim());
        let mut s = F::zero();
        Zip::from(self).and(other).for_each(|&a, &b| s = s + a * b);
        s
    }

    fn axpy(&mut self, alpha: F, x: &Self) {
        debug_assert_eq!(self.dim(), x.dim());
        Zip::from(self).and(x).for_each(|y, &xi| *y = *y + alpha * xi);
    }

    fn scale(&mut self, alpha: F) {
        self.mapv_inplace(|v| alpha * v);
    }

    fn norm_inf(&self) -> F {
        self.iter().fold(F::zero(), |acc, &v| acc.max(v.abs()))
    }

    fn fill_with<G: FnMut() -> F>(&mut self, mut g: G) {
        for v in self.iter_mut() {
            *v = g();
        }
    }
}
