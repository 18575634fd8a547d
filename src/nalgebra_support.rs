//! nalgebra adapters: [`Vector`] for `DVector<F>`.

use nalgebra::DVector;

use crate::float::Float;
use crate::vector::Vector;

impl<F: Float> Vector<F> for DVector<F> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn zeros_like(&self) -> Self {
        DVector::from_element(self.nrows(), F::zero())
    }

    fn dot(&self, other: &Self) -> F {
        debug_assert_eq!(self.nrows(), other.nrows());
        let mut s = F::zero();
        for (&a, &b) in self.iter().zip(other.iter()) {
            s = s + a * b;
        }
        s
    }

    fn axpy(&mut self, alpha: F, x: &Self) {
        debug_assert_eq!(self.nrows(), x.nrows());
        for (y, &xi) in self.iter_mut().zip(x.iter()) {
            *y = *y + alpha * xi;
        }
    }

    fn scale(&mut self, alpha: F) {
        for y in self.iter_mut() {
            *y = alpha * *y;
        }
    }

    fn norm_inf(&self) -> F {
        self.iter().fold(F::zero(), |acc, &v| acc.max(v.abs()))
    }

    fn fill_with<G: FnMut() -> F>(&mut self, mut g: G) {
        for y in self.iter_mut() {
            *y = g();
        }
    }
}
