use std::fmt::Debug;

use crate::float::Float;

/// A vector in a state or parameter space, equipped with an inner product.
///
/// The engine never looks inside a vector: it only clones, combines and
/// measures them through this trait, so any storage the forward model uses
/// can flow through [`ReducedQoi`](crate::ReducedQoi) unchanged.
///
/// `PartialEq` is used to key the evaluation cache on the exact parameter
/// value.
pub trait Vector<F: Float>: Clone + PartialEq + Debug + Send + Sync {
    /// Number of degrees of freedom.
    fn len(&self) -> usize;

    /// Whether the vector has no degrees of freedom.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero vector in the same space as `self`.
    fn zeros_like(&self) -> Self;

    /// Inner product `⟨self, other⟩`.
    fn dot(&self, other: &Self) -> F;

    /// `self ← self + alpha · x`.
    fn axpy(&mut self, alpha: F, x: &Self);

    /// `self ← alpha · self`.
    fn scale(&mut self, alpha: F);

    /// Largest absolute entry.
    fn norm_inf(&self) -> F;

    /// Overwrite every entry with successive values of `g`.
    fn fill_with<G: FnMut() -> F>(&mut self, g: G);

    /// Norm induced by the inner product.
    fn norm(&self) -> F {
        self.dot(self).sqrt()
    }
}

impl<F: Float> Vector<F> for Vec<F> {
    fn len(&self) -> usize {
        <[F]>::len(self)
    }

    fn zeros_like(&self) -> Self {
        vec![F::zero(); <[F]>::len(self)]
    }

    fn dot(&self, other: &Self) -> F {
        debug_assert_eq!(<[F]>::len(self), <[F]>::len(other));
        let mut s = F::zero();
        for (&a, &b) in self.iter().zip(other.iter()) {
            s = s + a * b;
        }
        s
    }

    fn axpy(&mut self, alpha: F, x: &Self) {
        debug_assert_eq!(<[F]>::len(self), <[F]>::len(x));
        for (yi, &xi) in self.iter_mut().zip(x.iter()) {
            *yi = *yi + alpha * xi;
        }
    }

    fn scale(&mut self, alpha: F) {
        for yi in self.iter_mut() {
            *yi = alpha * *yi;
        }
    }

    fn norm_inf(&self) -> F {
        self.iter().fold(F::zero(), |acc, &v| acc.max(v.abs()))
    }

    fn fill_with<G: FnMut() -> F>(&mut self, mut g: G) {
        for yi in self.iter_mut() {
            *yi = g();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_dot_and_norm() {
        let a = vec![3.0_f64, 4.0];
        let b = vec![1.0_f64, -2.0];
        assert!((a.dot(&b) - (-5.0)).abs() < 1e-15);
        assert!((a.norm() - 5.0).abs() < 1e-15);
        assert!((b.norm_inf() - 2.0).abs() < 1e-15);
    }

    #[test]
    fn vec_axpy_scale() {
        let mut y = vec![1.0_f64, 1.0, 1.0];
        y.axpy(2.0, &vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
        y.scale(-1.0);
        assert_eq!(y, vec![-3.0, -5.0, -7.0]);
    }

    #[test]
    fn vec_zeros_like_keeps_length() {
        let v = vec![1.0_f32; 7];
        let z = v.zeros_like();
        assert_eq!(Vector::len(&z), 7);
        assert!(z.iter().all(|&x| x == 0.0));
        assert!(!Vector::is_empty(&z));
    }

    #[test]
    fn vec_fill_with_counter() {
        let mut v = vec![0.0_f64; 4];
        let mut k = 0.0;
        v.fill_with(|| {
            k += 1.0;
            k
        });
        assert_eq!(v, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
