//! Reference forward models and quantities of interest for `reduced-qoi`.
//!
//! - [`LinearModel`]: `u = A m`, the linear-Gaussian reference case.
//! - [`Diffusion1d`]: `-(e^m u')' = f` with piecewise-linear elements.
//! - [`StateNormQoi`], [`FluxQoi`], [`ObservationMisfitQoi`].

pub mod diffusion;
pub mod linalg;
pub mod linear;
pub mod qoi;

pub use diffusion::Diffusion1d;
pub use linear::LinearModel;
pub use qoi::{FluxQoi, ObservationMisfitQoi, StateNormQoi};
