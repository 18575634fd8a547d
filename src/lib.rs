//! Reduced quantity-of-interest sensitivities by the adjoint method.
//!
//! A [`PdeProblem`] supplies the forward model `r(u, m) = 0` and its
//! linearisations, a [`Qoi`] supplies the scalar `q(u, m)` and its partial
//! derivatives. [`ReducedQoi`] composes them into the reduced map
//! `m ↦ q(u(m), m)` and provides its gradient (one adjoint solve) and
//! Hessian-vector products (two incremental solves). [`taylor_verify`]
//! checks both against finite differences.

pub mod error;
pub mod float;
pub mod problem;
pub mod qoi;
pub mod reduced;
pub mod vector;
pub mod verify;

#[cfg(feature = "nalgebra")]
pub mod nalgebra_support;
#[cfg(feature = "ndarray")]
pub mod ndarray_support;

pub use error::{IncrementalStage, QoiError, Result, SolveError};
pub use float::Float;
pub use problem::PdeProblem;
pub use qoi::Qoi;
pub use reduced::{ReducedHessian, ReducedQoi};
pub use vector::Vector;
pub use verify::{
    geometric_steps, random_direction, taylor_verify, taylor_verify_with_cancel, CancelToken,
    ErrorNorm, SymmetryCheck, TaylorStep, VerificationReport, VerifyConfig,
};

#[cfg(feature = "parallel")]
pub use verify::parallel::{taylor_verify_par, taylor_verify_par_with_cancel};
