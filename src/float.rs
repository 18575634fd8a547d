use std::fmt::{Debug, Display, LowerExp};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

/// Marker trait for the scalar field of parameter and state vectors (`f32`, `f64`).
///
/// Bundles the numeric and utility traits the reduced-QOI engine and the
/// Taylor verifier need: arithmetic, conversion from `f64` step sizes and
/// random draws, and thread-safety for parallel sweeps.
pub trait Float:
    NumFloat
    + FloatConst
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + LowerExp
    + 'static
{
    /// Convert an `f64` constant, falling back to zero when it is not representable.
    fn from_f64_or_zero(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).unwrap_or_else(Self::zero)
    }
}

impl Float for f32 {}
impl Float for f64 {}
