//! Unit and property tests for ReLU relaxation.

use crate::*;

mod relu;

/// Lower bound the relaxed term `coeff * x + acc` guarantees at `x`, in f64.
///
/// Products of two f32 are exact in f64, so only the final sum rounds.
pub(crate) fn lower_at(coeff: CoefficientInterval, acc: ConstantAccumulator, x: f32) -> f64 {
    let x = x as f64;
    (coeff.inf as f64 * x).min(coeff.sup as f64 * x) + acc.inf as f64
}

/// Upper bound the relaxed term `coeff * x + acc` guarantees at `x`, in f64.
pub(crate) fn upper_at(coeff: CoefficientInterval, acc: ConstantAccumulator, x: f32) -> f64 {
    let x = x as f64;
    (coeff.inf as f64 * x).max(coeff.sup as f64 * x) + acc.sup as f64
}

/// `c * relu(x)`, exact in f64.
pub(crate) fn scaled_relu(c: f32, x: f32) -> f64 {
    c as f64 * (x.max(0.0) as f64)
}
