//! Core interval types for sound ReLU relaxation.
//!
//! This crate provides the value types exchanged between a backward
//! bound-propagation engine and the ReLU relaxation kernels, together with
//! the directed-rounding arithmetic ([`rounding`]) the kernels are built on.
//!
//! All quantities are single precision. Interval endpoints are always kept
//! in the order `inf <= sup`; constructors assert this in debug builds and the
//! `try_new` variants report it as a [`RelaxError`].

pub mod rounding;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Concrete pre-activation interval of one neuron: `[lb, ub]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteBound {
    pub lb: f32,
    pub ub: f32,
}

impl ConcreteBound {
    /// Create a new bound.
    #[inline]
    pub fn new(lb: f32, ub: f32) -> Self {
        debug_assert!(lb <= ub, "Invalid bound: {lb} > {ub}");
        Self { lb, ub }
    }

    /// Create a bound, rejecting reversed or non-finite endpoints.
    pub fn try_new(lb: f32, ub: f32) -> Result<Self> {
        if !lb.is_finite() || !ub.is_finite() || lb > ub {
            return Err(RelaxError::InvalidBound { lb, ub });
        }
        Ok(Self { lb, ub })
    }

    /// Create a concrete (point) bound.
    #[inline]
    pub fn point(value: f32) -> Self {
        Self {
            lb: value,
            ub: value,
        }
    }

    /// Check if this bound contains a value.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        self.lb <= value && value <= self.ub
    }

    /// Width of the interval (round-to-nearest; not for sound arithmetic).
    #[inline]
    pub fn width(&self) -> f32 {
        self.ub - self.lb
    }

    /// The ReLU over this interval is identically zero.
    #[inline]
    pub fn is_inactive(&self) -> bool {
        self.ub <= 0.0
    }

    /// The ReLU over this interval is the identity.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.lb > 0.0
    }

    /// Neither inactive nor active: the interval straddles zero.
    #[inline]
    pub fn is_unstable(&self) -> bool {
        !self.is_inactive() && !self.is_active()
    }

    fn validate(&self) -> Result<()> {
        Self::try_new(self.lb, self.ub).map(|_| ())
    }
}

impl From<std::ops::RangeInclusive<f32>> for ConcreteBound {
    fn from(range: std::ops::RangeInclusive<f32>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Sound interval of one linear coefficient of a symbolic affine expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientInterval {
    pub inf: f32,
    pub sup: f32,
}

impl CoefficientInterval {
    /// Create a new coefficient interval.
    #[inline]
    pub fn new(inf: f32, sup: f32) -> Self {
        debug_assert!(inf <= sup, "Invalid coefficient: {inf} > {sup}");
        Self { inf, sup }
    }

    /// Create a coefficient interval, rejecting reversed or non-finite endpoints.
    pub fn try_new(inf: f32, sup: f32) -> Result<Self> {
        if !inf.is_finite() || !sup.is_finite() || inf > sup {
            return Err(RelaxError::InvalidCoefficient { inf, sup });
        }
        Ok(Self { inf, sup })
    }

    #[inline]
    pub fn zero() -> Self {
        Self { inf: 0.0, sup: 0.0 }
    }

    #[inline]
    pub fn point(value: f32) -> Self {
        Self {
            inf: value,
            sup: value,
        }
    }

    /// Both endpoints are exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.inf == 0.0 && self.sup == 0.0
    }

    /// Every coefficient in the interval is strictly negative.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.sup < 0.0
    }

    /// Every coefficient in the interval is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.inf > 0.0
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        self.inf <= value && value <= self.sup
    }

    fn validate(&self) -> Result<()> {
        Self::try_new(self.inf, self.sup).map(|_| ())
    }
}

impl Default for CoefficientInterval {
    fn default() -> Self {
        Self::zero()
    }
}

/// A constant contribution that a relaxation folds into an accumulator.
///
/// `lo` is added to the lower field (rounded down) and `hi` to the upper field
/// (rounded up). The two are not required to be ordered: a straddling
/// fallback may fold the same endpoint into both fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantDelta {
    pub lo: f32,
    pub hi: f32,
}

impl ConstantDelta {
    #[inline]
    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    /// Same value folded into both accumulator fields.
    #[inline]
    pub fn both(value: f32) -> Self {
        Self {
            lo: value,
            hi: value,
        }
    }
}

/// Running sound interval for the constant term of one expression.
///
/// Shared by every coefficient of the expression. Updates only ever add:
/// the lower field with round-down, the upper field with round-up addition,
/// so the accumulated interval never understates the exact sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstantAccumulator {
    pub inf: f32,
    pub sup: f32,
}

impl ConstantAccumulator {
    #[inline]
    pub fn new(inf: f32, sup: f32) -> Self {
        debug_assert!(inf <= sup, "Invalid constant: {inf} > {sup}");
        Self { inf, sup }
    }

    /// Create an accumulator, rejecting reversed or non-finite endpoints.
    pub fn try_new(inf: f32, sup: f32) -> Result<Self> {
        if !inf.is_finite() || !sup.is_finite() || inf > sup {
            return Err(RelaxError::InvalidConstant { inf, sup });
        }
        Ok(Self { inf, sup })
    }

    /// Fold one constant contribution into the accumulator.
    #[inline]
    pub fn fold(&mut self, delta: ConstantDelta) {
        self.inf = rounding::add_rd(self.inf, delta.lo);
        self.sup = rounding::add_ru(self.sup, delta.hi);
    }

    /// Sound sum of two accumulators.
    ///
    /// Used to reduce private per-worker accumulators of one expression.
    #[inline]
    pub fn merge(&self, other: &ConstantAccumulator) -> ConstantAccumulator {
        ConstantAccumulator {
            inf: rounding::add_rd(self.inf, other.inf),
            sup: rounding::add_ru(self.sup, other.sup),
        }
    }

    /// Reduce partial accumulators in iteration order.
    ///
    /// The order is part of the result: sound additions commute only up to
    /// tightness, so callers wanting reproducible output must pass partials
    /// in a fixed order.
    pub fn reduce<'a, I>(partials: I) -> ConstantAccumulator
    where
        I: IntoIterator<Item = &'a ConstantAccumulator>,
    {
        partials
            .into_iter()
            .fold(ConstantAccumulator::default(), |acc, p| acc.merge(p))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.sup - self.inf
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        self.inf <= value && value <= self.sup
    }
}

/// Validate a slice of bounds, returning the first offending one.
pub fn validate_bounds(bounds: &[ConcreteBound]) -> Result<()> {
    bounds.iter().try_for_each(ConcreteBound::validate)
}

/// Validate a slice of coefficient intervals, returning the first offending one.
pub fn validate_coefficients(coeffs: &[CoefficientInterval]) -> Result<()> {
    coeffs.iter().try_for_each(CoefficientInterval::validate)
}

/// Error types for boundary validation.
///
/// The relaxation kernels themselves are total over valid input and never
/// fail; these errors are reported where data enters from a caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelaxError {
    #[error("Invalid concrete bound: [{lb}, {ub}]")]
    InvalidBound { lb: f32, ub: f32 },

    #[error("Invalid coefficient interval: [{inf}, {sup}]")]
    InvalidCoefficient { inf: f32, sup: f32 },

    #[error("Invalid constant interval: [{inf}, {sup}]")]
    InvalidConstant { inf: f32, sup: f32 },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelaxError {
    /// Create a ShapeMismatch error, panicking if shapes are identical (bug indicator).
    #[track_caller]
    pub fn shape_mismatch(expected: Vec<usize>, got: Vec<usize>) -> Self {
        if expected == got {
            let loc = std::panic::Location::caller();
            panic!(
                "BUG at {}:{}:{}: ShapeMismatch created with identical shapes: {:?}.",
                loc.file(),
                loc.line(),
                loc.column(),
                expected
            );
        }
        RelaxError::ShapeMismatch { expected, got }
    }
}

pub type Result<T> = std::result::Result<T, RelaxError>;
