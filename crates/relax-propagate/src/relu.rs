//! Sound ReLU relaxation of backward-propagated coefficients.
//!
//! During backward substitution every neuron of a ReLU layer carries, in the
//! expression being pushed through it, an interval coefficient `[c_inf, c_sup]`.
//! Replacing `c * relu(x)` by an affine function of `x` must keep the
//! expression a sound lower (resp. upper) bound for every `x` in the neuron's
//! pre-activation interval `[lb, ub]`. Cases, in order:
//!
//! | condition | lower side | upper side |
//! |---|---|---|
//! | `c == [0, 0]` | zero | zero |
//! | `ub <= 0` | zero | zero |
//! | `lb > 0` | keep | keep |
//! | `c_sup < 0` | triangle chord | keep or zero (area heuristic) |
//! | `c_inf > 0` | keep or zero (area heuristic) | triangle chord |
//! | otherwise | zero, fold `c * [0, ub]` lower end | zero, fold `c * [0, ub]` upper end |
//!
//! The triangle chord is `relu(x) <= lambda * x + mu` with
//! `lambda = ub / (ub - lb)` and `mu = -lambda * lb`; it binds from below when
//! the coefficient is negative and from above when it is positive. Both
//! `lambda` and `mu` are enclosed in intervals with directed rounding so the
//! chord stays sound under floating-point error.
//!
//! The kernels are pure: [`relax_lower`] and [`relax_upper`] return a
//! [`RelaxOutcome`]; [`relax_lower_in_place`] and [`relax_upper_in_place`]
//! apply it to caller-owned buffers.

use crate::types::{BoundSide, RelaxCase};
use relax_core::rounding::{
    add_rd, add_ru, div_rd, div_ru, interval_mul, interval_mul_cst_coeff,
    interval_mul_expr_coeff, mul_rd, mul_ru, MIN_DENORMAL,
};
use relax_core::{CoefficientInterval, ConcreteBound, ConstantAccumulator, ConstantDelta};

/// Result of relaxing one coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxOutcome {
    /// Branch that produced this outcome.
    pub case: RelaxCase,
    /// Replacement coefficient.
    pub coeff: CoefficientInterval,
    /// Constant contribution to fold into the expression's accumulator.
    pub delta: Option<ConstantDelta>,
}

impl RelaxOutcome {
    #[inline]
    fn zeroed(case: RelaxCase) -> Self {
        Self {
            case,
            coeff: CoefficientInterval::zero(),
            delta: None,
        }
    }

    #[inline]
    fn kept(case: RelaxCase, coeff: CoefficientInterval) -> Self {
        Self {
            case,
            coeff,
            delta: None,
        }
    }

    /// Write the coefficient and fold the constant contribution.
    #[inline]
    pub fn apply(&self, coeff: &mut CoefficientInterval, acc: &mut ConstantAccumulator) {
        *coeff = self.coeff;
        if let Some(delta) = self.delta {
            acc.fold(delta);
        }
    }
}

/// Enclosure of the triangle chord `relu(x) <= lambda * x + mu` over a
/// straddling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleChord {
    pub lambda_inf: f32,
    pub lambda_sup: f32,
    pub mu_inf: f32,
    pub mu_sup: f32,
}

impl TriangleChord {
    /// Enclose slope and offset for `lb <= 0 < ub`.
    ///
    /// Each slope endpoint divides by the width rounded the opposite way, so
    /// `lambda_inf <= ub / (ub - lb) <= lambda_sup` holds exactly.
    #[inline]
    pub fn new(bound: ConcreteBound) -> Self {
        let ConcreteBound { lb, ub } = bound;
        debug_assert!(lb <= 0.0 && ub > 0.0, "Chord needs lb <= 0 < ub, got [{lb}, {ub}]");

        let width_inf = add_rd(ub, -lb);
        let width_sup = add_ru(ub, -lb);
        let lambda_inf = div_rd(ub, width_sup);
        let lambda_sup = div_ru(ub, width_inf);

        // -lb >= 0, so -lambda * lb grows with lambda.
        let mu_inf = -mul_ru(lambda_inf, lb);
        let mu_sup = -mul_rd(lambda_sup, lb);

        Self {
            lambda_inf,
            lambda_sup,
            mu_inf,
            mu_sup,
        }
    }
}

/// Area heuristic: keep the coefficient (identity relaxation) unless the
/// region admitted by zeroing it is strictly smaller.
#[inline]
fn prefer_pass_through(bound: ConcreteBound) -> bool {
    let ConcreteBound { lb, ub } = bound;
    let width_sup = add_ru(ub, -lb);
    let area_zero = 0.5 * ub * width_sup;
    let area_identity = -0.5 * lb * width_sup;
    !(area_zero < area_identity)
}

/// Relax one coefficient for the given side.
pub fn relax(
    side: BoundSide,
    coeff: CoefficientInterval,
    bound: ConcreteBound,
    use_area_heuristic: bool,
) -> RelaxOutcome {
    debug_assert!(bound.lb <= bound.ub, "Invalid bound: {bound:?}");
    debug_assert!(coeff.inf <= coeff.sup, "Invalid coefficient: {coeff:?}");

    if coeff.is_zero() {
        return RelaxOutcome::zeroed(RelaxCase::ZeroCoefficient);
    }
    if bound.is_inactive() {
        return RelaxOutcome::zeroed(RelaxCase::Inactive);
    }
    if bound.is_active() {
        return RelaxOutcome::kept(RelaxCase::Active, coeff);
    }

    let (chord_binds, either_sound) = match side {
        BoundSide::Lower => (coeff.is_negative(), coeff.is_positive()),
        BoundSide::Upper => (coeff.is_positive(), coeff.is_negative()),
    };

    let outcome = if chord_binds {
        let chord = TriangleChord::new(bound);
        let (inf, sup) =
            interval_mul_expr_coeff(chord.lambda_inf, chord.lambda_sup, coeff.inf, coeff.sup);
        let (tmp1, tmp2) =
            interval_mul_cst_coeff(chord.mu_inf, chord.mu_sup, coeff.inf, coeff.sup);
        RelaxOutcome {
            case: RelaxCase::Triangle,
            coeff: CoefficientInterval::new(inf, sup),
            delta: Some(ConstantDelta::new(
                add_rd(tmp1, -MIN_DENORMAL),
                add_ru(tmp2, MIN_DENORMAL),
            )),
        }
    } else if either_sound {
        if use_area_heuristic && prefer_pass_through(bound) {
            RelaxOutcome::kept(RelaxCase::AreaPassThrough, coeff)
        } else {
            RelaxOutcome::zeroed(RelaxCase::AreaZero)
        }
    } else {
        // c * relu(x) ranges over c * [0, ub]; the lower side keeps only the
        // minimum and the upper side only the maximum, in both fields.
        let (tmp1, tmp2) = interval_mul(coeff.inf, coeff.sup, 0.0, bound.ub);
        let folded = match side {
            BoundSide::Lower => tmp1,
            BoundSide::Upper => tmp2,
        };
        RelaxOutcome {
            case: RelaxCase::StraddleFold,
            coeff: CoefficientInterval::zero(),
            delta: Some(ConstantDelta::both(folded)),
        }
    };

    debug_assert!(
        outcome.coeff.inf <= outcome.coeff.sup,
        "Relaxation produced reversed coefficient {:?}",
        outcome.coeff
    );
    outcome
}

/// Relax a coefficient used to derive a lower bound.
#[inline]
pub fn relax_lower(
    coeff: CoefficientInterval,
    bound: ConcreteBound,
    use_area_heuristic: bool,
) -> RelaxOutcome {
    relax(BoundSide::Lower, coeff, bound, use_area_heuristic)
}

/// Relax a coefficient used to derive an upper bound.
#[inline]
pub fn relax_upper(
    coeff: CoefficientInterval,
    bound: ConcreteBound,
    use_area_heuristic: bool,
) -> RelaxOutcome {
    relax(BoundSide::Upper, coeff, bound, use_area_heuristic)
}

/// In-place form of [`relax_lower`]: replaces `coeff` and folds into `acc`.
#[inline]
pub fn relax_lower_in_place(
    coeff: &mut CoefficientInterval,
    acc: &mut ConstantAccumulator,
    bound: ConcreteBound,
    use_area_heuristic: bool,
) -> RelaxCase {
    let outcome = relax_lower(*coeff, bound, use_area_heuristic);
    outcome.apply(coeff, acc);
    outcome.case
}

/// In-place form of [`relax_upper`]: replaces `coeff` and folds into `acc`.
#[inline]
pub fn relax_upper_in_place(
    coeff: &mut CoefficientInterval,
    acc: &mut ConstantAccumulator,
    bound: ConcreteBound,
    use_area_heuristic: bool,
) -> RelaxCase {
    let outcome = relax_upper(*coeff, bound, use_area_heuristic);
    outcome.apply(coeff, acc);
    outcome.case
}
