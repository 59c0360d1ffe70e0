//! Case-by-case tests for the ReLU coefficient relaxation.
//!
//! One test (or pair, lower/upper) per branch of the dispatch:
//! - zero coefficient, inactive and active neurons
//! - triangle chord for the binding coefficient sign
//! - area heuristic for the ambiguous sign
//! - straddling fallback with its asymmetric fold

use super::*;
use relax_core::rounding::MIN_DENORMAL;

fn bound(lb: f32, ub: f32) -> ConcreteBound {
    ConcreteBound::new(lb, ub)
}

fn coeff(inf: f32, sup: f32) -> CoefficientInterval {
    CoefficientInterval::new(inf, sup)
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} got {}",
        expected,
        actual
    );
}

#[test]
fn test_zero_coefficient_is_noop() {
    for b in [bound(-1.0, 1.0), bound(0.5, 2.0), bound(-3.0, -1.0)] {
        for heuristic in [false, true] {
            let lower = relax_lower(CoefficientInterval::zero(), b, heuristic);
            assert_eq!(lower.case, RelaxCase::ZeroCoefficient);
            assert!(lower.coeff.is_zero());
            assert_eq!(lower.delta, None);

            let upper = relax_upper(CoefficientInterval::zero(), b, heuristic);
            assert_eq!(upper.case, RelaxCase::ZeroCoefficient);
            assert_eq!(upper.delta, None);
        }
    }
}

#[test]
fn test_inactive_neuron_zeroes_coefficient() {
    // ub == 0 counts as inactive
    for b in [bound(-2.0, -0.5), bound(-1.0, 0.0), bound(0.0, 0.0)] {
        let lower = relax_lower(coeff(-3.0, 4.0), b, false);
        assert_eq!(lower.case, RelaxCase::Inactive);
        assert_eq!(lower.coeff, CoefficientInterval::zero());
        assert_eq!(lower.delta, None);

        let upper = relax_upper(coeff(1.0, 2.0), b, true);
        assert_eq!(upper.case, RelaxCase::Inactive);
        assert_eq!(upper.coeff, CoefficientInterval::zero());
    }
}

#[test]
fn test_active_neuron_passes_coefficient_through() {
    let b = bound(0.25, 3.0);
    for c in [coeff(-3.0, 4.0), coeff(-2.0, -1.0), coeff(0.5, 0.5)] {
        let lower = relax_lower(c, b, false);
        assert_eq!(lower.case, RelaxCase::Active);
        assert_eq!(lower.coeff, c);
        assert_eq!(lower.delta, None);

        let upper = relax_upper(c, b, true);
        assert_eq!(upper.case, RelaxCase::Active);
        assert_eq!(upper.coeff, c);
    }
}

#[test]
fn test_triangle_chord_exact_slope() {
    let chord = TriangleChord::new(bound(-1.0, 1.0));
    assert_eq!(chord.lambda_inf, 0.5);
    assert_eq!(chord.lambda_sup, 0.5);
    assert_eq!(chord.mu_inf, 0.5);
    assert_eq!(chord.mu_sup, 0.5);
}

#[test]
fn test_triangle_chord_encloses_inexact_slope() {
    // ub / (ub - lb) = 1 / 3
    let chord = TriangleChord::new(bound(-2.0, 1.0));
    assert!(chord.lambda_inf < chord.lambda_sup);
    assert!((chord.lambda_inf as f64) <= 1.0 / 3.0);
    assert!((chord.lambda_sup as f64) >= 1.0 / 3.0);
    // mu = -lambda * lb = 2/3
    assert!((chord.mu_inf as f64) <= 2.0 / 3.0);
    assert!((chord.mu_sup as f64) >= 2.0 / 3.0);
}

#[test]
fn test_triangle_chord_at_zero_lower_bound() {
    let chord = TriangleChord::new(bound(0.0, 2.0));
    assert_eq!(chord.lambda_inf, 1.0);
    assert_eq!(chord.lambda_sup, 1.0);
    assert_eq!(chord.mu_inf, 0.0);
    assert_eq!(chord.mu_sup, 0.0);
}

#[test]
fn test_lower_triangle_numeric() {
    // lb=-1, ub=1, c=(-2,-2): lambda = mu = 0.5, coefficient ~ -1, constant ~ -1
    let outcome = relax_lower(coeff(-2.0, -2.0), bound(-1.0, 1.0), false);
    assert_eq!(outcome.case, RelaxCase::Triangle);
    assert!(outcome.coeff.inf <= -1.0 && -1.0 <= outcome.coeff.sup);
    assert_close(outcome.coeff.inf, -1.0);
    assert_close(outcome.coeff.sup, -1.0);

    let delta = outcome.delta.expect("triangle folds a constant");
    assert!(delta.lo < -1.0, "lower fold must be inflated below -1");
    assert!(delta.hi > -1.0, "upper fold must be inflated above -1");
    assert_close(delta.lo, -1.0);
    assert_close(delta.hi, -1.0);

    let mut acc = ConstantAccumulator::default();
    acc.fold(delta);
    assert!(acc.contains(-1.0));
}

#[test]
fn test_upper_triangle_numeric() {
    let outcome = relax_upper(coeff(2.0, 2.0), bound(-1.0, 1.0), false);
    assert_eq!(outcome.case, RelaxCase::Triangle);
    assert_close(outcome.coeff.inf, 1.0);
    assert_close(outcome.coeff.sup, 1.0);
    let delta = outcome.delta.unwrap();
    assert!(delta.lo < 1.0 && 1.0 < delta.hi);
    assert_close(delta.lo, 1.0);
    assert_close(delta.hi, 1.0);
}

#[test]
fn test_triangle_at_zero_lower_bound_folds_only_margin() {
    let outcome = relax_lower(coeff(-1.0, -1.0), bound(0.0, 2.0), false);
    assert_eq!(outcome.case, RelaxCase::Triangle);
    assert_close(outcome.coeff.inf, -1.0);
    let delta = outcome.delta.unwrap();
    assert_eq!(delta.lo, -2.0 * MIN_DENORMAL);
    assert_eq!(delta.hi, 2.0 * MIN_DENORMAL);
}

#[test]
fn test_lower_heuristic_toggling() {
    // lb=-1, ub=2, c=(3,3): area_zero = 3 >= area_identity = 1.5
    let b = bound(-1.0, 2.0);
    let c = coeff(3.0, 3.0);

    let off = relax_lower(c, b, false);
    assert_eq!(off.case, RelaxCase::AreaZero);
    assert_eq!(off.coeff, CoefficientInterval::zero());
    assert_eq!(off.delta, None);

    let on = relax_lower(c, b, true);
    assert_eq!(on.case, RelaxCase::AreaPassThrough);
    assert_eq!(on.coeff, c);
    assert_eq!(on.delta, None);

    // Accumulator is untouched either way
    let mut acc = ConstantAccumulator::new(-0.5, 0.5);
    let mut cf = c;
    relax_lower_in_place(&mut cf, &mut acc, b, false);
    assert_eq!(acc, ConstantAccumulator::new(-0.5, 0.5));
    assert!(cf.is_zero());
}

#[test]
fn test_lower_heuristic_prefers_zero_for_mostly_negative_interval() {
    // area_zero = 0.5 * 1 * 4 = 2 < area_identity = 0.5 * 3 * 4 = 6
    let outcome = relax_lower(coeff(2.0, 2.0), bound(-3.0, 1.0), true);
    assert_eq!(outcome.case, RelaxCase::AreaZero);
    assert!(outcome.coeff.is_zero());
}

#[test]
fn test_heuristic_tie_passes_through() {
    // Symmetric interval: areas are equal, pass-through wins
    let outcome = relax_lower(coeff(1.0, 2.0), bound(-2.0, 2.0), true);
    assert_eq!(outcome.case, RelaxCase::AreaPassThrough);
}

#[test]
fn test_upper_heuristic_toggling() {
    let b = bound(-1.0, 2.0);
    let c = coeff(-2.0, -1.0);

    let off = relax_upper(c, b, false);
    assert_eq!(off.case, RelaxCase::AreaZero);
    assert!(off.coeff.is_zero());

    let on = relax_upper(c, b, true);
    assert_eq!(on.case, RelaxCase::AreaPassThrough);
    assert_eq!(on.coeff, c);

    let narrow_on = relax_upper(c, bound(-3.0, 1.0), true);
    assert_eq!(narrow_on.case, RelaxCase::AreaZero);
}

#[test]
fn test_lower_fold_uses_minimum_in_both_fields() {
    // c * [0, 3] with c in [-1, 2] spans [-3, 6]
    let outcome = relax_lower(coeff(-1.0, 2.0), bound(-1.0, 3.0), false);
    assert_eq!(outcome.case, RelaxCase::StraddleFold);
    assert!(outcome.coeff.is_zero());
    assert_eq!(outcome.delta, Some(ConstantDelta::both(-3.0)));
}

#[test]
fn test_upper_fold_uses_maximum_in_both_fields() {
    let outcome = relax_upper(coeff(-1.0, 2.0), bound(-1.0, 3.0), true);
    assert_eq!(outcome.case, RelaxCase::StraddleFold);
    assert!(outcome.coeff.is_zero());
    assert_eq!(outcome.delta, Some(ConstantDelta::both(6.0)));
}

#[test]
fn test_coefficient_touching_zero_falls_back_to_fold() {
    // [0, 5] is neither strictly positive nor strictly negative
    let lower = relax_lower(coeff(0.0, 5.0), bound(-1.0, 1.0), true);
    assert_eq!(lower.case, RelaxCase::StraddleFold);
    assert_eq!(lower.delta, Some(ConstantDelta::both(0.0)));

    let upper = relax_upper(coeff(0.0, 5.0), bound(-1.0, 1.0), true);
    assert_eq!(upper.case, RelaxCase::StraddleFold);
    assert_eq!(upper.delta, Some(ConstantDelta::both(5.0)));
}

#[test]
fn test_side_dispatch_matches_named_kernels() {
    let b = bound(-2.0, 5.0);
    for c in [coeff(-3.0, -1.0), coeff(1.0, 3.0), coeff(-1.0, 1.0)] {
        assert_eq!(relax(BoundSide::Lower, c, b, true), relax_lower(c, b, true));
        assert_eq!(relax(BoundSide::Upper, c, b, true), relax_upper(c, b, true));
    }
}

#[test]
fn test_in_place_forms_update_buffers() {
    let b = bound(-1.0, 1.0);

    let mut c = coeff(-2.0, -2.0);
    let mut acc = ConstantAccumulator::new(1.0, 1.0);
    let case = relax_lower_in_place(&mut c, &mut acc, b, false);
    assert_eq!(case, RelaxCase::Triangle);
    assert_close(c.inf, -1.0);
    // 1 + (-1) = 0, inflated outward
    assert!(acc.inf < 0.0 && acc.sup > 0.0);
    assert_close(acc.inf, 0.0);
    assert_close(acc.sup, 0.0);

    let mut c = coeff(-1.0, 2.0);
    let mut acc = ConstantAccumulator::default();
    let case = relax_upper_in_place(&mut c, &mut acc, bound(-1.0, 3.0), false);
    assert_eq!(case, RelaxCase::StraddleFold);
    assert!(c.is_zero());
    assert_eq!(acc, ConstantAccumulator { inf: 6.0, sup: 6.0 });
}

#[test]
fn test_outcome_apply_without_delta_keeps_accumulator() {
    let outcome = relax_lower(coeff(1.0, 2.0), bound(0.5, 1.0), false);
    let mut c = coeff(9.0, 9.0);
    let mut acc = ConstantAccumulator::new(-1.0, 1.0);
    outcome.apply(&mut c, &mut acc);
    assert_eq!(c, coeff(1.0, 2.0));
    assert_eq!(acc, ConstantAccumulator::new(-1.0, 1.0));
}
