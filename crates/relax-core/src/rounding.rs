//! Directed-rounding arithmetic on `f32`.
//!
//! Rust exposes no rounding-mode control, so every operation here computes
//! the round-to-nearest result, determines the exact error, and steps one ulp
//! (`next_down`/`next_up`) only when the rounded value lies on the wrong side
//! of the exact one. Results are therefore tight: exact operations return the
//! exact value, inexact ones return the adjacent representable value in the
//! requested direction.
//!
//! - addition: the error term comes from TwoSum
//! - multiplication: the product of two `f32` is exact in `f64`
//! - division: the residual `q * b - a` is exact in `f64` up to its sign
//!
//! NaN results (`inf - inf`, `inf / inf`) are widened conservatively:
//! round-down returns `-inf`, round-up `+inf`.
//! Overflow of finite operands saturates at `±f32::MAX` on the side where an
//! infinity would be unsound.

/// Smallest positive subnormal `f32`; safety margin for constant folds.
pub const MIN_DENORMAL: f32 = f32::from_bits(1);

/// Unit roundoff of `f32` (2^-24), the relative error of one rounded operation.
pub const ULP: f32 = f32::EPSILON / 2.0;

/// Exact error of `a + b`: returns `(s, e)` with `a + b == s + e` exactly.
#[inline]
fn two_sum(a: f32, b: f32) -> (f32, f32) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

/// `a + b` rounded toward negative infinity.
#[inline]
pub fn add_rd(a: f32, b: f32) -> f32 {
    let s = a + b;
    if s.is_nan() {
        return f32::NEG_INFINITY;
    }
    if s.is_infinite() {
        return if s > 0.0 && a.is_finite() && b.is_finite() {
            f32::MAX
        } else {
            s
        };
    }
    let (s, err) = two_sum(a, b);
    if err < 0.0 {
        s.next_down()
    } else {
        s
    }
}

/// `a + b` rounded toward positive infinity.
#[inline]
pub fn add_ru(a: f32, b: f32) -> f32 {
    let s = a + b;
    if s.is_nan() {
        return f32::INFINITY;
    }
    if s.is_infinite() {
        return if s < 0.0 && a.is_finite() && b.is_finite() {
            f32::MIN
        } else {
            s
        };
    }
    let (s, err) = two_sum(a, b);
    if err > 0.0 {
        s.next_up()
    } else {
        s
    }
}

/// `a * b` rounded toward negative infinity. A zero operand gives `0`.
#[inline]
pub fn mul_rd(a: f32, b: f32) -> f32 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let exact = a as f64 * b as f64;
    if exact.is_nan() {
        return f32::NEG_INFINITY;
    }
    let r = exact as f32;
    if (r as f64) > exact {
        r.next_down()
    } else {
        r
    }
}

/// `a * b` rounded toward positive infinity. A zero operand gives `0`.
#[inline]
pub fn mul_ru(a: f32, b: f32) -> f32 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let exact = a as f64 * b as f64;
    if exact.is_nan() {
        return f32::INFINITY;
    }
    let r = exact as f32;
    if (r as f64) < exact {
        r.next_up()
    } else {
        r
    }
}

/// Sign of `q - a / b`, computed without rounding error.
///
/// `q * b` is exact in `f64`; subtracting `a` may round but keeps the sign.
#[inline]
fn quotient_error_sign(q: f32, a: f32, b: f32) -> f64 {
    let residual = q as f64 * b as f64 - a as f64;
    residual * (b as f64).signum()
}

/// `a / b` rounded toward negative infinity.
#[inline]
pub fn div_rd(a: f32, b: f32) -> f32 {
    let q = a / b;
    if q.is_nan() {
        return f32::NEG_INFINITY;
    }
    if q.is_infinite() {
        return if q > 0.0 && a.is_finite() && b != 0.0 {
            f32::MAX
        } else {
            q
        };
    }
    if b.is_infinite() {
        return q;
    }
    if quotient_error_sign(q, a, b) > 0.0 {
        q.next_down()
    } else {
        q
    }
}

/// `a / b` rounded toward positive infinity.
#[inline]
pub fn div_ru(a: f32, b: f32) -> f32 {
    let q = a / b;
    if q.is_nan() {
        return f32::INFINITY;
    }
    if q.is_infinite() {
        return if q < 0.0 && a.is_finite() && b != 0.0 {
            f32::MIN
        } else {
            q
        };
    }
    if b.is_infinite() {
        return q;
    }
    if quotient_error_sign(q, a, b) < 0.0 {
        q.next_up()
    } else {
        q
    }
}

/// Sound product of the intervals `[a_inf, a_sup]` and `[b_inf, b_sup]`.
///
/// Lower endpoint is the minimum of the four round-down corner products, the
/// upper endpoint the maximum of the round-up ones. `0 * inf` counts as `0`.
#[inline]
pub fn interval_mul(a_inf: f32, a_sup: f32, b_inf: f32, b_sup: f32) -> (f32, f32) {
    if a_inf.is_nan() || a_sup.is_nan() || b_inf.is_nan() || b_sup.is_nan() {
        return (f32::NEG_INFINITY, f32::INFINITY);
    }

    let lower = mul_rd(a_inf, b_inf)
        .min(mul_rd(a_inf, b_sup))
        .min(mul_rd(a_sup, b_inf))
        .min(mul_rd(a_sup, b_sup));
    let upper = mul_ru(a_inf, b_inf)
        .max(mul_ru(a_inf, b_sup))
        .max(mul_ru(a_sup, b_inf))
        .max(mul_ru(a_sup, b_sup));

    (lower, upper)
}

/// Product of a scalar interval `[inf, sup]` with an expression coefficient
/// `[inf_expr, sup_expr]`, yielding a new coefficient.
///
/// On top of [`interval_mul`] the result is widened by the relative error
/// term `[inf, sup] * [-m * ULP, m * ULP]` with `m = max(|inf_expr|, |sup_expr|)`,
/// covering the rounding the engine commits when it later evaluates the
/// coefficient against concrete inputs.
#[inline]
pub fn interval_mul_expr_coeff(inf: f32, sup: f32, inf_expr: f32, sup_expr: f32) -> (f32, f32) {
    let (lower, upper) = interval_mul(inf, sup, inf_expr, sup_expr);
    let magnitude = inf_expr.abs().max(sup_expr.abs());
    let err = mul_ru(magnitude, ULP);
    let (err_lower, err_upper) = interval_mul(inf, sup, -err, err);
    (add_rd(lower, err_lower), add_ru(upper, err_upper))
}

/// Product of a scalar interval with an expression coefficient, yielding a
/// constant contribution.
///
/// Same as [`interval_mul_expr_coeff`], additionally padded by
/// [`MIN_DENORMAL`] on each side to absorb underflow in the product.
#[inline]
pub fn interval_mul_cst_coeff(inf: f32, sup: f32, inf_expr: f32, sup_expr: f32) -> (f32, f32) {
    let (lower, upper) = interval_mul_expr_coeff(inf, sup, inf_expr, sup_expr);
    (add_rd(lower, -MIN_DENORMAL), add_ru(upper, MIN_DENORMAL))
}
