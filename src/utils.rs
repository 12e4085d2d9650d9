pub mod io;

use crate::FloatType;
use log::warn;
use std::f64::consts::LOG10_E;

/// Converts a natural logarithm into a base 10 one without leaving log space,
/// i.e. `log10(exp(ln_value))` for values whose exponential would under/overflow.
pub fn ln_to_log10(ln_value: FloatType) -> FloatType {
    ln_value * LOG10_E
}

/// Given the smallest and largest natural-log value of a positive series, this returns the
/// powers of ten to use as ticks on a log axis: from one decade below the floor of the
/// minimum up to the ceiling of the maximum, limited to normal `f64` magnitudes.
pub fn decade_ticks(ln_min: FloatType, ln_max: FloatType) -> Vec<FloatType> {
    let (low, high) = decade_bounds(ln_min, ln_max);
    (low..high).map(|decade| 10.0_f64.powi(decade)).collect()
}

/// Returns `(decade_low, decade_high)` with `decade_low = floor(log10 min) - 1` and
/// `decade_high = ceil(log10 max) + 1`. Ticks cover `decade_low..decade_high`.
///
/// Both ends are clamped so every tick `10^d` is a finite, normal, positive `f64`.
pub fn decade_bounds(ln_min: FloatType, ln_max: FloatType) -> (i32, i32) {
    let lowest = f64::MIN_10_EXP as FloatType;
    let highest = f64::MAX_10_EXP as FloatType;

    let low = ln_to_log10(ln_min).floor() - 1.0;
    let high = ln_to_log10(ln_max).ceil() + 1.0;
    let clamped = (low.clamp(lowest, highest), high.clamp(lowest + 1.0, highest + 1.0));
    if clamped != (low, high) {
        warn!("decades [{low}, {high}) exceed the f64 range, clamping to {clamped:?}");
    }
    // In range for i32 after clamping
    (clamped.0 as i32, clamped.1 as i32)
}

/// True when `a` and `b` agree to a relative tolerance `rtol`.
pub fn rclose(a: FloatType, b: FloatType, rtol: FloatType) -> bool {
    (a - b).abs() <= rtol * a.abs().max(b.abs())
}

#[test]
fn test_ln_to_log10_matches_direct_evaluation() {
    for w in [-20.0, -10.0, -1.0, 0.0, 3.5] {
        let direct = f64::exp(w).log10();
        assert!((ln_to_log10(w) - direct).abs() < 1e-12);
    }
}

#[test]
fn test_ln_to_log10_survives_underflow() {
    // exp(-1000) is 0 in double precision
    assert_eq!(f64::exp(-1000.0), 0.0);
    assert!((ln_to_log10(-1000.0) + 434.29448190325176).abs() < 1e-9);
}

#[test]
fn test_decade_bounds() {
    // log10(e^-20) = -8.69, log10(e^-10) = -4.34
    assert_eq!(decade_bounds(-20.0, -10.0), (-10, -3));
    // log10(e^0) = 0 exactly
    assert_eq!(decade_bounds(0.0, 0.0), (-1, 1));
}

#[test]
fn test_decade_ticks_are_powers_of_ten() {
    let ticks = decade_ticks(-20.0, -10.0);
    let expected = [1e-10, 1e-9, 1e-8, 1e-7, 1e-6, 1e-5, 1e-4];
    assert_eq!(ticks.len(), expected.len());
    for (tick, expected) in ticks.iter().zip(expected) {
        assert!(rclose(*tick, expected, 1e-12), "{tick} != {expected}");
    }
}

#[test]
fn test_rclose() {
    assert!(rclose(1e-10, 1e-10 * (1.0 + 1e-15), 1e-12));
    assert!(!rclose(1e-10, 1.1e-10, 1e-12));
    assert!(rclose(0.0, 0.0, 1e-12));
}

#[test]
fn test_decade_bounds_stay_within_f64() {
    assert_eq!(decade_bounds(-1e12, 0.0), (f64::MIN_10_EXP, 1));
    assert_eq!(decade_bounds(0.0, 1e12), (-1, f64::MAX_10_EXP + 1));
    assert_eq!(decade_bounds(1e12, 1e12), (f64::MAX_10_EXP, f64::MAX_10_EXP + 1));
    assert_eq!(decade_bounds(-1e12, -1e12), (f64::MIN_10_EXP, f64::MIN_10_EXP + 1));
}

#[test]
fn test_extreme_decade_ticks_are_finite_and_increasing() {
    for (ln_min, ln_max) in [(-800.0, -5.0), (-5.0, 800.0), (-1e12, 0.0), (-800.0, 800.0)] {
        let ticks = decade_ticks(ln_min, ln_max);
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|t| t.is_normal() && *t > 0.0), "{ln_min}, {ln_max}");
        assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]), "{ln_min}, {ln_max}");
    }
}
