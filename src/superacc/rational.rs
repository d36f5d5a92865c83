use super::*;

use malachite::rational::Rational;
use malachite::base::num::arithmetic::traits::{Abs, PowerOf2};

impl From<&Superaccumulator> for Rational {
  /// The exact value of the bins. Panics if an infinity or NaN was accumulated.
  ///
  /// This is a deliberately naive sum of `bin · 2^exponent`, since this is what the optimised
  /// normalization and rounding are checked against.
  fn from(value: &Superaccumulator) -> Self {
    assert!(!value.is_non_finite(), "a superaccumulator with an infinity or NaN is not rational");
    let mut total = Rational::from(0);
    for (i, &bin) in value.bins.iter().enumerate() {
      total += Rational::from(bin) * Rational::power_of_2(Superaccumulator::bin_exponent(i) as i64);
    }
    total
  }
}

/// The exact value of a finite `f64`.
pub fn exact(x: f64) -> Rational {
  Rational::try_from(x).unwrap()
}

/// The exact sum of finite `f64`s.
pub fn exact_sum(xs: &[f64]) -> Rational {
  let mut total = Rational::from(0);
  for &x in xs {
    total += exact(x);
  }
  total
}

/// The exact dot product of finite `f64`s.
pub fn exact_dot(xs: &[f64], ys: &[f64]) -> Rational {
  assert_eq!(xs.len(), ys.len());
  let mut total = Rational::from(0);
  for (&x, &y) in xs.iter().zip(ys) {
    total += exact(x) * exact(y);
  }
  total
}

/// The exact value of a weighted dot product `Σ x·w·y`, *as computed by the weighted kernels*:
/// each `x·w` is rounded first, and only then multiplied exactly by `y`.
pub fn exact_dot_weighted(xs: &[f64], ws: &[f64], ys: &[f64]) -> Rational {
  assert_eq!(xs.len(), ws.len());
  assert_eq!(xs.len(), ys.len());
  let mut total = Rational::from(0);
  for ((&x, &w), &y) in xs.iter().zip(ws).zip(ys) {
    total += exact(x * w) * exact(y);
  }
  total
}

/// Check whether the rational number `exact` should be rounded to `x`: to nearest, ties to even,
/// and to an infinity at or beyond `f64::MAX` plus half an ulp.
pub fn is_correct_rounded(exact: &Rational, x: f64) -> bool {
  // The smallest magnitude that rounds to infinity: `2^1024 - 2^970`, the midpoint between
  // `f64::MAX` and `2^1024`.
  let threshold = Rational::power_of_2(1024_i64) - Rational::power_of_2(970_i64);

  if x.is_nan() {
    return false
  }
  if x.is_infinite() {
    return if x > 0. {*exact >= threshold} else {*exact <= -threshold}
  }

  let curr = self::exact(x);
  if *exact == curr {
    return true
  }
  let x_is_even = x.to_bits() & 1 == 0;

  // `exact` lies strictly between `x` and its neighbour towards `exact`: it must be closer to `x`,
  // or equally close if `x` is even.
  let neighbour = if *exact > curr {x.next_up()} else {x.next_down()};
  if neighbour.is_infinite() {
    return exact.abs() < threshold
  }
  let neighbour = self::exact(neighbour);
  let distance_curr = (&curr - exact).abs();
  let distance_neighbour = (&neighbour - exact).abs();
  distance_curr < distance_neighbour || distance_curr == distance_neighbour && x_is_even
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn is_correct_rounded_basic() {
    assert!(is_correct_rounded(&exact(1.), 1.));
    assert!(!is_correct_rounded(&exact(1.), 1. + f64::EPSILON));
    let tie = exact(1.) + exact(f64::EPSILON / 2.);
    assert!(is_correct_rounded(&tie, 1.));
    assert!(!is_correct_rounded(&tie, 1. + f64::EPSILON));
    let above_tie = tie + exact(1e-300);
    assert!(is_correct_rounded(&above_tie, 1. + f64::EPSILON));
  }

  #[test]
  fn is_correct_rounded_overflow() {
    let big = exact(f64::MAX) * exact(2.);
    assert!(is_correct_rounded(&big, f64::INFINITY));
    assert!(!is_correct_rounded(&big, f64::MAX));
    assert!(is_correct_rounded(&-big, f64::NEG_INFINITY));
    assert!(is_correct_rounded(&exact(f64::MAX), f64::MAX));
  }

  #[test]
  fn is_correct_rounded_zero() {
    let tiny = exact(f64::from_bits(1)) / Rational::from(2);
    assert!(is_correct_rounded(&tiny, 0.));
    assert!(!is_correct_rounded(&tiny, f64::from_bits(1)));
  }

  #[test]
  fn rational_of_accumulator() {
    let acc = Superaccumulator::from_iter([0.5, -3., 1e-310]);
    assert_eq!(Rational::from(&acc), exact_sum(&[0.5, -3., 1e-310]));
  }
}
