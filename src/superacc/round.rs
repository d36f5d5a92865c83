use super::*;

impl Superaccumulator {
  /// Round the accumulated value to the nearest `f64`, ties to even. This is the final step of a
  /// reduction, and the *only* step that actually rounds.
  ///
  /// The accumulator itself is not modified, so rounding again yields the same value.
  ///
  /// If an infinity or NaN was accumulated, the result is the IEEE sum of just those (so `+∞`,
  /// `-∞`, or NaN), regardless of the finite values. A value beyond the range of `f64` rounds to
  /// an infinity. If a carry ever escaped the most significant bin, the value is lost and the
  /// result is [`Error::RangeOverflow`].
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// let mut acc = Superaccumulator::ZERO;
  /// acc += 1.;
  /// acc += f64::EPSILON / 2.;  // A tie: rounds to even, i.e. down to 1
  /// assert_eq!(acc.round(), Ok(1.));
  /// acc += f64::MIN_POSITIVE;  // No longer a tie: rounds up
  /// assert_eq!(acc.round(), Ok(1. + f64::EPSILON));
  /// ```
  pub fn round(&self) -> Result<f64> {
    if self.overflow {
      return Err(Error::RangeOverflow)
    }
    if self.non_finite != 0. {
      // Canonicalize NaNs: their sign and payload would otherwise depend on the order in which
      // they were summed.
      return Ok(if self.non_finite.is_nan() {f64::NAN} else {self.non_finite})
    }

    let mut acc = self.clone();
    let negative = acc.normalize();

    // Work on the magnitude: negate every bin and normalize again, after which all bins are
    // non-negative.
    if negative {
      if acc.bins[Self::IMAX] == i64::MIN {
        // Below -2^1071, far beyond `f64::MIN`.
        return Ok(f64::NEG_INFINITY)
      }
      for bin in &mut acc.bins {
        *bin = -*bin;
      }
      acc.imin = Self::IMIN;
      acc.imax = Self::IMAX;
      acc.normalize();
    }
    if acc.overflow {
      return Err(Error::RangeOverflow)
    }

    Ok(acc.round_magnitude(negative))
  }

  /// Round a normalized, non-negative accumulator, and give it the sign `negative`.
  fn round_magnitude(&self, negative: bool) -> f64 {
    debug_assert!(self.is_normalized() && self.bins.iter().all(|&b| b >= 0));

    // Find the most significant non-zero bin. If there is none, the value is exactly 0.
    let Some(i) = self.bins.iter().rposition(|&b| b != 0) else {
      return 0.
    };

    // Take that bin and the one below it as a `window` of bits. Since the leading bin is not 0,
    // the window has at least `DIGITS + 1 = 57` significant bits: more than the 53 of an `f64`,
    // plus a round bit, so every bin further down only matters as a `sticky` bit.
    //
    // Visualised:
    //
    //   bins: …0000|0000000001101…|0110101101…|1001…|0000…|0101…
    //               [       window           ][     sticky     ]
    //
    // The least significant bin has nothing below it, but its weight is below the smallest
    // subnormal anyway.
    let (window, base, sticky) = if i == Self::IMIN {
      (self.bins[i] as u128, Self::bin_exponent(i), false)
    } else {
      let window = (self.bins[i] as u128) << Self::DIGITS | self.bins[i - 1] as u128;
      let sticky = self.bins[.. i - 1].iter().any(|&b| b != 0);
      (window, Self::bin_exponent(i - 1), sticky)
    };

    // The window represents `window · 2^base`. Its msb has exponent `msb_exp`, so the lsb of the
    // rounded result has exponent `msb_exp - 52`, or that of the smallest subnormal if the result
    // is subnormal.
    let width = u128::BITS - window.leading_zeros();
    let msb_exp = width as i32 - 1 + base;
    let lsb_exp = (msb_exp - float::MANTISSA_DIGITS_EXPLICIT as i32).max(float::MIN_LSB_EXP);

    // Shift out the bits below `lsb_exp` and round to nearest, ties to even, considering the
    // `sticky` bits from the lower bins too.
    let shift = (lsb_exp - base) as u32;
    debug_assert!(0 < shift && shift < u128::BITS);
    let significand = window >> shift;
    let rest = window & ((1 << shift) - 1);
    let half = 1 << (shift - 1);
    let round_up = rest > half || rest == half && (sticky || significand & 1 == 1);

    float::compose(negative, (significand + u128::from(round_up)) as u64, lsb_exp)
  }
}

impl TryFrom<&Superaccumulator> for f64 {
  type Error = Error;

  /// Same as [`Superaccumulator::round`].
  fn try_from(value: &Superaccumulator) -> Result<Self> {
    value.round()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::rational::{exact_sum, is_correct_rounded};
  use proptest::prelude::*;

  fn sum(xs: &[f64]) -> Result<f64> {
    let mut acc = Superaccumulator::ZERO;
    acc.accumulate_all(xs);
    acc.round()
  }

  #[test]
  fn cancellation() {
    assert_eq!(sum(&[1e16, 1., -1e16, 1., 1., -1.]), Ok(2.));
    assert_eq!(sum(&[1e300, 1e-300, -1e300]), Ok(1e-300));
    assert_eq!(sum(&[f64::MAX, 1., f64::MIN]), Ok(1.));
  }

  #[test]
  fn zero() {
    assert_eq!(sum(&[]), Ok(0.));
    assert_eq!(sum(&[3., -3.]).map(f64::to_bits), Ok(0));
  }

  #[test]
  fn negative() {
    assert_eq!(sum(&[-1.]), Ok(-1.));
    assert_eq!(sum(&[-0.75, -1e-20]), Ok(-0.75 - 1e-20));
    assert_eq!(sum(&[1., -2.5]), Ok(-1.5));
  }

  #[test]
  fn subnormals() {
    let tiny = f64::from_bits(1);
    assert_eq!(sum(&[tiny]), Ok(tiny));
    assert_eq!(sum(&[tiny, tiny, -tiny]), Ok(tiny));
    assert_eq!(sum(&[f64::MIN_POSITIVE, -tiny]), Ok(f64::MIN_POSITIVE - tiny));
    assert_eq!(sum(&[-f64::MIN_POSITIVE / 4.]), Ok(-f64::MIN_POSITIVE / 4.));
  }

  #[test]
  fn ties_to_even() {
    let half_ulp = f64::EPSILON / 2.;
    assert_eq!(sum(&[1., half_ulp]), Ok(1.));
    assert_eq!(sum(&[1. + f64::EPSILON, half_ulp]), Ok(1. + 2. * f64::EPSILON));
    assert_eq!(sum(&[-1., -half_ulp]), Ok(-1.));
    assert_eq!(sum(&[1., half_ulp, 1e-300]), Ok(1. + f64::EPSILON));
    assert_eq!(sum(&[1., half_ulp, -1e-300]), Ok(1.));
  }

  #[test]
  fn overflow_to_infinity() {
    assert_eq!(sum(&[f64::MAX, f64::MAX]), Ok(f64::INFINITY));
    assert_eq!(sum(&[f64::MIN, f64::MIN]), Ok(f64::NEG_INFINITY));
    assert_eq!(sum(&[f64::MAX, f64::MAX, f64::MIN]), Ok(f64::MAX));
  }

  #[test]
  fn non_finite() {
    assert_eq!(sum(&[1., f64::INFINITY, 2.]), Ok(f64::INFINITY));
    assert_eq!(sum(&[f64::NEG_INFINITY, -1e300]), Ok(f64::NEG_INFINITY));
    assert!(sum(&[f64::INFINITY, 1., f64::NEG_INFINITY]).unwrap().is_nan());
    assert_eq!(sum(&[-f64::NAN, 1.]).map(f64::to_bits), Ok(f64::NAN.to_bits()));
  }

  #[test]
  fn range_overflow() {
    let mut bins = [0; BIN_COUNT];
    bins[Superaccumulator::IMAX] = i64::MAX;
    let mut acc = Superaccumulator::from_bins(bins);
    acc.accumulate_word(Superaccumulator::IMAX, i64::MAX);
    assert_eq!(acc.round(), Err(Error::RangeOverflow));
    // Sticky
    acc += 1.;
    assert_eq!(acc.round(), Err(Error::RangeOverflow));
  }

  #[test]
  fn round_twice() {
    let mut acc = Superaccumulator::ZERO;
    acc.accumulate_all(&[0.1, 0.2, 0.3, -1e-17]);
    let once = acc.round();
    assert_eq!(acc.round(), once);
    assert_eq!(f64::try_from(&acc), once);
  }

  #[test]
  fn does_not_mutate() {
    let mut acc = Superaccumulator::ZERO;
    acc.accumulate_all(&[-0.1, 0.7]);
    let before = *acc.bins();
    let _ = acc.round();
    assert_eq!(*acc.bins(), before);
    assert!(!acc.is_normalized());
  }

  proptest!{
    #![proptest_config(ProptestConfig::with_cases(crate::PROPTEST_CASES))]
    #[test]
    fn correctly_rounded(xs in crate::test::wild_vec(0 .. 100)) {
      let rounded = sum(&xs).unwrap();
      prop_assert!(is_correct_rounded(&exact_sum(&xs), rounded));
    }

    #[test]
    fn idempotent(xs in crate::test::wild_vec(0 .. 100)) {
      let mut acc = Superaccumulator::ZERO;
      acc.accumulate_all(&xs);
      let first = acc.round().unwrap();
      let second = acc.round().unwrap();
      prop_assert_eq!(first.to_bits(), second.to_bits());
    }
  }
}
