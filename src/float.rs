//! Bit-level helpers on IEEE-754 `f64`s: extracting the exponent field, building exact powers of
//! two, and assembling a float from a rounded significand. These are the only places outside the
//! [superaccumulator](crate::Superaccumulator) that look at raw float bits.

/// Number of explicit (stored) mantissa bits of an `f64`.
pub(crate) const MANTISSA_DIGITS_EXPLICIT: u32 = f64::MANTISSA_DIGITS - 1;

/// Exponent bias of an `f64`.
const EXP_BIAS: i32 = f64::MAX_EXP - 1;

/// Mask of the 11 exponent bits, after shifting out the mantissa.
const EXP_MASK: u64 = (1 << (64 - 1 - MANTISSA_DIGITS_EXPLICIT)) - 1;

/// Mask of the 52 explicit mantissa bits.
const MANTISSA_MASK: u64 = (1 << MANTISSA_DIGITS_EXPLICIT) - 1;

/// Exponent of the least significant bit of the smallest subnormal, i.e. `2^MIN_LSB_EXP` is
/// `f64::from_bits(1)`.
pub(crate) const MIN_LSB_EXP: i32 = f64::MIN_EXP - f64::MANTISSA_DIGITS as i32;

/// The unbiased exponent field of `x`.
///
/// Subnormals (and zero) report `-1023`, since their exponent field is 0. Infinities and NaNs
/// report `1024`; callers are expected to filter those out first.
#[inline]
pub(crate) fn exponent(x: f64) -> i32 {
  let field = (x.to_bits() >> MANTISSA_DIGITS_EXPLICIT) & EXP_MASK;
  field as i32 - EXP_BIAS
}

/// The exact power of two `2^e`, for `e` in the normal range `-1022 ..= 1023`.
#[inline]
pub(crate) fn pow2(e: i32) -> f64 {
  debug_assert!((f64::MIN_EXP - 1 ..= f64::MAX_EXP - 1).contains(&e), "2^{e} is not a normal f64");
  f64::from_bits(((e + EXP_BIAS) as u64) << MANTISSA_DIGITS_EXPLICIT)
}

/// Assemble the `f64` equal to `±m · 2^q`.
///
/// The significand `m` must already be rounded: either `2^52 ≤ m ≤ 2^53`, or `m < 2^52` and
/// `q == MIN_LSB_EXP` (a subnormal, or zero). Values too large for an `f64` become infinities,
/// as they would under round-to-nearest.
pub(crate) fn compose(negative: bool, mut m: u64, mut q: i32) -> f64 {
  // Rounding may have carried into a 54th bit.
  if m == 1 << f64::MANTISSA_DIGITS {
    m >>= 1;
    q += 1;
  }

  let sign = u64::from(negative) << 63;
  if m < 1 << MANTISSA_DIGITS_EXPLICIT {
    debug_assert_eq!(q, MIN_LSB_EXP);
    // Subnormal: the bits of `m` are exactly the mantissa field, and the exponent field is 0.
    return f64::from_bits(sign | m)
  }

  // Normal: `m` is `1.fff… × 2^52`, so the exponent of the result is `q + 52`.
  let biased = q + MANTISSA_DIGITS_EXPLICIT as i32 + EXP_BIAS;
  if biased >= EXP_MASK as i32 {
    return if negative {f64::NEG_INFINITY} else {f64::INFINITY}
  }
  debug_assert!(biased >= 1);
  f64::from_bits(sign | (biased as u64) << MANTISSA_DIGITS_EXPLICIT | (m & MANTISSA_MASK))
}
