use super::*;

impl Superaccumulator {
  /// The number of bins.
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// assert_eq!(Superaccumulator::BIN_COUNT, 39);
  /// ```
  pub const BIN_COUNT: usize = BIN_COUNT;

  /// The number of significant bits, or *digits*, that each normalized bin holds. This is also
  /// the distance, in binades, between the weights of two consecutive bins.
  pub const DIGITS: u32 = 56;

  /// The number of carry-save bits above the [`DIGITS`](Self::DIGITS) of each bin (the remaining
  /// bits of the `i64`, including the sign).
  pub const KRX: u32 = i64::BITS - Self::DIGITS;

  /// The number of bins below the fixed point: bin `F_WORDS` has weight `2^0`.
  pub const F_WORDS: usize = 20;

  /// Index of the least significant bin.
  pub const IMIN: usize = 0;

  /// Index of the most significant bin. After normalization this bin also keeps the final carry,
  /// and thus the sign of the represented value.
  pub const IMAX: usize = BIN_COUNT - 1;

  /// `2^DIGITS`, as an exact `f64`.
  pub(crate) const DELTASCALE: f64 = (1u64 << Self::DIGITS) as f64;

  /// Mask of the [`DIGITS`](Self::DIGITS) low bits of a bin.
  pub(crate) const DIGITS_MASK: i64 = (1 << Self::DIGITS) - 1;

  /// A superaccumulator that represents the number 0.
  pub const ZERO: Self = {
    // The bins must cover all of `f64`: the least significant bin below the smallest subnormal,
    // and the most significant one above `f64::MAX`.
    assert!(-((Self::DIGITS as usize * Self::F_WORDS) as i32) <= float::MIN_LSB_EXP);
    assert!((Self::DIGITS as usize * (BIN_COUNT - Self::F_WORDS)) as i32 > f64::MAX_EXP);
    Self {
      bins: [0; BIN_COUNT],
      imin: BIN_COUNT,
      imax: 0,
      non_finite: 0.,
      overflow: false,
    }
  };

  /// Construct a fresh, zero-valued superaccumulator. Same as [`Self::ZERO`].
  pub const fn new() -> Self {
    Self::ZERO
  }

  /// Construct a superaccumulator from its raw bins, least significant first.
  ///
  /// The bins need not be normalized; all of them are considered touched.
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// let mut bins = [0; Superaccumulator::BIN_COUNT];
  /// bins[Superaccumulator::F_WORDS] = 3;
  /// assert_eq!(Superaccumulator::from_bins(bins).round(), Ok(3.));
  /// ```
  pub const fn from_bins(bins: [i64; BIN_COUNT]) -> Self {
    Self {
      bins,
      imin: Self::IMIN,
      imax: Self::IMAX,
      non_finite: 0.,
      overflow: false,
    }
  }

  /// The raw bins, least significant first.
  ///
  /// Unless the accumulator has just been [normalized](Self::normalize), several different bin
  /// patterns can represent the same value.
  pub const fn bins(&self) -> &[i64; BIN_COUNT] {
    &self.bins
  }

  /// The weight of bin `i` is `2^bin_exponent(i)`.
  pub(crate) const fn bin_exponent(i: usize) -> i32 {
    Self::DIGITS as i32 * (i as i32 - Self::F_WORDS as i32)
  }

  /// Whether this accumulator represents exactly 0 (and has seen no infinities or NaNs).
  pub fn is_zero(&self) -> bool {
    self.non_finite == 0. && !self.overflow && self.bins.iter().all(|&b| b == 0)
  }

  /// Whether an infinity or a NaN was accumulated.
  pub fn is_non_finite(&self) -> bool {
    self.non_finite != 0.
  }

  /// Whether a carry has escaped the most significant bin. Such an accumulator can no longer be
  /// rounded.
  pub fn has_overflowed(&self) -> bool {
    self.overflow
  }

  /// Whether no bin has been written since the last normalization.
  pub fn is_normalized(&self) -> bool {
    self.imin > self.imax
  }

  /// Mark bin `i` as written since the last normalization.
  #[inline(always)]
  pub(crate) fn touch(&mut self, i: usize) {
    self.imin = self.imin.min(i);
    self.imax = self.imax.max(i);
  }
}

impl Default for Superaccumulator {
  fn default() -> Self {
    Self::ZERO
  }
}
