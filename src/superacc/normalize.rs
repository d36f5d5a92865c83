use super::*;

impl Superaccumulator {
  /// Propagate carries so that every bin but the most significant holds exactly
  /// [`DIGITS`](Self::DIGITS) bits, in `0 .. 2^DIGITS`, and the most significant bin holds the
  /// remaining (signed) carry. Returns whether the represented value is negative.
  ///
  /// Only the bins written since the last normalization, and the bins their carries reach, are
  /// visited. Normalizing is idempotent, and does not change the represented value.
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// let mut acc = Superaccumulator::ZERO;
  /// acc += -0.75;
  /// assert!(acc.normalize());
  /// // -0.75 = -1 + 1/4
  /// assert_eq!(acc.bins()[Superaccumulator::IMAX], -1);
  /// assert_eq!(acc.bins()[19], 1 << 54);
  /// ```
  pub fn normalize(&mut self) -> bool {
    if !self.is_normalized() {
      self.normalize_range(self.imin, self.imax)
    }
    self.is_negative_normalized()
  }

  /// Propagate carries starting from bin `imin`, through at least bin `imax`, and then upwards
  /// for as long as there is a carry.
  ///
  /// Bins above `imax` that were written since the last normalization are visited too, so only
  /// `imin` may be narrower than the touched range: bins below it are left as they are, and stay
  /// marked as touched.
  pub fn normalize_range(&mut self, imin: usize, imax: usize) {
    debug_assert!(imin <= imax && imax <= Self::IMAX);
    let imax = if self.is_normalized() {imax} else {imax.max(self.imax)};
    let mut carry = 0_i64;
    let mut i = imin;
    while i < Self::IMAX {
      if i > imax && carry == 0 {
        break
      }
      // `|exact| < 2^63 + 2^8`, so the carry out is less than `2^8` in magnitude.
      let exact = i128::from(self.bins[i]) + i128::from(carry);
      carry = (exact >> Self::DIGITS) as i64;
      self.bins[i] = (exact & i128::from(Self::DIGITS_MASK)) as i64;
      i += 1;
    }

    // The most significant bin absorbs the last carry whole, rather than passing it on, so no
    // information is lost.
    if i == Self::IMAX && carry != 0 {
      let (top, overflow) = self.bins[Self::IMAX].overflowing_add(carry);
      self.bins[Self::IMAX] = top;
      if overflow {
        log::warn!("superaccumulator range overflow while normalizing");
        self.overflow = true;
      }
    }

    // Everything from `imin` up is normalized now; anything touched below it is not.
    if self.imin >= imin {
      self.imin = BIN_COUNT;
      self.imax = 0;
    } else {
      self.imax = imin - 1;
    }
  }

  /// Sign of a normalized accumulator: all bins but the most significant are non-negative, so the
  /// sign is that of the most significant one.
  #[inline]
  pub(crate) fn is_negative_normalized(&self) -> bool {
    debug_assert!(self.is_normalized());
    self.bins[Self::IMAX] < 0
  }
}
