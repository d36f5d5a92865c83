use super::*;
use crate::eft::TwoProduct;

impl Superaccumulator {
  /// The core algorithm of the superaccumulator: adding the integer `x` to bin `i`.
  ///
  /// Bins have [`KRX`](Self::KRX) bits of headroom, so almost always this is a single integer
  /// add. Only if that add overflows the `i64` is a carry propagated into the next bin up.
  #[inline(always)]
  pub(crate) fn accumulate_word(&mut self, i: usize, x: i64) {
    self.touch(i);
    let (sum, overflow) = self.bins[i].overflowing_add(x);
    if !overflow {
      self.bins[i] = sum;
    } else {
      self.carry_from(i, x)
    }
  }

  /// Slow path of [`Self::accumulate_word`]: `bins[i] + x` does not fit in an `i64`.
  ///
  /// The exact sum is split into its low [`DIGITS`](Self::DIGITS) bits, which stay in bin `i`,
  /// and a carry, which is added to bin `i + 1` (and so on, if that overflows too).
  #[cold]
  fn carry_from(&mut self, mut i: usize, mut x: i64) {
    loop {
      let exact = i128::from(self.bins[i]) + i128::from(x);
      if i == Self::IMAX {
        // There is no bin to carry into: the value has left the range of the accumulator.
        log::warn!("superaccumulator range overflow: a carry escaped bin {i}");
        self.bins[i] = exact as i64;
        self.overflow = true;
        return
      }
      // `|exact| < 2^64`, so the carry is at most `2^KRX` in magnitude.
      let carry = (exact >> Self::DIGITS) as i64;
      self.bins[i] = (exact & i128::from(Self::DIGITS_MASK)) as i64;
      i += 1;
      x = carry;
      self.touch(i);
      let (sum, overflow) = self.bins[i].overflowing_add(x);
      if !overflow {
        self.bins[i] = sum;
        return
      }
    }
  }

  /// Add a single `f64` to the accumulator, exactly.
  ///
  /// The value is split into (at most three) signed integer *digits*, one per bin whose
  /// binade range it straddles, from the most significant down. Infinities and NaNs bypass the
  /// bins, see [`Self::round`].
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// let mut acc = Superaccumulator::ZERO;
  /// acc.accumulate(0.1);
  /// acc.accumulate(0.2);
  /// acc.accumulate(-0.3);
  /// // Exactly 2^-55, whereas `0.1 + 0.2 - 0.3` gives 2^-54.
  /// assert_eq!(acc.round(), Ok(2f64.powi(-55)));
  /// ```
  pub fn accumulate(&mut self, x: f64) {
    if x == 0. {
      return
    }
    if !x.is_finite() {
      self.non_finite += x;
      return
    }

    // The bin containing the most significant bit of `x` (or the one above it).
    //
    // `exponent` is in `-1023 ..= 1023`, and the division truncates towards 0, so `exp_word` is
    // in `-18 ..= 18` and `iup` in `2 ..= 38`.
    let exp_word = float::exponent(x) / Self::DIGITS as i32;
    let iup = (exp_word + Self::F_WORDS as i32) as usize;

    // Scale `x` so that the digit of bin `iup` is its integer part. This multiplication by a power
    // of two is exact, and `|scaled| < 2^56`.
    let mut scaled = x * float::pow2(-(Self::DIGITS as i32) * exp_word);

    // Peel off one digit per bin, from the most significant down, until nothing is left. Each
    // digit is rounded to nearest, so it may be negative; the remainder `scaled - digit` is exact
    // and at most 1/2 in magnitude, and is then scaled up to the next bin down.
    //
    // Since the least significant bin lies below the smallest subnormal, this always terminates
    // with `scaled == 0` at or above bin 0.
    let mut i = iup;
    loop {
      let digit = scaled.round_ties_even();
      if digit != 0. {
        self.accumulate_word(i, digit as i64);
      }
      scaled = (scaled - digit) * Self::DELTASCALE;
      if scaled == 0. || i == Self::IMIN {
        break
      }
      i -= 1;
    }
    debug_assert_eq!(scaled, 0.);
  }

  /// Add each of `xs` to the accumulator. The order is irrelevant to the result.
  ///
  /// Zeros are skipped, so padding a partial chunk with zeros does not change anything.
  #[inline]
  pub fn accumulate_all(&mut self, xs: &[f64]) {
    for &x in xs {
      self.accumulate(x)
    }
  }

  /// Add the product `a·b` to the accumulator, exactly: both terms of its [`TwoProduct`] are
  /// accumulated.
  ///
  /// Products that overflow are routed, like other infinities, around the bins.
  #[inline]
  pub fn add_prod(&mut self, a: f64, b: f64) {
    self.accumulate_product(TwoProduct::of(a, b))
  }

  /// Add the triple product `a·b·c`, subject to the truncation documented in
  /// [`TwoProduct::of3`].
  #[inline]
  pub fn add_prod3(&mut self, a: f64, b: f64, c: f64) {
    self.accumulate_product(TwoProduct::of3(a, b, c))
  }

  /// Add both terms of an error-free product.
  #[inline]
  pub fn accumulate_product(&mut self, p: TwoProduct) {
    self.accumulate(p.head);
    if p.is_finite() {
      self.accumulate(p.tail);
    }
  }
}
