use super::*;

impl Superaccumulator {
  /// Add the value of `other` into `self`, exactly.
  ///
  /// Merging is associative and commutative, like accumulating: however a set of inputs is split
  /// among accumulators, merging them all gives the same value as accumulating all inputs into
  /// one. This is what makes parallel and distributed reductions reproducible.
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::Superaccumulator;
  /// let a = Superaccumulator::from_iter([1e300, 0.5]);
  /// let b = Superaccumulator::from_iter([-1e300, 0.25]);
  /// let mut merged = a.clone();
  /// merged.merge(&b);
  /// assert_eq!(merged.round(), Ok(0.75));
  /// ```
  pub fn merge(&mut self, other: &Self) {
    for (i, &word) in other.bins.iter().enumerate() {
      if word != 0 {
        self.accumulate_word(i, word)
      }
    }
    self.non_finite += other.non_finite;
    self.overflow |= other.overflow;
  }
}

impl core::ops::AddAssign<f64> for Superaccumulator {
  fn add_assign(&mut self, rhs: f64) {
    self.accumulate(rhs)
  }
}

impl core::ops::SubAssign<f64> for Superaccumulator {
  fn sub_assign(&mut self, rhs: f64) {
    self.accumulate(-rhs)
  }
}

impl core::ops::AddAssign<&Superaccumulator> for Superaccumulator {
  fn add_assign(&mut self, rhs: &Superaccumulator) {
    self.merge(rhs)
  }
}

impl core::ops::AddAssign<Superaccumulator> for Superaccumulator {
  fn add_assign(&mut self, rhs: Superaccumulator) {
    self.merge(&rhs)
  }
}

impl From<f64> for Superaccumulator {
  fn from(value: f64) -> Self {
    let mut acc = Self::ZERO;
    acc.accumulate(value);
    acc
  }
}

impl Extend<f64> for Superaccumulator {
  fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
    for x in iter {
      self.accumulate(x)
    }
  }
}

impl FromIterator<f64> for Superaccumulator {
  fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
    let mut acc = Self::ZERO;
    acc.extend(iter);
    acc
  }
}

impl core::iter::Sum for Superaccumulator {
  fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
    iter.fold(Self::ZERO, |mut acc, x| { acc += x; acc })
  }
}
