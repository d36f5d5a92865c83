//! Error-free transformations of floating point products.

/// The exact decomposition of a floating point product into a `head` and a `tail`.
///
/// `head` is the correctly rounded product, and `tail` is its rounding error, so that `head +
/// tail`, evaluated in infinite precision, is exactly the real product. Both are fed to a
/// [`Superaccumulator`](crate::Superaccumulator), which makes the accumulated dot product exact.
///
/// The decomposition is exact as long as the product neither overflows nor comes close to the
/// subnormal range (the tail must itself be representable, which needs the exponent of the product
/// to be at least `-1022 + 53`). Products that overflow have an infinite `head`, and their `tail`
/// is meaningless; see [`TwoProduct::is_finite`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoProduct {
  /// The product, rounded to nearest
  pub head: f64,
  /// The rounding error of `head`
  pub tail: f64,
}

impl TwoProduct {
  /// Error-free product of `a` and `b`.
  ///
  /// The tail is recovered with one fused multiply-add, which computes `a·b - head` without any
  /// intermediate rounding.
  ///
  /// # Example
  ///
  /// ```
  /// # use repro_blas::TwoProduct;
  /// let p = TwoProduct::of(1. + f64::EPSILON, 1. - f64::EPSILON);
  /// assert_eq!(p.head, 1.);
  /// assert_eq!(p.tail, -f64::EPSILON * f64::EPSILON);
  /// ```
  #[inline(always)]
  pub fn of(a: f64, b: f64) -> Self {
    let head = a * b;
    let tail = a.mul_add(b, -head);
    Self { head, tail }
  }

  /// Triple product `a·b·c`, **not** error-free in general.
  ///
  /// The product `a·b` is split into `h1 + t1`, and then only the dominant term `h1` is split
  /// again against `c`. The returned pair is exactly `h1·c`; the term `t1·c` is dropped. That term
  /// is at most half an ulp of `a·b` times `c`, so the result is a faithful, but not exact,
  /// representation of the triple product.
  ///
  /// This truncation is intentional, and matches the contract of weighted inner products
  /// `xᵀ W y` elsewhere in the crate: they are reproducible (independent of ordering and
  /// partitioning), but each term carries this one truncation.
  #[inline(always)]
  pub fn of3(a: f64, b: f64, c: f64) -> Self {
    let ab = a * b;
    Self::of(ab, c)
  }

  /// Whether the decomposition is usable by the exact accumulation. An overflowing product has
  /// an infinite `head`, and a `tail` that must not be accumulated.
  #[inline(always)]
  pub fn is_finite(self) -> bool {
    self.head.is_finite()
  }
}
