use crate::error::{Error, Result};
use crate::float;

/// A *superaccumulator*: a fixed-point accumulator that represents sums and dot products of `f64`s
/// with **no** intermediate rounding whatsoever.
///
/// The value is held in [`BIN_COUNT`](Self::BIN_COUNT) signed 64-bit *bins*. Bin `i` carries
/// weight `2^(DIGITS · (i - F_WORDS))`, so together the bins cover every binade of `f64`, from
/// the smallest subnormal to [`f64::MAX`]. Each bin holds [`DIGITS`](Self::DIGITS) "real"
/// digits plus [`KRX`](Self::KRX) carry-save bits, so that many additions can land in the same
/// bin before a carry needs to be propagated.
///
/// Because the bins are just integers, accumulating is associative and commutative: the same set
/// of inputs produces the same represented value regardless of order, chunking, the number of
/// workers, or how the inputs were partitioned across processes. Only the final
/// [`round`](Self::round) rounds, exactly once, to the nearest `f64` (ties to even).
///
/// # Example
///
/// ```
/// # use repro_blas::Superaccumulator;
/// let mut acc = Superaccumulator::ZERO;
/// for x in [1e16, 1., -1e16, 1., 1., -1.] {
///   acc += x;
/// }
/// assert_eq!(acc.round(), Ok(2.));
/// ```
//
// Besides the bins, the accumulator keeps three pieces of bookkeeping:
//
//   - `imin ..= imax`, the bins written since the last normalization (empty when `imin > imax`),
//     so that normalization only propagates carries from the lowest touched bin;
//   - `non_finite`, the plain IEEE sum of all infinite and NaN inputs, which never touch the
//     bins;
//   - `overflow`, set if a carry ever escapes the most significant bin.
#[derive(Clone)]
pub struct Superaccumulator {
  pub(crate) bins: [i64; BIN_COUNT],
  pub(crate) imin: usize,
  pub(crate) imax: usize,
  pub(crate) non_finite: f64,
  pub(crate) overflow: bool,
}

/// Number of bins, see [`Superaccumulator::BIN_COUNT`].
pub(crate) const BIN_COUNT: usize = 39;

/// Basic constants and functions, such as the bin layout, construction, and inspection.
mod basics;

/// Accumulating single `f64`s and products into the bins.
mod accumulate;

/// Carry propagation.
mod normalize;

/// Rounding to the nearest `f64`.
mod round;

/// Operator impls, merging, and conversions.
mod ops;

/// Conversion to an exact rational, for testing against an oracle.
#[cfg(test)]
pub(crate) mod rational;

impl core::fmt::Debug for Superaccumulator {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let first = self.bins.iter().position(|&b| b != 0);
    let last = self.bins.iter().rposition(|&b| b != 0);
    let mut s = f.debug_struct("Superaccumulator");
    match (first, last) {
      (Some(first), Some(last)) => s.field("bins", &(first ..= last, &self.bins[first ..= last])),
      _ => s.field("bins", &"zero"),
    };
    if self.non_finite != 0. {
      s.field("non_finite", &self.non_finite);
    }
    if self.overflow {
      s.field("overflow", &true);
    }
    s.finish()
  }
}
