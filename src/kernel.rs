//! The local reduction kernel: exact sums and dot products of dense slices into a
//! [`Superaccumulator`].
//!
//! Inputs are processed in chunks of [`LANES`] elements. Within a chunk, all the error-free
//! products are computed first (a straight-line loop the compiler can vectorise), and only then
//! fed to the accumulator. A remainder shorter than a chunk is zero-padded and goes through the
//! same code; zeros never touch the bins, so padding changes nothing.
//!
//! With the `rayon` feature, long inputs are additionally split into contiguous parts, each
//! reduced by one worker into a private accumulator, and the parts are merged. Since merging is
//! exact, neither the chunking nor the number of workers can change the result.

use crate::{Superaccumulator, TwoProduct};
use core::ops::Range;

/// Number of elements per chunk.
pub const LANES: usize = 8;

/// Runtime knobs of the kernel. None of them affect the result, only how work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
  /// The minimum number of elements each worker must own before an input is split across
  /// several workers. Inputs shorter than twice this run on the calling thread.
  pub min_par_len: usize,
}

impl KernelConfig {
  /// Never split work across workers.
  pub const SERIAL: Self = Self { min_par_len: usize::MAX };
}

impl Default for KernelConfig {
  fn default() -> Self {
    Self { min_par_len: 1 << 14 }
  }
}

/// Accumulate one chunk of products `x[i]·y[i]`.
#[inline(always)]
pub(crate) fn dot_chunk(acc: &mut Superaccumulator, x: &[f64; LANES], y: &[f64; LANES]) {
  let products: [TwoProduct; LANES] = core::array::from_fn(|i| TwoProduct::of(x[i], y[i]));
  for p in products {
    acc.accumulate_product(p)
  }
}

/// Accumulate one chunk of triple products `x[i]·w[i]·y[i]`.
#[inline(always)]
fn dot3_chunk(acc: &mut Superaccumulator, x: &[f64; LANES], w: &[f64; LANES], y: &[f64; LANES]) {
  let products: [TwoProduct; LANES] = core::array::from_fn(|i| TwoProduct::of3(x[i], w[i], y[i]));
  for p in products {
    acc.accumulate_product(p)
  }
}

/// Copy a partial chunk into a zero-padded full one.
#[inline]
fn padded(rest: &[f64]) -> [f64; LANES] {
  let mut chunk = [0.; LANES];
  chunk[.. rest.len()].copy_from_slice(rest);
  chunk
}

/// Add the exact dot product of `x` and `y` to `acc`, on the calling thread. The slices must have
/// the same length.
pub fn exdot_into(acc: &mut Superaccumulator, x: &[f64], y: &[f64]) {
  debug_assert_eq!(x.len(), y.len());
  let (xs, x_rest) = x.as_chunks::<LANES>();
  let (ys, y_rest) = y.as_chunks::<LANES>();
  for (x, y) in xs.iter().zip(ys) {
    dot_chunk(acc, x, y)
  }
  if !x_rest.is_empty() {
    dot_chunk(acc, &padded(x_rest), &padded(y_rest))
  }
}

/// Add the weighted dot product `Σ x[i]·w[i]·y[i]` to `acc`, on the calling thread. Each term is
/// subject to the truncation of [`TwoProduct::of3`]. The slices must have the same length.
pub fn exdot3_into(acc: &mut Superaccumulator, x: &[f64], w: &[f64], y: &[f64]) {
  debug_assert_eq!(x.len(), w.len());
  debug_assert_eq!(x.len(), y.len());
  let (xs, x_rest) = x.as_chunks::<LANES>();
  let (ws, w_rest) = w.as_chunks::<LANES>();
  let (ys, y_rest) = y.as_chunks::<LANES>();
  for ((x, w), y) in xs.iter().zip(ws).zip(ys) {
    dot3_chunk(acc, x, w, y)
  }
  if !x_rest.is_empty() {
    dot3_chunk(acc, &padded(x_rest), &padded(w_rest), &padded(y_rest))
  }
}

/// Add the exact sum of `x` to `acc`, on the calling thread.
pub fn exsum_into(acc: &mut Superaccumulator, x: &[f64]) {
  acc.accumulate_all(x)
}

/// The exact dot product of `x` and `y`, possibly using several workers.
pub fn exdot(x: &[f64], y: &[f64], config: KernelConfig) -> Superaccumulator {
  debug_assert_eq!(x.len(), y.len());
  reduce(x.len(), config, |range, acc| exdot_into(acc, &x[range.clone()], &y[range]))
}

/// The weighted dot product `Σ x[i]·w[i]·y[i]`, possibly using several workers.
pub fn exdot3(x: &[f64], w: &[f64], y: &[f64], config: KernelConfig) -> Superaccumulator {
  debug_assert_eq!(x.len(), w.len());
  debug_assert_eq!(x.len(), y.len());
  reduce(x.len(), config, |range, acc| exdot3_into(acc, &x[range.clone()], &w[range.clone()], &y[range]))
}

/// The exact sum of `x`, possibly using several workers.
pub fn exsum(x: &[f64], config: KernelConfig) -> Superaccumulator {
  reduce(x.len(), config, |range, acc| exsum_into(acc, &x[range]))
}

/// The number of workers to split `len` elements across.
fn worker_count(len: usize, config: KernelConfig) -> usize {
  #[cfg(feature = "rayon")]
  let available = rayon::current_num_threads();
  #[cfg(not(feature = "rayon"))]
  let available = 1;
  (len / config.min_par_len.max(1)).clamp(1, available)
}

/// Reduce the index range `0 .. len` by calling `f` on contiguous sub-ranges, each with a private
/// accumulator, and merge the results.
fn reduce<F>(len: usize, config: KernelConfig, f: F) -> Superaccumulator
where
  F: Fn(Range<usize>, &mut Superaccumulator) + Sync,
{
  let workers = worker_count(len, config);
  log::trace!("kernel: reducing {len} elements with {workers} worker(s)");

  #[cfg(feature = "rayon")]
  {
    if workers > 1 {
      use rayon::prelude::*;
      // Part boundaries are rounded to whole chunks, so only the last part has a partial chunk.
      let chunks = len.div_ceil(LANES);
      let bound = |p: usize| (p * chunks / workers * LANES).min(len);
      return (0 .. workers)
        .into_par_iter()
        .map(|p| {
          let mut acc = Superaccumulator::ZERO;
          f(bound(p) .. bound(p + 1), &mut acc);
          acc.normalize();
          acc
        })
        .reduce(|| Superaccumulator::ZERO, |mut a, b| {
          a += &b;
          a.normalize();
          a
        })
    }
  }

  let mut acc = Superaccumulator::ZERO;
  f(0 .. len, &mut acc);
  acc
}
