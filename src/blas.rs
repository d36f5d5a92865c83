//! The public reductions and pointwise/matrix-vector operations.
//!
//! All reductions are *reproducible*: the result is the correctly rounded value of the exact
//! result, and is thus bit-identical regardless of the order of the elements, the number of
//! worker threads, or how a [`Distributed`](crate::Distributed) vector is split across a process
//! group.
//!
//! The operands of a reduction are all of the same type `V`; see [`Vector`] for the layouts
//! supported. Mixing layouts, or element types other than `f64`, does not compile.
//!
//! # Example
//!
//! ```
//! use repro_blas::blas;
//!
//! let x = vec![1e16, 1., -1e16, 1., 1., -1.];
//! let ones = vec![1.; x.len()];
//! // A naive left-to-right sum gives 1. here.
//! assert_eq!(blas::dot(&x, &ones), Ok(2.));
//! assert_eq!(blas::sum(&x), Ok(2.));
//! ```

use crate::error::{Error, Result};
use crate::kernel::{self, KernelConfig};
use crate::matrix::DenseMatrix;
use crate::{Superaccumulator, Vector};

/// Combine one partial accumulator across whatever `v` spans.
fn combine_one<V: Vector + ?Sized>(v: &V, partial: Superaccumulator) -> Result<Superaccumulator> {
  v.combine(vec![partial])?.pop().ok_or_else(|| Error::Collective {
    reason: "combine returned no accumulator".into(),
  })
}

/// The exact dot product `Σ x[i]·y[i]`, as an accumulator, before rounding. Use this to add up
/// several inner products before rounding only once.
///
/// For distributed vectors this is a collective, and the returned accumulator is the group-wide
/// one, identical on every member.
pub fn dot_superacc<V: Vector + ?Sized>(x: &V, y: &V) -> Result<Superaccumulator> {
  dot_superacc_with(x, y, KernelConfig::default())
}

/// [`dot_superacc`], with the given kernel configuration.
pub fn dot_superacc_with<V: Vector + ?Sized>(x: &V, y: &V, config: KernelConfig) -> Result<Superaccumulator> {
  let partial = x.partial_dot(y, config)?;
  let mut acc = combine_one(x, partial)?;
  acc.normalize();
  Ok(acc)
}

/// The weighted dot product `Σ x[i]·w[i]·y[i]`, as an accumulator, before rounding.
///
/// The weights `w` are the diagonal of a diagonal matrix `M`, so this is `xᵀ·M·y`. Each term is
/// computed as described in [`TwoProduct::of3`](crate::TwoProduct::of3): the exact value of
/// `fl(x[i]·w[i])·y[i]`.
pub fn dot_superacc_weighted<V: Vector + ?Sized>(x: &V, w: &V, y: &V) -> Result<Superaccumulator> {
  dot_superacc_weighted_with(x, w, y, KernelConfig::default())
}

/// [`dot_superacc_weighted`], with the given kernel configuration.
pub fn dot_superacc_weighted_with<V: Vector + ?Sized>(x: &V, w: &V, y: &V, config: KernelConfig) -> Result<Superaccumulator> {
  let partial = x.partial_dot_weighted(w, y, config)?;
  let mut acc = combine_one(x, partial)?;
  acc.normalize();
  Ok(acc)
}

/// The dot product `Σ x[i]·y[i]`, correctly rounded.
///
/// Fails if `x` and `y` do not have the same shape, or (for distributed vectors, in debug builds)
/// do not live on the same process group. If any product is infinite or NaN, so is the result.
pub fn dot<V: Vector + ?Sized>(x: &V, y: &V) -> Result<f64> {
  dot_with(x, y, KernelConfig::default())
}

/// [`dot`], with the given kernel configuration. The configuration never changes the result.
pub fn dot_with<V: Vector + ?Sized>(x: &V, y: &V, config: KernelConfig) -> Result<f64> {
  dot_superacc_with(x, y, config)?.round()
}

/// The weighted dot product `xᵀ·M·y = Σ x[i]·w[i]·y[i]`, for the diagonal matrix `M` with
/// diagonal `w`, correctly rounded (up to the truncation documented in
/// [`dot_superacc_weighted`]).
pub fn dot_weighted<V: Vector + ?Sized>(x: &V, w: &V, y: &V) -> Result<f64> {
  dot_superacc_weighted(x, w, y)?.round()
}

/// The squared weighted norm `xᵀ·M·x`, for the diagonal matrix `M` with diagonal `w`.
pub fn dot_self<V: Vector + ?Sized>(w: &V, x: &V) -> Result<f64> {
  dot_weighted(x, w, x)
}

/// The sum `Σ x[i]`, correctly rounded.
pub fn sum<V: Vector + ?Sized>(x: &V) -> Result<f64> {
  sum_with(x, KernelConfig::default())
}

/// [`sum`], with the given kernel configuration.
pub fn sum_with<V: Vector + ?Sized>(x: &V, config: KernelConfig) -> Result<f64> {
  let partial = x.partial_sum(config)?;
  combine_one(x, partial)?.round()
}

/// Several dot products at once, each correctly rounded. For distributed vectors, all of them are
/// combined in a single collective round, rather than one per pair.
///
/// Every shape is checked before anything is accumulated.
pub fn dot_batch<V: Vector + ?Sized>(pairs: &[(&V, &V)]) -> Result<Vec<f64>> {
  let Some(&(first, _)) = pairs.first() else {
    return Ok(Vec::new())
  };
  for &(x, y) in pairs {
    x.check_shape(y)?
  }
  log::trace!("dot batch: {} pairs", pairs.len());
  let config = KernelConfig::default();
  let partials = pairs.iter()
    .map(|&(x, y)| x.partial_dot(y, config))
    .collect::<Result<Vec<_>>>()?;
  first.combine(partials)?.iter().map(Superaccumulator::round).collect()
}

/// The diagonal matrix-vector product `y ← α·W·x + β·y`, where `W` is the diagonal matrix with
/// diagonal `w`. This is pointwise and involves no reduction, so it is reproducible as is.
///
/// If `α == 0`, `x` and `w` are not read, and this is `y ← β·y`. If `β == 0`, `y` is not read
/// (so NaNs in it do not propagate). Fails, without writing to `y`, if the shapes of `w`, `x` and
/// `y` differ.
pub fn symv<V: Vector + ?Sized>(alpha: f64, w: &V, x: &V, beta: f64, y: &mut V) -> Result<()> {
  y.check_shape(w)?;
  y.check_shape(x)?;
  if alpha == 0. {
    y.scal(beta);
    return Ok(())
  }
  V::symv_into(alpha, w, x, beta, y)
}

/// The diagonal matrix-vector product `y ← W·x`, where `W` is the diagonal matrix with diagonal
/// `w`.
pub fn pointwise<V: Vector + ?Sized>(w: &V, x: &V, y: &mut V) -> Result<()> {
  symv(1., w, x, 0., y)
}

/// The dense matrix-vector product `y ← A·x`, where each element of `y` is the correctly
/// rounded inner product of a row of `A` with `x`.
///
/// Fails if `x` does not have one element per column of `A`, or `y` one per row.
pub fn gemv(a: &DenseMatrix, x: &[f64], y: &mut [f64]) -> Result<()> {
  gemv_with(a, x, y, KernelConfig::default())
}

/// [`gemv`], with the given kernel configuration.
pub fn gemv_with(a: &DenseMatrix, x: &[f64], y: &mut [f64], config: KernelConfig) -> Result<()> {
  if x.len() != a.cols() {
    return Err(Error::ShapeMismatch { expected: a.cols(), got: x.len() })
  }
  if y.len() != a.rows() {
    return Err(Error::ShapeMismatch { expected: a.rows(), got: y.len() })
  }
  log::trace!("gemv: {}×{}", a.rows(), a.cols());
  for (y, row) in y.iter_mut().zip(a.iter_rows()) {
    *y = kernel::exdot(row, x, config).round()?
  }
  Ok(())
}


mod tests_compile_fail {
  /// ```compile_fail
  /// let x: Vec<f32> = vec![1.; 3];
  /// let _ = repro_blas::blas::dot(&x, &x);
  /// ```
  #[allow(dead_code)]
  fn dot_f32() {}

  /// ```compile_fail
  /// let x: Vec<f64> = vec![1.; 3];
  /// let y: [f64; 3] = [1.; 3];
  /// let _ = repro_blas::blas::dot(&x, &y);
  /// ```
  #[allow(dead_code)]
  fn dot_vec_array() {}

  /// ```compile_fail
  /// let x: Vec<f64> = vec![1.; 3];
  /// let _ = repro_blas::blas::dot(&x, &2.);
  /// ```
  #[allow(dead_code)]
  fn dot_vec_scalar() {}

  /// ```compile_fail
  /// use repro_blas::{Distributed, ProcessGroup, SelfComm};
  /// let group = std::sync::Arc::new(ProcessGroup::flat(SelfComm).unwrap());
  /// let x: Vec<f64> = vec![1.; 3];
  /// let y = Distributed::new(x.clone(), group);
  /// let _ = repro_blas::blas::dot(&x, &y);
  /// ```
  #[allow(dead_code)]
  fn dot_dense_distributed() {}

  /// ```compile_fail
  /// use repro_blas::{Distributed, Nested, ProcessGroup, SelfComm};
  /// let group = std::sync::Arc::new(ProcessGroup::flat(SelfComm).unwrap());
  /// let inner = Distributed::new(vec![1.], group.clone());
  /// let x = Distributed::new(Nested(vec![inner]), group);
  /// let _ = repro_blas::blas::sum(&x);
  /// ```
  #[allow(dead_code)]
  fn distributed_of_distributed() {}

  /// ```compile_fail
  /// let x = repro_blas::Nested(vec![1., 2.]);
  /// let _ = repro_blas::blas::sum(&x);
  /// ```
  #[allow(dead_code)]
  fn nested_scalars() {}
}
