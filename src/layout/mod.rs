//! Layout dispatch: one reduction, implemented once per *layout category* of its operands.
//!
//! Every operand type implements [`Vector`], whose associated [`Category`] is one of the four
//! uninhabited tags in [`category`]:
//!
//!   - [`Scalar`](category::Scalar): a bare `f64`.
//!   - [`Dense`](category::Dense): a flat slice, `Vec` or array of `f64`.
//!   - [`Nested`](category::Nested): a [`Nested`](crate::Nested) collection of sub-vectors, each
//!     itself dense or nested.
//!   - [`Distributed`](category::Distributed): a dense or nested vector local to one member of a
//!     [process group](crate::ProcessGroup), see [`Distributed`](crate::Distributed). A
//!     [`Nested`](crate::Nested) collection of distributed vectors is distributed as a whole.
//!
//! Dispatch is entirely static: the operations of this crate take both operands as the *same*
//! type `V: Vector`, so mixing categories (or element types other than `f64`) is rejected by the
//! type checker at the call site.
//!
//! Reductions are split in two halves. The *partial* reductions accumulate everything local to
//! the calling thread into a [`Superaccumulator`](crate::Superaccumulator), and [`Vector::combine`]
//! then merges those partials across whatever the vector spans (nothing for local vectors, the
//! whole process group for distributed ones).

use crate::error::Result;
use crate::kernel::KernelConfig;
use crate::Superaccumulator;

mod scalar;
mod dense;
mod nested;
mod distributed;

pub use nested::Nested;
pub use distributed::Distributed;

mod sealed {
  pub trait Sealed {}
}

/// The layout category tags. These types are uninhabited: they only ever appear as
/// [`Vector::Category`].
pub mod category {
  /// A single `f64`.
  #[derive(Debug)]
  pub enum Scalar {}

  /// A flat array of `f64`s in one address space.
  #[derive(Debug)]
  pub enum Dense {}

  /// An ordered collection of sub-vectors.
  #[derive(Debug)]
  pub enum Nested {}

  /// A vector split across a process group, or a nested collection of such vectors.
  #[derive(Debug)]
  pub enum Distributed {}

  impl super::sealed::Sealed for Scalar {}
  impl super::sealed::Sealed for Dense {}
  impl super::sealed::Sealed for Nested {}
  impl super::sealed::Sealed for Distributed {}

  impl super::Category for Scalar { const NAME: &'static str = "scalar"; }
  impl super::Category for Dense { const NAME: &'static str = "dense"; }
  impl super::Category for Nested { const NAME: &'static str = "nested"; }
  impl super::Category for Distributed { const NAME: &'static str = "distributed"; }

  impl super::Component for Dense { type Nested = Nested; }
  impl super::Component for Nested { type Nested = Nested; }
  impl super::Component for Distributed { type Nested = Distributed; }

  impl super::Local for Dense {}
  impl super::Local for Nested {}
}

/// A layout category. Sealed: the four categories in [`category`] are all there is.
pub trait Category: sealed::Sealed + 'static {
  /// Name, for logging.
  const NAME: &'static str;
}

/// The categories that can be components of a [`Nested`] vector: all but scalars.
pub trait Component: Category {
  /// The category of a [`Nested`] vector with components of this category.
  type Nested: Category;
}

/// The categories whose data lives entirely in the calling thread's address space, and which can
/// thus be the local part of a [`Distributed`].
pub trait Local: Component {}

/// A vector of `f64`s, of some [`Category`].
///
/// Operands of a binary (or ternary) operation are always of the same type, so each method only
/// needs to handle its own category.
pub trait Vector {
  /// The layout category.
  type Category: Category;

  /// Check that `other` has the same shape as `self`: the same length if dense, the same number
  /// of components (each of the same shape) if nested.
  fn check_shape(&self, other: &Self) -> Result<()>;

  /// Accumulate the exact dot product of the local parts of `self` and `other`.
  ///
  /// Shapes are checked before anything is accumulated.
  fn partial_dot(&self, other: &Self, config: KernelConfig) -> Result<Superaccumulator>;

  /// Accumulate the weighted dot product `Σ self[i]·w[i]·other[i]` of the local parts, subject to
  /// the truncation of [`TwoProduct::of3`](crate::TwoProduct::of3).
  ///
  /// Shapes are checked before anything is accumulated.
  fn partial_dot_weighted(&self, w: &Self, other: &Self, config: KernelConfig) -> Result<Superaccumulator>;

  /// Accumulate the exact sum of the local part.
  fn partial_sum(&self, config: KernelConfig) -> Result<Superaccumulator>;

  /// Combine partial accumulators, one per reduction, into the complete ones: across the whole
  /// process group for a distributed vector. For the local categories there is nothing to
  /// combine.
  ///
  /// For distributed vectors this is a collective: every member of the group must call it, with
  /// the same number of accumulators.
  fn combine(&self, partials: Vec<Superaccumulator>) -> Result<Vec<Superaccumulator>> {
    Ok(partials)
  }

  /// Pointwise `y ← α·w·x + β·y`. If `β == 0`, `y` is overwritten without being read.
  fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()>;

  /// Pointwise `self ← β·self`. If `β == 0`, `self` is zeroed without being read.
  fn scal(&mut self, beta: f64);
}

/// `y ← α·w·x + β·y` on single elements, the pointwise core of every [`Vector::symv_into`].
#[inline(always)]
pub(crate) fn axpby(alpha: f64, w: f64, x: f64, beta: f64, y: f64) -> f64 {
  if beta == 0. {alpha * w * x} else {alpha * w * x + beta * y}
}

/// `y ← β·y` on single elements.
#[inline(always)]
pub(crate) fn scale(beta: f64, y: f64) -> f64 {
  if beta == 0. {0.} else {beta * y}
}
