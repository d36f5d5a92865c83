use super::*;
use crate::error::Error;

/// A vector of sub-vectors, e.g. the components of a vector field, each a dense array.
///
/// Reductions over a nested vector recurse into each component, and merge the components'
/// accumulators, so the result is bit-identical to the same reduction over the concatenation of
/// all components.
///
/// Components may also be [`Distributed`](crate::Distributed), all over the same process group.
/// The components' partial accumulators are then merged locally and combined over the group in a
/// single round of collectives, by the first component. Every member must hold the same number
/// of components.
///
/// # Example
///
/// ```
/// # use repro_blas::{Nested, blas};
/// let x = Nested(vec![vec![1e16, 1.], vec![-1e16, 1., 1., -1.]]);
/// let ones = Nested(vec![vec![1.; 2], vec![1.; 4]]);
/// assert_eq!(blas::dot(&x, &ones), Ok(2.));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nested<V>(pub Vec<V>);

impl<V> core::ops::Deref for Nested<V> {
  type Target = Vec<V>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl<V> core::ops::DerefMut for Nested<V> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl<V> From<Vec<V>> for Nested<V> {
  fn from(value: Vec<V>) -> Self {
    Self(value)
  }
}

impl<V> FromIterator<V> for Nested<V> {
  fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<V: Vector<Category: Component>> Nested<V> {
  /// Merge one partial accumulator per component into one.
  fn merge_components(
    &self,
    mut component: impl FnMut(usize) -> Result<Superaccumulator>,
  ) -> Result<Superaccumulator> {
    let mut acc = Superaccumulator::ZERO;
    for i in 0 .. self.len() {
      let mut sub = component(i)?;
      sub.normalize();
      acc += &sub;
      acc.normalize();
    }
    Ok(acc)
  }
}

impl<V: Vector<Category: Component>> Vector for Nested<V> {
  type Category = <V::Category as Component>::Nested;

  fn check_shape(&self, other: &Self) -> Result<()> {
    if self.len() != other.len() {
      return Err(Error::NestingMismatch { expected: self.len(), got: other.len() })
    }
    for (a, b) in self.iter().zip(other.iter()) {
      a.check_shape(b)?
    }
    Ok(())
  }

  fn partial_dot(&self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_shape(other)?;
    log::trace!("dot: nested, {} components", self.len());
    self.merge_components(|i| self[i].partial_dot(&other[i], config))
  }

  fn partial_dot_weighted(&self, w: &Self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_shape(w)?;
    self.check_shape(other)?;
    log::trace!("weighted dot: nested, {} components", self.len());
    self.merge_components(|i| self[i].partial_dot_weighted(&w[i], &other[i], config))
  }

  fn partial_sum(&self, config: KernelConfig) -> Result<Superaccumulator> {
    log::trace!("sum: nested, {} components", self.len());
    self.merge_components(|i| self[i].partial_sum(config))
  }

  fn combine(&self, partials: Vec<Superaccumulator>) -> Result<Vec<Superaccumulator>> {
    match self.first() {
      Some(first) => first.combine(partials),
      None => Ok(partials),
    }
  }

  fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()> {
    y.check_shape(w)?;
    y.check_shape(x)?;
    for ((y, w), x) in y.iter_mut().zip(w.iter()).zip(x.iter()) {
      V::symv_into(alpha, w, x, beta, y)?
    }
    Ok(())
  }

  fn scal(&mut self, beta: f64) {
    for y in self.iter_mut() {
      y.scal(beta)
    }
  }
}
