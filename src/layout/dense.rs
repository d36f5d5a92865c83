use super::*;
use crate::error::Error;
use crate::kernel;

/// A flat slice is the canonical dense vector; `Vec<f64>` and `[f64; N]` forward to it.
impl Vector for [f64] {
  type Category = category::Dense;

  fn check_shape(&self, other: &Self) -> Result<()> {
    if self.len() == other.len() {
      Ok(())
    } else {
      Err(Error::ShapeMismatch { expected: self.len(), got: other.len() })
    }
  }

  fn partial_dot(&self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_shape(other)?;
    log::trace!("dot: dense, {} elements", self.len());
    Ok(kernel::exdot(self, other, config))
  }

  fn partial_dot_weighted(&self, w: &Self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_shape(w)?;
    self.check_shape(other)?;
    log::trace!("weighted dot: dense, {} elements", self.len());
    Ok(kernel::exdot3(self, w, other, config))
  }

  fn partial_sum(&self, config: KernelConfig) -> Result<Superaccumulator> {
    log::trace!("sum: dense, {} elements", self.len());
    Ok(kernel::exsum(self, config))
  }

  fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()> {
    y.check_shape(w)?;
    y.check_shape(x)?;
    for ((y, &w), &x) in y.iter_mut().zip(w).zip(x) {
      *y = axpby(alpha, w, x, beta, *y)
    }
    Ok(())
  }

  fn scal(&mut self, beta: f64) {
    for y in self {
      *y = scale(beta, *y)
    }
  }
}

macro_rules! forward_to_slice {
  ($(#[$attr:meta])* impl $(<$(const $n:ident: usize),*>)? for $ty:ty) => {
    $(#[$attr])*
    impl $(<$(const $n: usize),*>)? Vector for $ty {
      type Category = category::Dense;

      fn check_shape(&self, other: &Self) -> Result<()> {
        self.as_slice().check_shape(other.as_slice())
      }

      fn partial_dot(&self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
        self.as_slice().partial_dot(other.as_slice(), config)
      }

      fn partial_dot_weighted(&self, w: &Self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
        self.as_slice().partial_dot_weighted(w.as_slice(), other.as_slice(), config)
      }

      fn partial_sum(&self, config: KernelConfig) -> Result<Superaccumulator> {
        self.as_slice().partial_sum(config)
      }

      fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()> {
        <[f64]>::symv_into(alpha, w.as_slice(), x.as_slice(), beta, y.as_mut_slice())
      }

      fn scal(&mut self, beta: f64) {
        self.as_mut_slice().scal(beta)
      }
    }
  };
}

forward_to_slice!{impl for Vec<f64>}
forward_to_slice!{impl<const N: usize> for [f64; N]}
