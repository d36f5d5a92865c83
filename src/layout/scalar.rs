use super::*;

/// A bare `f64` is a vector of one element, and reduces without any loop.
impl Vector for f64 {
  type Category = category::Scalar;

  fn check_shape(&self, _other: &Self) -> Result<()> {
    Ok(())
  }

  fn partial_dot(&self, other: &Self, _config: KernelConfig) -> Result<Superaccumulator> {
    let mut acc = Superaccumulator::ZERO;
    acc.add_prod(*self, *other);
    Ok(acc)
  }

  fn partial_dot_weighted(&self, w: &Self, other: &Self, _config: KernelConfig) -> Result<Superaccumulator> {
    let mut acc = Superaccumulator::ZERO;
    acc.add_prod3(*self, *w, *other);
    Ok(acc)
  }

  fn partial_sum(&self, _config: KernelConfig) -> Result<Superaccumulator> {
    Ok(Superaccumulator::from(*self))
  }

  fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()> {
    *y = axpby(alpha, *w, *x, beta, *y);
    Ok(())
  }

  fn scal(&mut self, beta: f64) {
    *self = scale(beta, *self)
  }
}
