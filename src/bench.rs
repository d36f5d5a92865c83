//! Re-export some internals for benchmarking purposes; available with feature = "bench".

use crate::kernel::{self, LANES};
use crate::{Superaccumulator, TwoProduct};

impl Superaccumulator {
  pub fn bench_accumulate_word(&mut self, i: usize, x: i64) {
    self.accumulate_word(i, x)
  }

  pub fn bench_dot_chunk(&mut self, x: &[f64; LANES], y: &[f64; LANES]) {
    kernel::dot_chunk(self, x, y)
  }
}

// Export these for inspection with `cargo asm`.

#[unsafe(no_mangle)]
pub fn repro_two_product(a: f64, b: f64) -> TwoProduct {
  TwoProduct::of(a, b)
}

#[unsafe(no_mangle)]
pub fn repro_two_product3(a: f64, b: f64, c: f64) -> TwoProduct {
  TwoProduct::of3(a, b, c)
}

#[unsafe(no_mangle)]
pub fn repro_accumulate(acc: &mut Superaccumulator, x: f64) {
  acc.accumulate(x)
}

#[unsafe(no_mangle)]
pub fn repro_accumulate_product(acc: &mut Superaccumulator, p: TwoProduct) {
  acc.accumulate_product(p)
}

#[unsafe(no_mangle)]
pub fn repro_dot_chunk(acc: &mut Superaccumulator, x: &[f64; LANES], y: &[f64; LANES]) {
  kernel::dot_chunk(acc, x, y)
}

//

#[unsafe(no_mangle)]
pub fn repro_normalize(acc: &mut Superaccumulator) -> bool {
  acc.normalize()
}

#[unsafe(no_mangle)]
pub fn repro_merge(acc: &mut Superaccumulator, other: &Superaccumulator) {
  acc.merge(other)
}

#[unsafe(no_mangle)]
pub fn repro_round(acc: &Superaccumulator) -> f64 {
  acc.round().unwrap_or(f64::NAN)
}
