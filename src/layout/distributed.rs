use super::*;
use crate::comm::{Communicator, ProcessGroup};
use crate::error::Error;
use std::sync::Arc;

/// The part of a vector owned by one member of a [`ProcessGroup`].
///
/// The logical vector is the concatenation, in rank order, of every member's local part; parts
/// may have any length, including zero. Reductions accumulate the local part exactly as for a
/// dense or nested vector, and then [combine](Vector::combine) the partial accumulators over the
/// whole group, so the result is the same on every member, and the same as on a single member
/// holding the whole vector.
///
/// Every reduction over distributed vectors is therefore a collective: all members of the group
/// must call it, in the same order. An error raised on only some members (e.g. a local shape
/// mismatch) leaves the others waiting in the collective; shapes must agree on every member.
#[derive(Debug, Clone)]
pub struct Distributed<V, C: Communicator> {
  local: V,
  group: Arc<ProcessGroup<C>>,
}

impl<V, C: Communicator> Distributed<V, C> {
  /// A vector whose part on this member is `local`. Every member of `group` must build its own.
  pub fn new(local: V, group: Arc<ProcessGroup<C>>) -> Self {
    Self { local, group }
  }

  /// This member's part of the vector.
  pub fn local(&self) -> &V {
    &self.local
  }

  /// This member's part of the vector, mutably. Its shape must stay consistent with the other
  /// operands'.
  pub fn local_mut(&mut self) -> &mut V {
    &mut self.local
  }

  /// The process group the vector is split across.
  pub fn group(&self) -> &Arc<ProcessGroup<C>> {
    &self.group
  }

  /// Take this member's part of the vector.
  pub fn into_local(self) -> V {
    self.local
  }

  /// Check that `other` lives on the same process group. Only in debug builds; release builds
  /// trust the caller.
  fn check_group(&self, other: &Self) -> Result<()> {
    if cfg!(debug_assertions) && !self.group.is_congruent(&other.group) {
      return Err(Error::GroupMismatch)
    }
    Ok(())
  }
}

impl<V: Vector<Category: Local>, C: Communicator> Vector for Distributed<V, C> {
  type Category = category::Distributed;

  fn check_shape(&self, other: &Self) -> Result<()> {
    self.check_group(other)?;
    self.local.check_shape(&other.local)
  }

  fn partial_dot(&self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_group(other)?;
    log::trace!("dot: distributed ({} local), rank {} of {}", <V::Category as Category>::NAME, self.group.rank(), self.group.size());
    self.local.partial_dot(&other.local, config)
  }

  fn partial_dot_weighted(&self, w: &Self, other: &Self, config: KernelConfig) -> Result<Superaccumulator> {
    self.check_group(w)?;
    self.check_group(other)?;
    log::trace!("weighted dot: distributed ({} local), rank {} of {}", <V::Category as Category>::NAME, self.group.rank(), self.group.size());
    self.local.partial_dot_weighted(&w.local, &other.local, config)
  }

  fn partial_sum(&self, config: KernelConfig) -> Result<Superaccumulator> {
    log::trace!("sum: distributed ({} local), rank {} of {}", <V::Category as Category>::NAME, self.group.rank(), self.group.size());
    self.local.partial_sum(config)
  }

  fn combine(&self, partials: Vec<Superaccumulator>) -> Result<Vec<Superaccumulator>> {
    self.group.combine_many(partials)
  }

  fn symv_into(alpha: f64, w: &Self, x: &Self, beta: f64, y: &mut Self) -> Result<()> {
    y.check_group(w)?;
    y.check_group(x)?;
    V::symv_into(alpha, &w.local, &x.local, beta, &mut y.local)
  }

  fn scal(&mut self, beta: f64) {
    self.local.scal(beta)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::comm::{Hierarchy, ThreadComm};
  use crate::test::on_threads;
  use crate::{blas, Nested};
  use proptest::prelude::*;

  /// The share of member `rank` of `xs`, split among `cuts.len() + 1` members at `cuts`.
  fn share(xs: &[f64], cuts: &[usize], rank: usize) -> Vec<f64> {
    let mut bounds: Vec<usize> = cuts.iter().map(|&c| c.min(xs.len())).collect();
    bounds.sort();
    bounds.insert(0, 0);
    bounds.push(xs.len());
    xs[bounds[rank] .. bounds[rank + 1]].to_vec()
  }

  fn group_of(comm: ThreadComm, fan_in: usize) -> Arc<ProcessGroup<ThreadComm>> {
    Arc::new(ProcessGroup::new(comm, Hierarchy { fan_in }).unwrap())
  }

  #[test]
  fn regression_on_four_members() {
    let x = [1e16, 1., -1e16, 1., 1., -1.];
    let results = on_threads(4, |comm| {
      let group = group_of(comm, 2);
      let mine = share(&x, &[1, 1, 4], group.rank());
      let ones = vec![1.; mine.len()];
      let x = Distributed::new(mine, group.clone());
      let ones = Distributed::new(ones, group);
      let partials = vec![x.partial_dot(&ones, KernelConfig::default()).unwrap()];
      x.combine(partials).unwrap()[0].round().unwrap()
    });
    assert_eq!(results, [2.; 4]);
  }

  #[test]
  fn nested_local_parts() {
    let results = on_threads(3, |comm| {
      let group = group_of(comm, 2);
      let r = group.rank() as f64;
      let x: Nested<Vec<f64>> = Nested(vec![vec![r; 2], vec![1e300 * (r - 1.), 1e-300]]);
      let x = Distributed::new(x, group);
      let partials = vec![x.partial_sum(KernelConfig::default()).unwrap()];
      x.combine(partials).unwrap()[0].round().unwrap()
    });
    // The 1e300s cancel across members, the 1e-300s are lost on rounding
    assert_eq!(results, [6.; 3]);
  }

  #[test]
  fn symv_is_local() {
    let results = on_threads(2, |comm| {
      let group = group_of(comm, 2);
      let r = group.rank() as f64;
      let w = Distributed::new(vec![r + 1.; 2], group.clone());
      let x = Distributed::new(vec![2.; 2], group.clone());
      let mut y = Distributed::new(vec![f64::NAN; 2], group);
      Distributed::symv_into(1., &w, &x, 0., &mut y).unwrap();
      y.into_local()
    });
    assert_eq!(results, [vec![2.; 2], vec![4.; 2]]);
  }

  #[test]
  fn vector_field() {
    // Two components, each spread over three members
    let results = on_threads(3, |comm| {
      let group = group_of(comm, 2);
      let r = group.rank() as f64;
      let u = Distributed::new(vec![1e300 * (r - 1.), r], group.clone());
      let v = Distributed::new(vec![0.5; group.rank()], group.clone());
      let field = Nested(vec![u, v]);
      let ones = Nested(vec![
        Distributed::new(vec![1.; 2], group.clone()),
        Distributed::new(vec![1.; group.rank()], group),
      ]);
      (blas::sum(&field).unwrap(), blas::dot(&field, &ones).unwrap(), blas::dot_batch(&[(&field, &ones), (&ones, &ones)]).unwrap())
    });
    // 0 + 1 + 2 from the first component, 3 halves from the second
    assert_eq!(results, vec![(4.5, 4.5, vec![4.5, 9.]); 3]);
  }

  #[cfg(debug_assertions)]
  #[test]
  fn group_mismatch() {
    let a = ThreadComm::world(1).pop().unwrap();
    let b = ThreadComm::world(1).pop().unwrap();
    let x = Distributed::new(vec![1.], group_of(a, 1));
    let y = Distributed::new(vec![1.], group_of(b, 1));
    assert_eq!(x.partial_dot(&y, KernelConfig::default()).map(|_| ()), Err(Error::GroupMismatch));
    assert_eq!(x.check_shape(&y), Err(Error::GroupMismatch));
    let mut z = x.clone();
    assert_eq!(Distributed::symv_into(1., &x, &y, 0., &mut z), Err(Error::GroupMismatch));
    assert!(x.check_shape(&x.clone()).is_ok());
  }

  proptest!{
    #![proptest_config(ProptestConfig::with_cases(crate::PROPTEST_CASES / 16))]
    #[test]
    fn same_as_single_member(
      (x, y) in crate::test::wild_pair(0 .. 200),
      cuts in proptest::collection::vec(0 .. 200_usize, 7),
    ) {
      let config = KernelConfig { min_par_len: 16 };
      let expected_dot = x.partial_dot(&y, config).unwrap().round().unwrap();
      let expected_sum = x.partial_sum(config).unwrap().round().unwrap();
      for size in [1, 2, 4, 8] {
        let cuts = &cuts[.. size - 1];
        let results = on_threads(size, |comm| {
          let group = group_of(comm, 2);
          let dx = Distributed::new(share(&x, cuts, group.rank()), group.clone());
          let dy = Distributed::new(share(&y, cuts, group.rank()), group);
          let partials = vec![dx.partial_dot(&dy, config).unwrap(), dx.partial_sum(config).unwrap()];
          let combined = dx.combine(partials).unwrap();
          (combined[0].round().unwrap(), combined[1].round().unwrap())
        });
        for (dot, sum) in results {
          prop_assert_eq!(dot.to_bits(), expected_dot.to_bits(), "{} members", size);
          prop_assert_eq!(sum.to_bits(), expected_sum.to_bits(), "{} members", size);
        }
      }
    }

    #[test]
    fn weighted_and_batched_same_as_single_member(
      (x, w, y) in crate::test::wild_triple(0 .. 200),
      cuts in proptest::collection::vec(0 .. 200_usize, 7),
    ) {
      let config = KernelConfig { min_par_len: 16 };
      let expected_weighted = blas::dot_weighted(&x, &w, &y).unwrap();
      let expected_self = blas::dot_self(&w, &x).unwrap();
      let expected_batch = blas::dot_batch(&[(&x, &y), (&w, &x), (&y, &y)]).unwrap();
      for size in [1, 2, 4, 8] {
        let cuts = &cuts[.. size - 1];
        let results = on_threads(size, |comm| {
          let group = group_of(comm, 2);
          let part = |v: &[f64]| Distributed::new(share(v, cuts, group.rank()), group.clone());
          let (dx, dw, dy) = (part(&x), part(&w), part(&y));
          let partials = vec![dx.partial_dot_weighted(&dw, &dy, config).unwrap()];
          (
            dx.combine(partials).unwrap()[0].round().unwrap(),
            blas::dot_weighted(&dx, &dw, &dy).unwrap(),
            blas::dot_self(&dw, &dx).unwrap(),
            blas::dot_batch(&[(&dx, &dy), (&dw, &dx), (&dy, &dy)]).unwrap(),
          )
        });
        for (partial, weighted, norm, batch) in results {
          prop_assert_eq!(partial.to_bits(), expected_weighted.to_bits(), "{} members", size);
          prop_assert_eq!(weighted.to_bits(), expected_weighted.to_bits(), "{} members", size);
          prop_assert_eq!(norm.to_bits(), expected_self.to_bits(), "{} members", size);
          prop_assert_eq!(&batch, &expected_batch, "{} members", size);
        }
      }
    }

    #[test]
    fn vector_field_same_as_flat(
      (x, y) in crate::test::wild_pair(0 .. 200),
      cuts in proptest::collection::vec(0 .. 200_usize, 7),
      at in 0 .. 200_usize,
    ) {
      let expected_dot = blas::dot(&x, &y).unwrap();
      let expected_sum = blas::sum(&x).unwrap();
      let at = at.min(x.len());
      for size in [1, 2, 4, 8] {
        let cuts = &cuts[.. size - 1];
        let results = on_threads(size, |comm| {
          let group = group_of(comm, 2);
          let field = |v: &[f64]| -> Nested<Distributed<Vec<f64>, ThreadComm>> {
            let part = |v: &[f64]| Distributed::new(share(v, cuts, group.rank()), group.clone());
            Nested(vec![part(&v[.. at]), part(&v[at ..])])
          };
          let (fx, fy) = (field(&x), field(&y));
          (blas::dot(&fx, &fy).unwrap(), blas::sum(&fx).unwrap())
        });
        for (dot, sum) in results {
          prop_assert_eq!(dot.to_bits(), expected_dot.to_bits(), "{} members", size);
          prop_assert_eq!(sum.to_bits(), expected_sum.to_bits(), "{} members", size);
        }
      }
    }
  }
}
