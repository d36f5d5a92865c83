use super::*;

/// Shape of the two-level hierarchy of a [`ProcessGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hierarchy {
  /// The maximum number of members of a "local" sub-group, and thus the fan-in of the first
  /// level of the combine. A value of 0 is treated as 1.
  pub fan_in: usize,
}

impl Default for Hierarchy {
  /// Local groups of 128 members. A plain bin-wise sum of that many normalized accumulators still
  /// fits the carry-save bits of each bin.
  fn default() -> Self {
    Self { fan_in: 1 << (Superaccumulator::KRX - 1) }
  }
}

/// A group of workers, split into a two-level hierarchy for combining accumulators.
///
/// Members with world ranks `k·fan_in .. (k+1)·fan_in` form the `k`th *local* group. The first
/// member of each local group is its *leader*, and the leaders form the *leaders* group. A
/// combine first reduces within each local group, then among the leaders, then broadcasts the
/// result back down the local groups, so that no single collective step has more than `fan_in`
/// members (or `⌈size / fan_in⌉`, for the leaders).
///
/// Construct it once, at setup, and share it (usually in an [`Arc`](std::sync::Arc)) between all
/// the [`Distributed`](crate::Distributed) vectors on this member.
#[derive(Debug)]
pub struct ProcessGroup<C: Communicator> {
  world: C,
  local: C,
  leaders: Option<C>,
  hierarchy: Hierarchy,
}

impl<C: Communicator> ProcessGroup<C> {
  /// Split `world` into the two-level hierarchy. This is a collective over `world`.
  pub fn new(world: C, hierarchy: Hierarchy) -> Result<Self> {
    let fan_in = hierarchy.fan_in.max(1);
    let color = world.rank() / fan_in;
    let local = world.split(Some(color))?.ok_or_else(|| Error::Collective {
      reason: "split returned no local group for a member with a color".into(),
    })?;
    let is_leader = local.rank() == 0;
    let leaders = world.split(is_leader.then_some(0))?;
    log::debug!(
      "process group: world rank {} of {}, local group {color} (rank {} of {}), {}",
      world.rank(), world.size(), local.rank(), local.size(),
      if is_leader {"leader"} else {"not a leader"},
    );
    Ok(Self { world, local, leaders, hierarchy })
  }

  /// A group of one level only: every member is in one local group, and is its own leader.
  /// Useful when the group is small.
  pub fn flat(world: C) -> Result<Self> {
    let size = world.size();
    Self::new(world, Hierarchy { fan_in: size })
  }

  /// This member's rank in the whole group.
  pub fn rank(&self) -> usize {
    self.world.rank()
  }

  /// The number of members of the whole group.
  pub fn size(&self) -> usize {
    self.world.size()
  }

  /// The communicator of the whole group.
  pub fn world(&self) -> &C {
    &self.world
  }

  /// The communicator of this member's local group.
  pub fn local(&self) -> &C {
    &self.local
  }

  /// The leaders group, if this member is the leader of its local group.
  pub fn leaders(&self) -> Option<&C> {
    self.leaders.as_ref()
  }

  /// The shape this group was split with, as passed to [`new`](Self::new).
  pub fn hierarchy(&self) -> Hierarchy {
    self.hierarchy
  }

  /// Whether `other` is a handle to the same group.
  pub fn is_congruent(&self, other: &Self) -> bool {
    core::ptr::eq(self, other) || self.world.is_congruent(&other.world)
  }

  /// Combine one accumulator per member into the group-wide one, identical on every member. This
  /// is a collective.
  pub fn combine(&self, acc: Superaccumulator) -> Result<Superaccumulator> {
    let mut combined = self.combine_many(vec![acc])?;
    combined.pop().ok_or_else(|| Error::Collective { reason: "combine returned no accumulator".into() })
  }

  /// Combine several accumulators per member in one round of collectives: index `i` of the result
  /// is the merge of every member's accumulator `i`, identical on every member.
  ///
  /// This is a collective: every member must call it with the same number of accumulators. If any
  /// step fails, the error is carried through the remaining steps, so every member returns it.
  pub fn combine_many(&self, mut accs: Vec<Superaccumulator>) -> Result<Vec<Superaccumulator>> {
    for acc in &mut accs {
      acc.normalize();
    }
    let n = accs.len();

    log::debug!("combine: {n} accumulator(s), reducing over local group of {}", self.local.size());
    let mut reduced = self.local.reduce(Ok(accs));

    if let Some(leaders) = &self.leaders {
      log::debug!("combine: reducing over {} leaders", leaders.size());
      reduced = leaders.reduce(reduced);
    }

    log::debug!("combine: broadcasting over local group");
    let payload = (self.local.rank() == 0).then_some(reduced);
    let combined = self.local.broadcast(payload, 0);
    if let Err(e) = &combined {
      log::warn!("combine failed: {e}");
    }
    combined
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::on_threads;

  #[test]
  fn default_fan_in() {
    assert_eq!(Hierarchy::default().fan_in, 128);
  }

  #[test]
  fn shape() {
    let shapes = on_threads(7, |comm| {
      let group = ProcessGroup::new(comm, Hierarchy { fan_in: 3 }).unwrap();
      (group.local().rank(), group.local().size(), group.leaders().map(|l| (l.rank(), l.size())))
    });
    assert_eq!(shapes, [
      (0, 3, Some((0, 3))),
      (1, 3, None),
      (2, 3, None),
      (0, 3, Some((1, 3))),
      (1, 3, None),
      (2, 3, None),
      (0, 1, Some((2, 3))),
    ]);
  }

  #[test]
  fn single_member() {
    let group = ProcessGroup::new(SelfComm, Hierarchy::default()).unwrap();
    assert_eq!(group.size(), 1);
    assert!(group.leaders().is_some());
    let acc = group.combine(Superaccumulator::from_iter([1e16, 1., -1e16])).unwrap();
    assert_eq!(acc.round(), Ok(1.));
  }

  /// What member `rank` contributes to a combine.
  fn contribution(rank: usize) -> Vec<Superaccumulator> {
    let r = rank as f64;
    vec![
      Superaccumulator::from_iter([1e100 * (r - 2.), r, -1e-100 * r]),
      Superaccumulator::from(-r),
    ]
  }

  #[test]
  fn combine_everywhere() {
    for size in [1, 2, 3, 5, 8] {
      let expected: Vec<f64> = {
        let mut merged = vec![Superaccumulator::ZERO; 2];
        for rank in 0 .. size {
          for (m, c) in merged.iter_mut().zip(contribution(rank)) {
            *m += c;
          }
        }
        merged.iter().map(|m| m.round().unwrap()).collect()
      };
      for fan_in in [0, 1, 2, 4, 128] {
        let results = on_threads(size, |comm| {
          let group = ProcessGroup::new(comm, Hierarchy { fan_in }).unwrap();
          let combined = group.combine_many(contribution(group.rank())).unwrap();
          combined.iter().map(|a| a.round().unwrap()).collect::<Vec<_>>()
        });
        assert!(results.iter().all(|r| *r == expected), "size {size}, fan_in {fan_in}: {results:?}");
      }
    }
  }

  #[test]
  fn mismatched_counts_fail() {
    let results = on_threads(4, |comm| {
      let group = ProcessGroup::new(comm, Hierarchy { fan_in: 2 }).unwrap();
      group.combine_many(vec![Superaccumulator::ZERO; group.rank() % 2 + 1]).map(|_| ())
    });
    assert!(results.iter().all(Result::is_err));
  }

  #[test]
  fn counts_mismatched_between_local_groups_fail() {
    // Both local groups agree internally, so only the leaders see the mismatch.
    let results = on_threads(4, |comm| {
      let group = ProcessGroup::new(comm, Hierarchy { fan_in: 2 }).unwrap();
      group.combine_many(vec![Superaccumulator::ZERO; group.rank() / 2 + 1]).map(|_| ())
    });
    assert!(results.iter().all(Result::is_err), "{results:?}");
  }

  #[test]
  fn failure_in_one_local_group_reaches_the_others() {
    let results = on_threads(6, |comm| {
      let group = ProcessGroup::new(comm, Hierarchy { fan_in: 2 }).unwrap();
      let n = if group.rank() == 3 {2} else {1};
      group.combine_many(vec![Superaccumulator::ZERO; n]).map(|_| ())
    });
    assert!(results.iter().all(Result::is_err), "{results:?}");
  }
}
