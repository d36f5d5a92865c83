use super::*;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A communicator whose members are threads of the calling process, cooperating through shared
/// memory.
///
/// [`ThreadComm::world`] creates one handle per member; hand each to its own thread. Each
/// collective is a rendezvous: members deposit their contribution, the last one to arrive
/// computes the outcome for everyone, and wakes the others.
///
/// # Example
///
/// ```
/// # use repro_blas::{Communicator, Superaccumulator, ThreadComm};
/// let results: Vec<f64> = std::thread::scope(|s| {
///   let handles: Vec<_> = ThreadComm::world(3).into_iter().map(|comm| s.spawn(move || {
///     let mine = Superaccumulator::from(if comm.rank() == 0 {1e100} else {-5e99});
///     comm.reduce(Ok(vec![mine])).unwrap()[0].round().unwrap()
///   })).collect();
///   handles.into_iter().map(|h| h.join().unwrap()).collect()
/// });
/// assert_eq!(results, [0.; 3]);
/// ```
#[derive(Clone)]
pub struct ThreadComm {
  shared: Arc<Shared>,
  rank: usize,
}

/// The state shared by all members of one group.
struct Shared {
  size: usize,
  state: Mutex<Rendezvous>,
  done: Condvar,
}

struct Rendezvous {
  /// Number of collectives completed so far.
  generation: u64,
  /// One slot per member, filled as they arrive.
  payloads: Vec<Option<Payload>>,
  arrived: usize,
  /// The outcome of the last completed collective. It stays valid until every member has left
  /// it, since the next one cannot complete before that.
  outcome: Arc<Outcome>,
}

enum Payload {
  Split(Option<usize>),
  Reduce(Result<Vec<Superaccumulator>>),
  Broadcast { accs: Option<Result<Vec<Superaccumulator>>>, root: usize },
}

enum Outcome {
  Split(Vec<Option<ThreadComm>>),
  Accs(Vec<Superaccumulator>),
  Failed(Error),
}

impl Shared {
  fn new(size: usize) -> Arc<Self> {
    Arc::new(Self {
      size,
      state: Mutex::new(Rendezvous {
        generation: 0,
        payloads: (0 .. size).map(|_| None).collect(),
        arrived: 0,
        outcome: Arc::new(Outcome::Accs(Vec::new())),
      }),
      done: Condvar::new(),
    })
  }
}

impl ThreadComm {
  /// Create a group of `size` members, returning the handle of each, in rank order.
  pub fn world(size: usize) -> Vec<ThreadComm> {
    let shared = Shared::new(size);
    (0 .. size).map(|rank| ThreadComm { shared: shared.clone(), rank }).collect()
  }

  /// Deposit `payload`, wait for all members to deposit theirs, and return the outcome.
  fn rendezvous(&self, payload: Payload) -> Arc<Outcome> {
    let shared = &*self.shared;
    let mut state = shared.state.lock();
    let generation = state.generation;
    state.payloads[self.rank] = Some(payload);
    state.arrived += 1;

    if state.arrived == shared.size {
      let payloads: Vec<Payload> = state.payloads.iter_mut().filter_map(Option::take).collect();
      let outcome = Arc::new(resolve(payloads));
      state.outcome = outcome.clone();
      state.arrived = 0;
      state.generation += 1;
      shared.done.notify_all();
      outcome
    } else {
      while state.generation == generation {
        shared.done.wait(&mut state);
      }
      state.outcome.clone()
    }
  }

  /// Run a collective whose outcome is a list of accumulators.
  fn collective_accs(&self, payload: Payload) -> Result<Vec<Superaccumulator>> {
    match &*self.rendezvous(payload) {
      Outcome::Accs(accs) => Ok(accs.clone()),
      Outcome::Failed(e) => Err(e.clone()),
      Outcome::Split(_) => Err(mixed_collectives()),
    }
  }
}

fn mixed_collectives() -> Error {
  Error::Collective { reason: "members called different collectives".into() }
}

/// Compute the outcome of a collective from every member's payload, in rank order.
fn resolve(payloads: Vec<Payload>) -> Outcome {
  let colors: Option<Vec<Option<usize>>> = payloads.iter()
    .map(|p| if let Payload::Split(color) = p {Some(*color)} else {None})
    .collect();
  if let Some(colors) = colors {
    return resolve_split(&colors)
  }

  let reduced: Option<Vec<&Result<Vec<Superaccumulator>>>> = payloads.iter()
    .map(|p| if let Payload::Reduce(accs) = p {Some(accs)} else {None})
    .collect();
  if let Some(reduced) = reduced {
    // The first error in rank order wins.
    let merged = reduced.into_iter()
      .map(|accs| accs.as_ref().map(Vec::as_slice).map_err(|e| e.clone()))
      .collect::<Result<Vec<_>>>()
      .and_then(merge_all);
    return match merged {
      Ok(merged) => Outcome::Accs(merged),
      Err(e) => Outcome::Failed(e),
    }
  }

  let broadcast: Option<Vec<(&Option<Result<Vec<Superaccumulator>>>, usize)>> = payloads.iter()
    .map(|p| if let Payload::Broadcast { accs, root } = p {Some((accs, *root))} else {None})
    .collect();
  if let Some(broadcast) = broadcast {
    let root = broadcast.first().map_or(0, |&(_, root)| root);
    if broadcast.iter().any(|&(_, r)| r != root) {
      return Outcome::Failed(Error::Collective { reason: "members broadcast from different roots".into() })
    }
    return match broadcast.get(root) {
      Some((Some(Ok(accs)), _)) => Outcome::Accs(accs.clone()),
      Some((Some(Err(e)), _)) => Outcome::Failed(e.clone()),
      _ => Outcome::Failed(Error::Collective { reason: format!("broadcast from root {root} without its payload") }),
    }
  }

  Outcome::Failed(mixed_collectives())
}

/// One new group per distinct color, with members in rank order.
fn resolve_split(colors: &[Option<usize>]) -> Outcome {
  let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
  for (rank, color) in colors.iter().enumerate() {
    if let Some(color) = color {
      groups.entry(*color).or_default().push(rank);
    }
  }
  let mut comms = vec![None; colors.len()];
  for members in groups.values() {
    let shared = Shared::new(members.len());
    for (new_rank, &old_rank) in members.iter().enumerate() {
      comms[old_rank] = Some(ThreadComm { shared: shared.clone(), rank: new_rank });
    }
  }
  Outcome::Split(comms)
}

impl Communicator for ThreadComm {
  fn rank(&self) -> usize {
    self.rank
  }

  fn size(&self) -> usize {
    self.shared.size
  }

  fn is_congruent(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.shared, &other.shared)
  }

  fn split(&self, color: Option<usize>) -> Result<Option<Self>> {
    match &*self.rendezvous(Payload::Split(color)) {
      Outcome::Split(comms) => Ok(comms[self.rank].clone()),
      Outcome::Failed(e) => Err(e.clone()),
      Outcome::Accs(_) => Err(mixed_collectives()),
    }
  }

  fn reduce(&self, accs: Result<Vec<Superaccumulator>>) -> Result<Vec<Superaccumulator>> {
    self.collective_accs(Payload::Reduce(accs))
  }

  fn broadcast(&self, accs: Option<Result<Vec<Superaccumulator>>>, root: usize) -> Result<Vec<Superaccumulator>> {
    self.collective_accs(Payload::Broadcast { accs, root })
  }
}

impl core::fmt::Debug for ThreadComm {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("ThreadComm")
      .field("rank", &self.rank)
      .field("size", &self.shared.size)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::on_threads;

  #[test]
  fn reduce() {
    let results = on_threads(4, |comm| {
      let mine = Superaccumulator::from_iter([comm.rank() as f64, 1e-300]);
      comm.reduce(Ok(vec![mine])).unwrap()[0].round().unwrap()
    });
    assert_eq!(results, [6.; 4]);
  }

  #[test]
  fn many_generations() {
    let results = on_threads(3, |comm| {
      let mut total = 0.;
      for i in 0 .. 200 {
        let mine = Superaccumulator::from((i * (comm.rank() + 1)) as f64);
        total += comm.reduce(Ok(vec![mine])).unwrap()[0].round().unwrap();
      }
      total
    });
    // Σ_i 6i for i < 200
    assert_eq!(results, [6. * 19900.; 3]);
  }

  #[test]
  fn split() {
    let results = on_threads(5, |comm| {
      let color = if comm.rank() == 4 {None} else {Some(comm.rank() % 2)};
      let sub = comm.split(color).unwrap();
      sub.map(|sub| {
        let sum = sub.reduce(Ok(vec![Superaccumulator::from(comm.rank() as f64)])).unwrap();
        (sub.rank(), sub.size(), sum[0].round().unwrap())
      })
    });
    assert_eq!(results, [
      Some((0, 2, 2.)),
      Some((0, 2, 4.)),
      Some((1, 2, 2.)),
      Some((1, 2, 4.)),
      None,
    ]);
  }

  #[test]
  fn broadcast() {
    let results = on_threads(3, |comm| {
      let accs = (comm.rank() == 2).then(|| Ok(vec![Superaccumulator::from(42.)]));
      comm.broadcast(accs, 2).unwrap()[0].round().unwrap()
    });
    assert_eq!(results, [42.; 3]);
  }

  #[test]
  fn failures_reach_every_member() {
    let results = on_threads(2, |comm| {
      comm.reduce(Ok(vec![Superaccumulator::ZERO; comm.rank() + 1])).map(|_| ())
    });
    assert!(results.iter().all(Result::is_err));

    let results = on_threads(2, |comm| {
      if comm.rank() == 0 {
        comm.reduce(Ok(vec![])).map(|_| ())
      } else {
        comm.broadcast(None, 0).map(|_| ())
      }
    });
    assert!(results.iter().all(|r| *r == Err(mixed_collectives())));

    let results = on_threads(2, |comm| comm.broadcast(None, 0).map(|_| ()));
    assert!(results.iter().all(Result::is_err));
  }

  #[test]
  fn errors_are_passed_on() {
    let results = on_threads(3, |comm| {
      let mine = match comm.rank() {
        0 => Ok(vec![Superaccumulator::from(1.)]),
        1 => Err(Error::RangeOverflow),
        _ => Err(Error::GroupMismatch),
      };
      comm.reduce(mine).map(|_| ())
    });
    assert_eq!(results, vec![Err(Error::RangeOverflow); 3]);

    let results = on_threads(3, |comm| {
      let accs = (comm.rank() == 1).then_some(Err(Error::RangeOverflow));
      comm.broadcast(accs, 1).map(|_| ())
    });
    assert_eq!(results, vec![Err(Error::RangeOverflow); 3]);
  }

  #[test]
  fn congruence() {
    let world = ThreadComm::world(2);
    let other = ThreadComm::world(2);
    assert!(world[0].is_congruent(&world[1]));
    assert!(!world[0].is_congruent(&other[0]));
  }
}
