//! Process groups and the collectives that combine accumulators across them.
//!
//! A [`Communicator`] is one member's handle to a group of cooperating workers. It is the only
//! seam to the communication substrate: this crate ships an in-process implementation,
//! [`ThreadComm`], whose members are threads sharing memory, and the trivial single-member
//! [`SelfComm`]. A message-passing backend only needs to implement the same four collectives.
//!
//! On top of any communicator, a [`ProcessGroup`] performs the two-level split into "local" and
//! "leaders" sub-groups, and runs the hierarchical combine of [`ProcessGroup::combine_many`].

use crate::error::{Error, Result};
use crate::Superaccumulator;

mod serial;
mod thread;
mod hierarchy;

pub use serial::SelfComm;
pub use thread::ThreadComm;
pub use hierarchy::{Hierarchy, ProcessGroup};

/// One member's handle to a group of workers.
///
/// All methods but [`rank`](Self::rank), [`size`](Self::size) and
/// [`is_congruent`](Self::is_congruent) are *collectives*: every member of the group must call
/// them, in the same order, and none returns until all members have contributed. There is no
/// timeout; a member that never calls stalls the group.
///
/// A member that has already failed still takes part in the collectives that follow, passing its
/// error instead of its accumulators: the collective then fails on every member, with the error of
/// the lowest failing rank, and nobody is left waiting.
pub trait Communicator: Sized + Send + Sync {
  /// This member's index in the group, in `0 .. size`.
  fn rank(&self) -> usize;

  /// The number of members.
  fn size(&self) -> usize;

  /// Whether `other` is a handle to the same group (possibly held by another member).
  fn is_congruent(&self, other: &Self) -> bool;

  /// Split the group into disjoint sub-groups, one per distinct `color`. Members within a
  /// sub-group keep their relative order. Members passing `None` join no sub-group, and get
  /// `None` back.
  fn split(&self, color: Option<usize>) -> Result<Option<Self>>;

  /// All-reduce by merging: every member contributes the same number of accumulators, and every
  /// member receives, at each index, the merge of all members' accumulators at that index,
  /// normalized. Fails everywhere if any member contributes an error.
  fn reduce(&self, accs: Result<Vec<Superaccumulator>>) -> Result<Vec<Superaccumulator>>;

  /// Broadcast the accumulators of member `root` to every member, or its error. Only `root` passes
  /// `Some`.
  fn broadcast(&self, accs: Option<Result<Vec<Superaccumulator>>>, root: usize) -> Result<Vec<Superaccumulator>>;
}

/// Merge the contributions of all members into one accumulator per index, and normalize the
/// results. Every contribution must have the same length.
pub(crate) fn merge_all<'a>(
  contributions: impl IntoIterator<Item = &'a [Superaccumulator]>,
) -> Result<Vec<Superaccumulator>> {
  let mut merged: Option<Vec<Superaccumulator>> = None;
  for accs in contributions {
    match &mut merged {
      None => merged = Some(accs.to_vec()),
      Some(merged) if merged.len() != accs.len() => {
        return Err(Error::Collective {
          reason: format!("members reduce different numbers of accumulators ({} vs {})", merged.len(), accs.len()),
        })
      }
      Some(merged) => for (m, a) in merged.iter_mut().zip(accs) {
        *m += a;
      }
    }
  }
  let mut merged = merged.unwrap_or_default();
  for m in &mut merged {
    m.normalize();
  }
  Ok(merged)
}
