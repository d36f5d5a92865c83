use super::*;

/// The communicator of a group with a single member: the calling thread. Every collective is
/// trivial.
///
/// This is what a non-distributed build uses where a [`Communicator`] is required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfComm;

impl Communicator for SelfComm {
  fn rank(&self) -> usize {
    0
  }

  fn size(&self) -> usize {
    1
  }

  fn is_congruent(&self, _other: &Self) -> bool {
    true
  }

  fn split(&self, color: Option<usize>) -> Result<Option<Self>> {
    Ok(color.map(|_| SelfComm))
  }

  fn reduce(&self, accs: Result<Vec<Superaccumulator>>) -> Result<Vec<Superaccumulator>> {
    let accs = accs?;
    merge_all([accs.as_slice()])
  }

  fn broadcast(&self, accs: Option<Result<Vec<Superaccumulator>>>, root: usize) -> Result<Vec<Superaccumulator>> {
    match accs {
      Some(accs) if root == 0 => accs,
      _ => Err(Error::Collective { reason: format!("broadcast from root {root} without its payload") }),
    }
  }
}
