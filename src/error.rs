//! Error types for reproducible reductions.
//!
//! All of these are contract violations by the caller (or a fatally mis-sized accumulator), and
//! are reported before any partial result is observable. Non-finite inputs are *not* errors: they
//! propagate to a non-finite result.

use thiserror::Error;

/// Result type alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a reduction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Dense operands of different lengths.
  #[error("Shape mismatch: expected length {expected}, got {got}")]
  ShapeMismatch {
    /// Length of the first operand
    expected: usize,
    /// Length of the mismatching operand
    got: usize,
  },

  /// Nested operands with a different number of components.
  #[error("Nesting mismatch: expected {expected} components, got {got}")]
  NestingMismatch {
    /// Number of components of the first operand
    expected: usize,
    /// Number of components of the mismatching operand
    got: usize,
  },

  /// Matrix dimensions whose product does not fit in a `usize`.
  #[error("Dimension overflow: {rows}×{cols} elements do not fit in memory")]
  DimensionOverflow {
    /// Number of rows requested
    rows: usize,
    /// Number of columns requested
    cols: usize,
  },

  /// Distributed operands that live on different process groups. Only detected in debug builds.
  #[error("Group mismatch: distributed operands reference different process groups")]
  GroupMismatch,

  /// A carry escaped the most significant bin of an accumulator, so its value is lost.
  #[error("Range overflow: value exceeds the range of the superaccumulator")]
  RangeOverflow,

  /// A collective could not complete, e.g. because members called different collectives, or
  /// reduced different numbers of accumulators.
  #[error("Collective failed: {reason}")]
  Collective {
    /// What went wrong
    reason: String,
  },
}
