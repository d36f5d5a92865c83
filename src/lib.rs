//! This crate provides *reproducible* sums and dot products of `f64`s: results that are
//! correctly rounded, and therefore bit-identical no matter the order of the elements, the number
//! of threads, or how the data is split across a group of cooperating processes.
//!
//! # Introduction
//!
//! Floating point addition is not associative, so a parallel or distributed reduction usually
//! gives slightly different results from one run (or one machine, or one process count) to the
//! next. Here, instead, every product is split into two `f64`s whose sum is exact (an
//! *error-free transformation*), and every term is accumulated with no rounding at all into a
//! [`Superaccumulator`], a wide fixed-point number covering the whole `f64` range. Accumulators
//! of different threads or processes are merged exactly, and the result is rounded only once, at
//! the end.
//!
//! The approach is that of the ExBLAS library:
//!
//!   - Collange, Defour, Graillat, Iakymchuk, "Numerical reproducibility for the parallel
//!     reduction on multi- and many-core architectures", Parallel Computing (2015)
//!   - Iakymchuk, Collange, Defour, Graillat, "ExBLAS: Reproducible and accurate BLAS library"
//!     (2015)
//!
//! # Usage
//!
//! ```
//! use repro_blas::{blas, Nested};
//!
//! // Dense vectors: slices, `Vec`s, or arrays of `f64`.
//! let x = vec![1e16, 1., -1e16, 1., 1., -1.];
//! let y = vec![1.; 6];
//! assert_eq!(blas::dot(&x, &y), Ok(2.));
//!
//! // Weighted by a diagonal matrix, xᵀ·M·y.
//! let m = vec![2.; 6];
//! assert_eq!(blas::dot_weighted(&x, &m, &y), Ok(4.));
//!
//! // Nested vectors: the same value, whichever way the data is split into components.
//! let xn = Nested(vec![x[.. 2].to_vec(), x[2 ..].to_vec()]);
//! let yn = Nested(vec![y[.. 2].to_vec(), y[2 ..].to_vec()]);
//! assert_eq!(blas::dot(&xn, &yn), Ok(2.));
//! ```
//!
//! Vectors split across a group of workers are [`Distributed`]; see [`ThreadComm`] for a group of
//! threads, and [`Communicator`] for plugging in another substrate.
//!
//! # Features
//!
//!   - `rayon` (default): long dense inputs are reduced by several workers of the rayon thread
//!     pool. This never changes the results.
//!   - `bench`: exposes internals for the benchmarks; run them with `cargo bench -F bench`.

mod error;
mod float;
mod eft;
mod superacc;
pub mod kernel;
mod layout;
mod comm;
mod matrix;
pub mod blas;


#[cfg(feature = "bench")]
mod bench;

pub use error::{Error, Result};
pub use eft::TwoProduct;
pub use superacc::Superaccumulator;
pub use kernel::KernelConfig;
pub use layout::{Category, Component, Distributed, Local, Nested, Vector, category};
pub use comm::{Communicator, Hierarchy, ProcessGroup, SelfComm, ThreadComm};
pub use matrix::DenseMatrix;

/// Number of cases of each property test.
#[cfg(test)]
const PROPTEST_CASES: u32 = if cfg!(debug_assertions) {0x400} else {0x4000};
