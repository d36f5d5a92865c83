use crate::error::{Error, Result};

/// A dense matrix of `f64`s, stored row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseMatrix {
  rows: usize,
  cols: usize,
  data: Vec<f64>,
}

impl DenseMatrix {
  /// A `rows × cols` matrix from its elements in row-major order. Fails unless there are exactly
  /// `rows · cols` of them.
  pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
    let expected = rows.checked_mul(cols).ok_or(Error::DimensionOverflow { rows, cols })?;
    if data.len() != expected {
      return Err(Error::ShapeMismatch { expected, got: data.len() })
    }
    Ok(Self { rows, cols, data })
  }

  /// A matrix from its rows, which must all have the same length.
  pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
    let cols = rows.first().map_or(0, |r| r.as_ref().len());
    let mut data = Vec::with_capacity(rows.len() * cols);
    for row in rows {
      let row = row.as_ref();
      if row.len() != cols {
        return Err(Error::ShapeMismatch { expected: cols, got: row.len() })
      }
      data.extend_from_slice(row)
    }
    Ok(Self { rows: rows.len(), cols, data })
  }

  /// A `n × n` diagonal matrix.
  pub fn from_diagonal(diagonal: &[f64]) -> Self {
    let n = diagonal.len();
    let mut data = vec![0.; n * n];
    for (i, &d) in diagonal.iter().enumerate() {
      data[i * n + i] = d
    }
    Self { rows: n, cols: n, data }
  }

  /// Number of rows.
  pub fn rows(&self) -> usize {
    self.rows
  }

  /// Number of columns, i.e. the length of each row.
  pub fn cols(&self) -> usize {
    self.cols
  }

  /// Row `i`, or `None` if out of bounds.
  pub fn row(&self, i: usize) -> Option<&[f64]> {
    (i < self.rows).then(|| &self.data[i * self.cols .. (i + 1) * self.cols])
  }

  /// Iterate over the rows, in order.
  pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
    (0 .. self.rows).map(|i| &self.data[i * self.cols .. (i + 1) * self.cols])
  }

  /// All elements, row-major.
  pub fn as_slice(&self) -> &[f64] {
    &self.data
  }

  /// Take the elements, row-major.
  pub fn into_vec(self) -> Vec<f64> {
    self.data
  }
}
