use crate::error::EvpError;

/// Sparse matrix in triplet form.
///
/// Used to assemble operators before handing them to `nalgebra_sparse`.
/// Duplicate entries are summed on conversion.
#[derive(Default, Debug, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn zeros(nrows: usize, ncols: usize) -> Self {
    Self::new(nrows, ncols, Vec::new())
  }
  pub fn new(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    assert!(
      triplets.iter().all(|&(r, c, _)| r < nrows && c < ncols),
      "triplet out of bounds for {nrows}x{ncols} matrix"
    );
    Self {
      nrows,
      ncols,
      triplets,
    }
  }
  pub fn from_diagonal(diagonal: &na::DVector<f64>) -> Self {
    let n = diagonal.len();
    let mut matrix = Self::zeros(n, n);
    for (i, &v) in diagonal.iter().enumerate() {
      matrix.push(i, i, v);
    }
    matrix
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }

  pub fn into_parts(self) -> (usize, usize, Vec<(usize, usize, f64)>) {
    (self.nrows, self.ncols, self.triplets)
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    assert!(r < self.nrows && c < self.ncols);
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  pub fn to_nalgebra_coo(&self) -> nas::CooMatrix<f64> {
    let mut coo = nas::CooMatrix::new(self.nrows, self.ncols);
    for &(r, c, v) in &self.triplets {
      coo.push(r, c, v);
    }
    coo
  }

  pub fn to_nalgebra_csc(&self) -> nas::CscMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  pub fn to_nalgebra_dense(&self) -> na::DMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  /// Diagonal of a matrix that is known to be diagonal.
  ///
  /// Fails on the first off-diagonal non-zero.
  pub fn try_into_diagonal(self) -> Result<na::DVector<f64>, EvpError> {
    let mut diagonal = na::DVector::zeros(self.nrows.max(self.ncols));
    for (r, c, v) in self.triplets {
      if r == c {
        diagonal[r] += v;
      } else {
        return Err(EvpError::NonDiagonalMass { row: r, col: c });
      }
    }
    Ok(diagonal)
  }

  /// Computes `D A D` for the diagonal matrix `D = diag(diagonal)`.
  pub fn scale_symmetric(&self, diagonal: &na::DVector<f64>) -> Self {
    assert_eq!(self.nrows, diagonal.len());
    assert_eq!(self.ncols, diagonal.len());
    let triplets = self
      .triplets
      .iter()
      .map(|&(r, c, v)| (r, c, diagonal[r] * v * diagonal[c]))
      .collect();
    Self::new(self.nrows, self.ncols, triplets)
  }
}

impl From<&nas::CscMatrix<f64>> for SparseMatrix {
  fn from(csc: &nas::CscMatrix<f64>) -> Self {
    let triplets = csc
      .triplet_iter()
      .filter(|&(_, _, &v)| v != 0.0)
      .map(|(r, c, &v)| (r, c, v))
      .collect();
    Self::new(csc.nrows(), csc.ncols(), triplets)
  }
}
