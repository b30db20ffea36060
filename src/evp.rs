//! Generalized Eigenvalue Problems `L v = λ M v`.
//!
//! The solving itself is delegated: [`LanczosEigensolver`] to the `lanczos`
//! crate, [`DenseEigensolver`] to [`nalgebra::SymmetricEigen`]. Both reduce
//! the generalized problem with a diagonal mass matrix to the symmetric
//! standard problem `M^(-1/2) L M^(-1/2) w = λ w` and map the eigenvectors
//! back with `v = M^(-1/2) w`.

use crate::{
  error::{BoxError, EvpError},
  sparse::SparseMatrix,
};

use itertools::Itertools;
use lanczos::Hermitian;
use tracing::{debug, warn};

/// Shift the wanted eigenvalues are closest to.
///
/// Slightly positive, so the lowest modes are targeted without asking the
/// solver for the exact (singular) zero mode.
pub const DEFAULT_SHIFT: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvpConfig {
  pub shift: f64,
}
impl Default for EvpConfig {
  fn default() -> Self {
    Self {
      shift: DEFAULT_SHIFT,
    }
  }
}

/// Eigenpairs, ordered by ascending distance to the shift.
///
/// Column `j` of `eigenvectors` belongs to `eigenvalues[j]`.
#[derive(Debug, Clone)]
pub struct Spectrum {
  eigenvalues: na::DVector<f64>,
  eigenvectors: na::DMatrix<f64>,
}
impl Spectrum {
  pub fn new(eigenvalues: na::DVector<f64>, eigenvectors: na::DMatrix<f64>) -> Self {
    Self {
      eigenvalues,
      eigenvectors,
    }
  }
  pub fn eigenvalues(&self) -> &na::DVector<f64> {
    &self.eigenvalues
  }
  pub fn eigenvectors(&self) -> &na::DMatrix<f64> {
    &self.eigenvectors
  }
  pub fn nmodes(&self) -> usize {
    self.eigenvalues.len()
  }
  pub fn mode(&self, imode: usize) -> na::DVectorView<'_, f64> {
    self.eigenvectors.column(imode)
  }
  pub fn into_parts(self) -> (na::DVector<f64>, na::DMatrix<f64>) {
    (self.eigenvalues, self.eigenvectors)
  }
}

/// Eigensolver collaborator.
///
/// Returns `nmodes` eigenpairs of `laplacian v = λ mass v` closest to `shift`.
pub trait Eigensolver {
  fn solve(
    &self,
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    nmodes: usize,
    shift: f64,
  ) -> Result<Spectrum, BoxError>;
}

impl<T: Eigensolver + ?Sized> Eigensolver for &T {
  fn solve(
    &self,
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    nmodes: usize,
    shift: f64,
  ) -> Result<Spectrum, BoxError> {
    (**self).solve(laplacian, mass, nmodes, shift)
  }
}

/// Relative residual up to which an eigenpair counts as converged.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;
/// Upper bound on Lanczos runs per solve.
pub const DEFAULT_MAX_RUNS: usize = 12;
/// Consecutive runs that must leave the selection unchanged.
const CONFIRMING_RUNS: usize = 3;

/// Sparse solver backed by the Lanczos iteration of the `lanczos` crate.
///
/// A single Lanczos run is not trusted: every Ritz pair is checked against
/// its residual, copies of known eigenvectors are dropped, and the run is
/// repeated on relabelled versions of the matrix (different effective start
/// vectors) until the selected modes stop changing. Unconverged Ritz values
/// near the shift grow the Krylov subspace, up to the problem size.
#[derive(Debug, Clone, Copy)]
pub struct LanczosEigensolver {
  /// Initial Krylov subspace dimension. Chosen from the problem size if unset.
  pub krylov_dim: Option<usize>,
  /// Bound on `‖L v - λ M v‖ / ‖M v‖`, relative to the operator scale.
  pub tolerance: f64,
  pub max_runs: usize,
}
impl Default for LanczosEigensolver {
  fn default() -> Self {
    Self {
      krylov_dim: None,
      tolerance: DEFAULT_TOLERANCE,
      max_runs: DEFAULT_MAX_RUNS,
    }
  }
}
impl LanczosEigensolver {
  pub fn new() -> Self {
    Self::default()
  }
  pub fn with_krylov_dim(krylov_dim: usize) -> Self {
    Self {
      krylov_dim: Some(krylov_dim),
      ..Self::default()
    }
  }
  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }
  pub fn with_max_runs(mut self, max_runs: usize) -> Self {
    self.max_runs = max_runs;
    self
  }

  fn krylov_dim(&self, dim: usize, nmodes: usize) -> usize {
    self
      .krylov_dim
      .unwrap_or_else(|| (4 * nmodes).max(nmodes + 40))
      .clamp(nmodes, dim)
  }
}
impl Eigensolver for LanczosEigensolver {
  fn solve(
    &self,
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    nmodes: usize,
    shift: f64,
  ) -> Result<Spectrum, BoxError> {
    let reduced = StandardEvp::reduce(laplacian, mass, nmodes)?;
    let dim = reduced.dim();
    let system = reduced.system.to_nalgebra_csc();
    // Standard residuals grow by at most this factor when mapped back.
    let tolerance = self.tolerance / reduced.mass_conditioning();
    let mut basis = RitzBasis::new(&system, reduced.scale(), tolerance);
    let mut krylov_dim = self.krylov_dim(dim, nmodes);
    let mut confirmations = 0;
    let mut failure = None;

    for run in 0..self.max_runs {
      debug!(dim, nmodes, krylov_dim, run, shift, "lanczos eigensolve");
      let relabeling = Relabeling::new(dim, run);
      let eigen = relabeling
        .apply(&reduced.system)
        .to_nalgebra_csc()
        .eigsh(krylov_dim, lanczos::Order::Smallest);

      let ncandidates = eigen.eigenvalues.len().min(eigen.eigenvectors.ncols());
      let candidates = (0..ncandidates)
        .filter(|&j| {
          eigen.eigenvalues[j].is_finite()
            && eigen.eigenvectors.column(j).iter().all(|x| x.is_finite())
        })
        .sorted_by(|&a, &b| {
          let da = (eigen.eigenvalues[a] - shift).abs();
          let db = (eigen.eigenvalues[b] - shift).abs();
          da.total_cmp(&db)
        })
        .collect_vec();
      if candidates.len() < ncandidates {
        warn!(
          discarded = ncandidates - candidates.len(),
          "discarding non-finite ritz pairs"
        );
      }

      let before = basis.window(nmodes, shift);
      let mut unconverged = Vec::new();
      for j in candidates {
        if !basis.is_relevant(eigen.eigenvalues[j], nmodes, shift) {
          continue;
        }
        let vector = relabeling.restore(eigen.eigenvectors.column(j));
        if let Candidate::Unconverged { value, residual } = basis.insert(vector) {
          unconverged.push((value, residual));
        }
      }
      let window = basis.window(nmodes, shift);
      let unconverged = unconverged
        .into_iter()
        .filter(|_| krylov_dim < dim)
        .find(|&(value, _)| basis.is_relevant(value, nmodes, shift));

      if let Some((value, residual)) = unconverged {
        let mode = basis.rank(value, shift);
        debug!(mode, residual, "ritz pair not converged; growing krylov subspace");
        failure = Some(EvpError::NotConverged { mode, residual });
        krylov_dim = (2 * krylov_dim).min(dim);
        confirmations = 0;
        continue;
      }
      if window.len() < nmodes {
        failure = Some(EvpError::NotEnoughModes {
          requested: nmodes,
          found: window.len(),
        });
        krylov_dim = (2 * krylov_dim).min(dim);
        confirmations = 0;
        continue;
      }
      failure = None;
      if window == before {
        confirmations += 1;
        if confirmations >= CONFIRMING_RUNS {
          let (values, vectors) = basis.take(&window);
          let spectrum = reduced.recover(values, vectors, self.tolerance)?;
          return Ok(spectrum);
        }
      } else {
        confirmations = 0;
      }
    }

    let error = failure.unwrap_or(EvpError::Unstable {
      runs: self.max_runs,
    });
    Err(error.into())
  }
}

/// Dense solver for small meshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseEigensolver;
impl Eigensolver for DenseEigensolver {
  fn solve(
    &self,
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    nmodes: usize,
    shift: f64,
  ) -> Result<Spectrum, BoxError> {
    let reduced = StandardEvp::reduce(laplacian, mass, nmodes)?;
    debug!(dim = reduced.dim(), nmodes, shift, "dense eigensolve");

    let system = reduced.system.to_nalgebra_dense();
    // Symmetrize against round-off from the scaling.
    let system = (&system + system.transpose()) * 0.5;
    let eigen = na::SymmetricEigen::new(system);
    let (values, vectors) = select_nearest(&eigen.eigenvalues, &eigen.eigenvectors, nmodes, shift)?;
    let spectrum = reduced.recover(values, vectors, DEFAULT_TOLERANCE)?;
    Ok(spectrum)
  }
}

/// Generalized problem with diagonal mass reduced to standard form.
struct StandardEvp<'a> {
  laplacian: &'a nas::CscMatrix<f64>,
  mass_diagonal: na::DVector<f64>,
  mass_inv_sqrt: na::DVector<f64>,
  system: SparseMatrix,
}
impl<'a> StandardEvp<'a> {
  fn reduce(
    laplacian: &'a nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    nmodes: usize,
  ) -> Result<Self, EvpError> {
    let dim = laplacian.nrows();
    if laplacian.ncols() != dim || mass.nrows() != dim || mass.ncols() != dim {
      return Err(EvpError::DimensionMismatch {
        laplacian_rows: laplacian.nrows(),
        laplacian_cols: laplacian.ncols(),
        mass_rows: mass.nrows(),
        mass_cols: mass.ncols(),
      });
    }
    if nmodes == 0 || nmodes > dim {
      return Err(EvpError::InvalidModeCount {
        requested: nmodes,
        dim,
      });
    }

    let mass_diagonal = SparseMatrix::from(mass).try_into_diagonal()?;
    if let Some((vertex, &value)) = mass_diagonal
      .iter()
      .enumerate()
      .find(|&(_, &m)| !(m > 0.0 && m.is_finite()))
    {
      return Err(EvpError::NonPositiveMass { vertex, value });
    }
    let mass_inv_sqrt = mass_diagonal.map(|m| m.sqrt().recip());

    let system = SparseMatrix::from(laplacian).scale_symmetric(&mass_inv_sqrt);
    Ok(Self {
      laplacian,
      mass_diagonal,
      mass_inv_sqrt,
      system,
    })
  }

  fn dim(&self) -> usize {
    self.mass_inv_sqrt.len()
  }

  /// Largest absolute diagonal entry of the standard operator.
  ///
  /// Bounds the spectral radius of a Laplacian up to a factor of two and
  /// serves as the unit for residuals.
  fn scale(&self) -> f64 {
    let scale = self
      .system
      .triplets()
      .iter()
      .filter(|&&(r, c, _)| r == c)
      .map(|&(_, _, v)| v.abs())
      .fold(0.0, f64::max);
    if scale > 0.0 {
      scale
    } else {
      1.0
    }
  }

  /// `sqrt(max M / min M)`.
  fn mass_conditioning(&self) -> f64 {
    let max = self.mass_diagonal.max();
    let min = self.mass_diagonal.min();
    (max / min).sqrt()
  }

  /// Maps standard eigenvectors back to the generalized problem and checks
  /// every pair against `tolerance`.
  fn recover(
    &self,
    values: na::DVector<f64>,
    mut vectors: na::DMatrix<f64>,
    tolerance: f64,
  ) -> Result<Spectrum, EvpError> {
    vectors
      .column_iter_mut()
      .for_each(|mut c| c.component_mul_assign(&self.mass_inv_sqrt));

    let scale = self.scale();
    for (mode, (&value, v)) in values.iter().zip(vectors.column_iter()).enumerate() {
      let mv = v.component_mul(&self.mass_diagonal);
      let lv = self.laplacian * v.clone_owned();
      let residual = (lv - &mv * value).norm() / (mv.norm() * scale);
      if !(residual <= tolerance) {
        return Err(EvpError::NotConverged { mode, residual });
      }
    }

    Ok(Spectrum::new(values, vectors))
  }
}

/// Keeps the `nmodes` finite pairs closest to `shift`.
fn select_nearest(
  eigenvalues: &na::DVector<f64>,
  eigenvectors: &na::DMatrix<f64>,
  nmodes: usize,
  shift: f64,
) -> Result<(na::DVector<f64>, na::DMatrix<f64>), EvpError> {
  let candidates = eigenvalues.len().min(eigenvectors.ncols());
  let finite = (0..candidates)
    .filter(|&j| {
      eigenvalues[j].is_finite() && eigenvectors.column(j).iter().all(|x| x.is_finite())
    })
    .collect_vec();
  if finite.is_empty() {
    return Err(EvpError::NonFinite);
  }
  if finite.len() < nmodes {
    return Err(EvpError::NotEnoughModes {
      requested: nmodes,
      found: finite.len(),
    });
  }

  let selected = finite
    .into_iter()
    .sorted_by(|&a, &b| {
      let da = (eigenvalues[a] - shift).abs();
      let db = (eigenvalues[b] - shift).abs();
      da.total_cmp(&db)
    })
    .take(nmodes)
    .collect_vec();

  let values = na::DVector::from_iterator(nmodes, selected.iter().map(|&j| eigenvalues[j]));
  let vectors = eigenvectors.select_columns(&selected);
  Ok((values, vectors))
}

/// Symmetric relabelling `S' = P D S D P^T` of the standard operator.
///
/// `P` is a stride permutation, `D` a sign pattern. Running Lanczos on `S'`
/// amounts to a different start vector for `S`, which is what surfaces
/// further vectors of a repeated eigenvalue.
struct Relabeling {
  perm: Vec<usize>,
  signs: Vec<f64>,
}
impl Relabeling {
  fn new(dim: usize, run: usize) -> Self {
    if run == 0 || dim < 2 {
      return Self {
        perm: (0..dim).collect(),
        signs: vec![1.0; dim],
      };
    }
    let mut stride = (dim as f64 * 0.618_034) as usize + run;
    while num_integer::gcd(stride, dim) != 1 {
      stride += 1;
    }
    let perm = (0..dim).map(|i| (stride * i + run) % dim).collect();
    let signs = (0..dim)
      .map(|i| if (7 * i + run) % 3 == 0 { -1.0 } else { 1.0 })
      .collect();
    Self { perm, signs }
  }

  fn apply(&self, matrix: &SparseMatrix) -> SparseMatrix {
    let triplets = matrix
      .triplets()
      .iter()
      .map(|&(r, c, v)| (self.perm[r], self.perm[c], self.signs[r] * self.signs[c] * v))
      .collect();
    SparseMatrix::new(matrix.nrows(), matrix.ncols(), triplets)
  }

  /// Eigenvector of `S'` to eigenvector of `S`.
  fn restore(&self, vector: na::DVectorView<'_, f64>) -> na::DVector<f64> {
    na::DVector::from_fn(self.perm.len(), |i, _| self.signs[i] * vector[self.perm[i]])
  }
}

enum Candidate {
  Accepted,
  Duplicate,
  Unconverged { value: f64, residual: f64 },
}

/// Orthonormal set of converged eigenvectors of the standard operator,
/// collected over several Lanczos runs.
struct RitzBasis<'a> {
  system: &'a nas::CscMatrix<f64>,
  scale: f64,
  tolerance: f64,
  values: Vec<f64>,
  vectors: Vec<na::DVector<f64>>,
}
impl<'a> RitzBasis<'a> {
  /// Remainders shorter than this after projecting out the basis are copies.
  const DUPLICATE_NORM: f64 = 0.1;

  fn new(system: &'a nas::CscMatrix<f64>, scale: f64, tolerance: f64) -> Self {
    Self {
      system,
      scale,
      tolerance,
      values: Vec::new(),
      vectors: Vec::new(),
    }
  }

  fn insert(&mut self, mut vector: na::DVector<f64>) -> Candidate {
    let norm = vector.norm();
    if !(norm > 0.0 && norm.is_finite()) {
      return Candidate::Duplicate;
    }
    vector /= norm;
    // Twice, for orthogonality in floating point.
    for _ in 0..2 {
      for known in &self.vectors {
        let overlap = known.dot(&vector);
        vector.axpy(-overlap, known, 1.0);
      }
    }
    let norm = vector.norm();
    if norm < Self::DUPLICATE_NORM {
      return Candidate::Duplicate;
    }
    vector /= norm;

    let image = self.system * &vector;
    let value = vector.dot(&image);
    let residual = (image - &vector * value).norm() / self.scale;
    if !(residual <= self.tolerance) {
      return Candidate::Unconverged { value, residual };
    }
    self.values.push(value);
    self.vectors.push(vector);
    Candidate::Accepted
  }

  /// Indices of the (at most) `nmodes` known pairs closest to `shift`.
  fn window(&self, nmodes: usize, shift: f64) -> Vec<usize> {
    (0..self.values.len())
      .sorted_by(|&a, &b| {
        let da = (self.values[a] - shift).abs();
        let db = (self.values[b] - shift).abs();
        da.total_cmp(&db)
      })
      .take(nmodes)
      .collect()
  }

  /// Whether a pair with eigenvalue near `value` could enter the window.
  fn is_relevant(&self, value: f64, nmodes: usize, shift: f64) -> bool {
    let window = self.window(nmodes, shift);
    match window.last() {
      Some(&last) if window.len() == nmodes => {
        let bound = (self.values[last] - shift).abs();
        (value - shift).abs() <= bound + self.tolerance * self.scale
      }
      _ => true,
    }
  }

  /// Position `value` would take among the known pairs.
  fn rank(&self, value: f64, shift: f64) -> usize {
    let distance = (value - shift).abs();
    self
      .values
      .iter()
      .filter(|&&v| (v - shift).abs() < distance)
      .count()
  }

  fn take(&self, window: &[usize]) -> (na::DVector<f64>, na::DMatrix<f64>) {
    let values = na::DVector::from_iterator(window.len(), window.iter().map(|&i| self.values[i]));
    let columns = window.iter().map(|&i| self.vectors[i].clone()).collect_vec();
    (values, na::DMatrix::from_columns(&columns))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::mesh::gen;

  fn path_laplacian(n: usize) -> nas::CscMatrix<f64> {
    let mut l = SparseMatrix::zeros(n, n);
    for i in 0..n - 1 {
      l.push(i, i, 1.0);
      l.push(i + 1, i + 1, 1.0);
      l.push(i, i + 1, -1.0);
      l.push(i + 1, i, -1.0);
    }
    l.to_nalgebra_csc()
  }

  fn diagonal(values: &[f64]) -> nas::CscMatrix<f64> {
    SparseMatrix::from_diagonal(&na::DVector::from_column_slice(values)).to_nalgebra_csc()
  }

  #[test]
  fn dense_path_graph_spectrum() {
    let n = 5;
    let spectrum = DenseEigensolver
      .solve(&path_laplacian(n), &diagonal(&[1.0; 5]), 3, DEFAULT_SHIFT)
      .unwrap();
    assert_eq!(spectrum.nmodes(), 3);
    assert_eq!(spectrum.eigenvectors().shape(), (n, 3));
    for (j, &lambda) in spectrum.eigenvalues().iter().enumerate() {
      let exact = 2.0 - 2.0 * (j as f64 * std::f64::consts::PI / n as f64).cos();
      assert!((lambda - exact).abs() < 1e-10, "mode {j}: {lambda} vs {exact}");
    }
  }

  #[test]
  fn dense_generalized_residual() {
    let laplacian = path_laplacian(4);
    let mass = diagonal(&[0.5, 1.0, 2.0, 0.25]);
    let spectrum = DenseEigensolver.solve(&laplacian, &mass, 2, DEFAULT_SHIFT).unwrap();

    let l = SparseMatrix::from(&laplacian).to_nalgebra_dense();
    let m = SparseMatrix::from(&mass).to_nalgebra_dense();
    for (j, &lambda) in spectrum.eigenvalues().iter().enumerate() {
      let v = spectrum.mode(j);
      let residual = &l * v - lambda * (&m * v);
      assert!(residual.norm() < 1e-10);
      assert!(v.norm() > 0.0);
    }
  }

  #[test]
  fn modes_ordered_by_distance_to_shift() {
    let spectrum = DenseEigensolver
      .solve(&path_laplacian(5), &diagonal(&[1.0; 5]), 5, 2.0)
      .unwrap();
    let distances: Vec<f64> = spectrum
      .eigenvalues()
      .iter()
      .map(|l| (l - 2.0).abs())
      .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1] + 1e-12));
  }

  #[test]
  fn non_diagonal_mass_is_rejected() {
    let err = LanczosEigensolver::new()
      .solve(&path_laplacian(3), &path_laplacian(3), 1, DEFAULT_SHIFT)
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EvpError>(),
      Some(EvpError::NonDiagonalMass { .. })
    ));
  }

  #[test]
  fn zero_mass_is_rejected() {
    let mass = diagonal(&[1.0, 0.0, 1.0]);
    let err = DenseEigensolver
      .solve(&path_laplacian(3), &mass, 1, DEFAULT_SHIFT)
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EvpError>(),
      Some(EvpError::NonPositiveMass { vertex: 1, .. })
    ));
  }

  #[test]
  fn mode_count_is_checked() {
    let mass = diagonal(&[1.0; 3]);
    for nmodes in [0, 4] {
      let err = LanczosEigensolver::new()
        .solve(&path_laplacian(3), &mass, nmodes, DEFAULT_SHIFT)
        .unwrap_err();
      assert!(matches!(
        err.downcast_ref::<EvpError>(),
        Some(EvpError::InvalidModeCount { dim: 3, .. })
      ));
    }
  }

  #[test]
  fn shape_mismatch_is_rejected() {
    let err = DenseEigensolver
      .solve(&path_laplacian(3), &diagonal(&[1.0; 4]), 1, DEFAULT_SHIFT)
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EvpError>(),
      Some(EvpError::DimensionMismatch { .. })
    ));
  }

  #[test]
  fn default_krylov_dim_is_clamped() {
    let solver = LanczosEigensolver::new();
    assert_eq!(solver.krylov_dim(10, 3), 10);
    assert_eq!(solver.krylov_dim(1000, 3), 43);
    assert_eq!(solver.krylov_dim(1000, 40), 160);
    assert_eq!(LanczosEigensolver::with_krylov_dim(2).krylov_dim(100, 5), 5);
  }

  /// Edge graph Laplacian of a geodesic sphere with a lumped mass.
  ///
  /// `perturbed` varies edge weights and masses to split the repeated
  /// eigenvalues of the symmetric sphere.
  fn sphere_graph_evp(
    nsubdivisions: usize,
    perturbed: bool,
  ) -> (nas::CscMatrix<f64>, nas::CscMatrix<f64>) {
    let mesh = gen::sphere_surface(nsubdivisions);
    let n = mesh.nvertices();
    let edges = mesh
      .triangles()
      .iter()
      .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
      .map(|(u, v)| (u.min(v), u.max(v)))
      .unique()
      .collect_vec();

    let mut laplacian = SparseMatrix::zeros(n, n);
    for (u, v) in edges {
      let weight = if perturbed {
        1.0 + 0.37 * ((u * 31 + v * 17) % 11) as f64 / 11.0
      } else {
        1.0
      };
      laplacian.push(u, u, weight);
      laplacian.push(v, v, weight);
      laplacian.push(u, v, -weight);
      laplacian.push(v, u, -weight);
    }
    let mass = na::DVector::from_fn(n, |i, _| {
      if perturbed {
        1.0 + 0.5 * ((i * 5) % 7) as f64 / 7.0
      } else {
        1.0
      }
    });
    (
      laplacian.to_nalgebra_csc(),
      SparseMatrix::from_diagonal(&mass).to_nalgebra_csc(),
    )
  }

  fn relative_residual(
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    lambda: f64,
    v: na::DVectorView<'_, f64>,
  ) -> f64 {
    let v = v.clone_owned();
    let mv = mass * &v;
    (laplacian * &v - &mv * lambda).norm() / mv.norm()
  }

  fn assert_matches_dense(
    laplacian: &nas::CscMatrix<f64>,
    mass: &nas::CscMatrix<f64>,
    spectrum: &Spectrum,
    nmodes: usize,
  ) {
    let dense = DenseEigensolver
      .solve(laplacian, mass, nmodes, DEFAULT_SHIFT)
      .unwrap();
    assert_eq!(spectrum.nmodes(), nmodes);
    for j in 0..nmodes {
      let (lambda, expected) = (spectrum.eigenvalues()[j], dense.eigenvalues()[j]);
      assert!(
        (lambda - expected).abs() < 1e-7,
        "mode {j}: {lambda} vs {expected}"
      );
      let residual = relative_residual(laplacian, mass, lambda, spectrum.mode(j));
      assert!(residual < 1e-6, "mode {j}: residual {residual}");
    }
  }

  #[test]
  fn lanczos_matches_dense_on_weighted_spheres() {
    let nmodes = 4;
    for nsubdivisions in 1..=2 {
      let (laplacian, mass) = sphere_graph_evp(nsubdivisions, true);
      let spectrum = LanczosEigensolver::new()
        .solve(&laplacian, &mass, nmodes, DEFAULT_SHIFT)
        .unwrap();
      assert_matches_dense(&laplacian, &mass, &spectrum, nmodes);
    }
  }

  #[test]
  fn lanczos_on_repeated_eigenvalues_is_right_or_fails() {
    let nmodes = 4;
    for nsubdivisions in 1..=2 {
      let (laplacian, mass) = sphere_graph_evp(nsubdivisions, false);
      match LanczosEigensolver::new().solve(&laplacian, &mass, nmodes, DEFAULT_SHIFT) {
        Ok(spectrum) => assert_matches_dense(&laplacian, &mass, &spectrum, nmodes),
        Err(err) => assert!(
          matches!(
            err.downcast_ref::<EvpError>(),
            Some(
              EvpError::NotConverged { .. }
                | EvpError::NotEnoughModes { .. }
                | EvpError::Unstable { .. }
            )
          ),
          "unexpected error: {err}"
        ),
      }
    }
  }

  #[test]
  fn single_lanczos_run_reports_failure() {
    let (laplacian, mass) = sphere_graph_evp(2, true);
    let solver = LanczosEigensolver::with_krylov_dim(4).with_max_runs(1);
    let err = solver
      .solve(&laplacian, &mass, 4, DEFAULT_SHIFT)
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EvpError>(),
      Some(
        EvpError::NotConverged { .. } | EvpError::NotEnoughModes { .. } | EvpError::Unstable { .. }
      )
    ));
  }

  #[test]
  fn recover_rejects_non_eigenpair() {
    let laplacian = path_laplacian(4);
    let mass = diagonal(&[1.0, 2.0, 1.0, 2.0]);
    let reduced = StandardEvp::reduce(&laplacian, &mass, 1).unwrap();

    let values = na::DVector::from_element(1, 5.0);
    let vectors = na::DMatrix::from_fn(4, 1, |i, _| if i == 0 { 1.0 } else { 0.0 });
    let err = reduced
      .recover(values, vectors, DEFAULT_TOLERANCE)
      .unwrap_err();
    assert!(matches!(err, EvpError::NotConverged { mode: 0, .. }));
  }

  #[test]
  fn ritz_basis_drops_copies_and_unconverged_vectors() {
    let system = path_laplacian(4);
    let mut basis = RitzBasis::new(&system, 2.0, DEFAULT_TOLERANCE);

    let constant = na::DVector::from_element(4, 0.5);
    assert!(matches!(basis.insert(constant.clone()), Candidate::Accepted));
    assert!(matches!(basis.insert(-constant * 3.0), Candidate::Duplicate));

    let unit = na::DVector::from_fn(4, |i, _| if i == 0 { 1.0 } else { 0.0 });
    assert!(matches!(
      basis.insert(unit),
      Candidate::Unconverged { .. }
    ));
    assert_eq!(basis.window(4, DEFAULT_SHIFT), vec![0]);
  }

  #[test]
  fn relabeled_eigenvectors_are_restored() {
    let (laplacian, _) = sphere_graph_evp(0, true);
    let system = SparseMatrix::from(&laplacian);
    let dim = system.nrows();
    for run in 0..4 {
      let relabeling = Relabeling::new(dim, run);
      let relabeled = relabeling.apply(&system).to_nalgebra_dense();
      let eigen = na::SymmetricEigen::new(relabeled);
      let original = system.to_nalgebra_dense();
      for (j, &lambda) in eigen.eigenvalues.iter().enumerate() {
        let v = relabeling.restore(eigen.eigenvectors.column(j));
        assert!((&original * &v - &v * lambda).norm() < 1e-10);
      }
    }
  }
}
