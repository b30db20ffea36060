//! Deterministic collaborators for driving `MeshSegmenter` in tests.

#![allow(dead_code)]

use meshseg::{
  cluster::{ClusterInput, ClusterModel, DensityType, GraphClusterer},
  evp::{Eigensolver, Spectrum},
  mesh::SurfaceMesh,
  operator::{DifferentialOperator, LaplacianBuilder},
  sparse::SparseMatrix,
  BoxError,
};

use std::cell::Cell;

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

/// Combinatorial graph Laplacian over the mesh edges with identity mass.
#[derive(Default)]
pub struct GraphLaplacian {
  pub calls: Cell<usize>,
}
impl LaplacianBuilder for GraphLaplacian {
  fn build(&self, mesh: &SurfaceMesh) -> Result<DifferentialOperator, BoxError> {
    self.calls.set(self.calls.get() + 1);

    let n = mesh.nvertices();
    let mut edges: Vec<(usize, usize)> = mesh
      .triangles()
      .iter()
      .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
      .map(|(u, v)| (u.min(v), u.max(v)))
      .collect();
    edges.sort_unstable();
    edges.dedup();

    let mut laplacian = SparseMatrix::zeros(n, n);
    for (u, v) in edges {
      laplacian.push(u, u, 1.0);
      laplacian.push(v, v, 1.0);
      laplacian.push(u, v, -1.0);
      laplacian.push(v, u, -1.0);
    }
    let mass = SparseMatrix::from_diagonal(&na::DVector::from_element(n, 1.0));
    Ok(DifferentialOperator::new(
      laplacian.to_nalgebra_csc(),
      mass.to_nalgebra_csc(),
    ))
  }
}

/// Returns matrices of the wrong size.
pub struct MisshapenLaplacian;
impl LaplacianBuilder for MisshapenLaplacian {
  fn build(&self, mesh: &SurfaceMesh) -> Result<DifferentialOperator, BoxError> {
    let n = mesh.nvertices() + 1;
    let m = SparseMatrix::from_diagonal(&na::DVector::from_element(n, 1.0)).to_nalgebra_csc();
    Ok(DifferentialOperator::new(m.clone(), m))
  }
}

#[derive(Debug)]
pub struct StubError(pub &'static str);
impl std::fmt::Display for StubError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.0)
  }
}
impl std::error::Error for StubError {}

/// Eigensolver fixture: `nmodes` pairs with eigenvalue `j` and unit vectors.
#[derive(Default)]
pub struct FixtureEigensolver {
  pub calls: Cell<usize>,
  pub last_shift: Cell<Option<f64>>,
}
impl Eigensolver for FixtureEigensolver {
  fn solve(
    &self,
    laplacian: &nas::CscMatrix<f64>,
    _mass: &nas::CscMatrix<f64>,
    nmodes: usize,
    shift: f64,
  ) -> Result<Spectrum, BoxError> {
    self.calls.set(self.calls.get() + 1);
    self.last_shift.set(Some(shift));
    let n = laplacian.nrows();
    let values = na::DVector::from_fn(nmodes, |j, _| j as f64);
    let vectors = na::DMatrix::from_fn(n, nmodes, |i, j| if i == j { 1.0 } else { 0.0 });
    Ok(Spectrum::new(values, vectors))
  }
}

/// Always fails like a solver hitting a singular factorization.
pub struct SingularEigensolver;
impl Eigensolver for SingularEigensolver {
  fn solve(
    &self,
    _laplacian: &nas::CscMatrix<f64>,
    _mass: &nas::CscMatrix<f64>,
    _nmodes: usize,
    _shift: f64,
  ) -> Result<Spectrum, BoxError> {
    Err(Box::new(StubError("factor is exactly singular")))
  }
}

/// What the clusterer saw, plus connected components as labels.
#[derive(Debug, Clone)]
pub struct RecordedModel {
  pub labels: Vec<usize>,
  pub density: Option<Vec<f64>>,
  pub density_type: DensityType,
  pub nentries: usize,
}
impl ClusterModel for RecordedModel {
  fn labels(&self) -> &[usize] {
    &self.labels
  }
}

/// Labels the connected components of the neighborhood graph.
#[derive(Default)]
pub struct ComponentClusterer {
  pub calls: Cell<usize>,
}
impl GraphClusterer for ComponentClusterer {
  type Model = RecordedModel;

  fn fit(&self, input: ClusterInput<'_>) -> Result<Self::Model, BoxError> {
    self.calls.set(self.calls.get() + 1);

    let graph = input.graph();
    let mut labels = vec![usize::MAX; graph.nvertices()];
    let mut next = 0;
    for start in 0..graph.nvertices() {
      if labels[start] != usize::MAX {
        continue;
      }
      let mut stack = vec![start];
      labels[start] = next;
      while let Some(v) = stack.pop() {
        for &w in graph.neighbors(v) {
          if labels[w] == usize::MAX {
            labels[w] = next;
            stack.push(w);
          }
        }
      }
      next += 1;
    }

    Ok(RecordedModel {
      labels,
      density: input.density().map(<[f64]>::to_vec),
      density_type: input.density_type(),
      nentries: graph.nentries(),
    })
  }
}

/// Fails like a clusterer rejecting its input.
pub struct RejectingClusterer;
impl GraphClusterer for RejectingClusterer {
  type Model = RecordedModel;

  fn fit(&self, _input: ClusterInput<'_>) -> Result<Self::Model, BoxError> {
    Err(Box::new(StubError("malformed graph")))
  }
}

/// Drops the last label.
pub struct ShortClusterer;
impl GraphClusterer for ShortClusterer {
  type Model = RecordedModel;

  fn fit(&self, input: ClusterInput<'_>) -> Result<Self::Model, BoxError> {
    Ok(RecordedModel {
      labels: vec![0; input.graph().nvertices().saturating_sub(1)],
      density: None,
      density_type: input.density_type(),
      nentries: input.graph().nentries(),
    })
  }
}
