use crate::{FaceIdx, VertexIdx};

use thiserror::Error;

/// Error type returned by injected collaborators.
///
/// Kept opaque so that whatever a collaborator raises reaches the caller
/// with its message and source chain intact.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = SegmentationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SegmentationError {
  #[error("neighborhood graph not defined; call `build_neighborhood_graph()` first")]
  GraphNotBuilt,

  #[error("face {face} references vertex {vertex}, but the mesh has {nvertices} vertices")]
  FaceIndexOutOfRange {
    face: FaceIdx,
    vertex: VertexIdx,
    nvertices: usize,
  },

  #[error("mode count {requested} is invalid for a mesh with {nvertices} vertices (must be positive and below the vertex count)")]
  InvalidModeCount { requested: usize, nvertices: usize },

  #[error("got {nweights} weights for {nvertices} vertices")]
  WeightCountMismatch { nweights: usize, nvertices: usize },

  #[error("weight {weight} of vertex {vertex} is not a finite non-negative density")]
  InvalidWeight { vertex: VertexIdx, weight: f64 },

  #[error("{which} matrix is {nrows}x{ncols}, expected {nvertices}x{nvertices}")]
  OperatorShape {
    which: &'static str,
    nrows: usize,
    ncols: usize,
    nvertices: usize,
  },

  #[error("eigensolver returned {nvalues} eigenvalues and a {nrows}x{ncols} eigenvector matrix, expected {nmodes} and {nvertices}x{nmodes}")]
  SpectrumShape {
    nvalues: usize,
    nrows: usize,
    ncols: usize,
    nmodes: usize,
    nvertices: usize,
  },

  #[error("clustering labelled {nlabels} vertices, expected {nvertices}")]
  LabelCountMismatch { nlabels: usize, nvertices: usize },

  #[error(transparent)]
  Geometry(BoxError),

  #[error(transparent)]
  Eigensolver(BoxError),

  #[error(transparent)]
  Clustering(BoxError),
}

/// Failures of the shipped eigensolver adapters.
#[derive(Debug, Error)]
pub enum EvpError {
  #[error("operator is {laplacian_rows}x{laplacian_cols} but mass is {mass_rows}x{mass_cols}")]
  DimensionMismatch {
    laplacian_rows: usize,
    laplacian_cols: usize,
    mass_rows: usize,
    mass_cols: usize,
  },

  #[error("cannot compute {requested} eigenpairs of a {dim}x{dim} problem")]
  InvalidModeCount { requested: usize, dim: usize },

  #[error("mass matrix has off-diagonal entry at ({row},{col})")]
  NonDiagonalMass { row: usize, col: usize },

  #[error("mass matrix entry {value} at vertex {vertex} is not strictly positive")]
  NonPositiveMass { vertex: VertexIdx, value: f64 },

  #[error("solver produced {found} usable eigenpairs, {requested} requested")]
  NotEnoughModes { requested: usize, found: usize },

  #[error("solver produced non-finite values")]
  NonFinite,

  #[error("eigenpair {mode} did not converge (relative residual {residual:e})")]
  NotConverged { mode: usize, residual: f64 },

  #[error("selected eigenpairs did not settle within {runs} lanczos runs")]
  Unstable { runs: usize },
}
