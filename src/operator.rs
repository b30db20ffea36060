//! Discrete Laplace-Beltrami operator and its geometry collaborator.

use crate::{error::BoxError, mesh::SurfaceMesh};

/// Weak-form Laplacian together with its mass matrix.
///
/// Together they form the generalized eigenproblem `L v = λ M v`.
#[derive(Debug, Clone)]
pub struct DifferentialOperator {
  laplacian: nas::CscMatrix<f64>,
  mass: nas::CscMatrix<f64>,
}
impl DifferentialOperator {
  pub fn new(laplacian: nas::CscMatrix<f64>, mass: nas::CscMatrix<f64>) -> Self {
    Self { laplacian, mass }
  }
  pub fn laplacian(&self) -> &nas::CscMatrix<f64> {
    &self.laplacian
  }
  pub fn mass(&self) -> &nas::CscMatrix<f64> {
    &self.mass
  }
  pub fn into_parts(self) -> (nas::CscMatrix<f64>, nas::CscMatrix<f64>) {
    (self.laplacian, self.mass)
  }
}

/// Geometry-processing collaborator.
///
/// Given the vertex coordinates and triangles of a mesh, produces a sparse
/// symmetric weak Laplacian and a sparse mass matrix, both `N x N`.
pub trait LaplacianBuilder {
  fn build(&self, mesh: &SurfaceMesh) -> Result<DifferentialOperator, BoxError>;
}

impl<T: LaplacianBuilder + ?Sized> LaplacianBuilder for &T {
  fn build(&self, mesh: &SurfaceMesh) -> Result<DifferentialOperator, BoxError> {
    (**self).build(mesh)
  }
}
