//! Triangle surface meshes embedded in 3D.

pub mod gen;

use crate::{error::SegmentationError, VertexIdx};

/// Triangulated surface: vertex coordinates plus triangles of vertex indices.
///
/// Vertex `i` is column `i` of [`Self::node_coords`]. The index order is
/// what every derived structure (operator, eigenvectors, graph) is keyed by.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
  triangles: Vec<[VertexIdx; 3]>,
  node_coords: na::Matrix3xX<f64>,
}
impl SurfaceMesh {
  pub fn new(triangles: Vec<[VertexIdx; 3]>, node_coords: na::Matrix3xX<f64>) -> Self {
    Self {
      triangles,
      node_coords,
    }
  }
  pub fn from_vertices(vertices: &[[f64; 3]], triangles: Vec<[VertexIdx; 3]>) -> Self {
    let columns: Vec<_> = vertices
      .iter()
      .map(|&[x, y, z]| na::Vector3::new(x, y, z))
      .collect();
    Self::new(triangles, na::Matrix3xX::from_columns(&columns))
  }

  pub fn triangles(&self) -> &[[VertexIdx; 3]] {
    &self.triangles
  }
  pub fn node_coords(&self) -> &na::Matrix3xX<f64> {
    &self.node_coords
  }
  pub fn nvertices(&self) -> usize {
    self.node_coords.ncols()
  }
  pub fn nfaces(&self) -> usize {
    self.triangles.len()
  }
  pub fn into_parts(self) -> (Vec<[VertexIdx; 3]>, na::Matrix3xX<f64>) {
    (self.triangles, self.node_coords)
  }

  /// Checks that every face references an existing vertex.
  pub fn validate_faces(&self) -> Result<(), SegmentationError> {
    validate_triangles(self.nvertices(), &self.triangles)
  }

  /// Area of a triangle. Zero for degenerate faces.
  pub fn face_area(&self, iface: usize) -> f64 {
    let [v0, v1, v2] = self.triangles[iface].map(|i| self.node_coords.column(i));
    let e0 = v1 - v0;
    let e1 = v2 - v0;
    0.5 * e0.cross(&e1).norm()
  }

  /// Faces whose area vanishes relative to their longest edge.
  ///
  /// Faces with out-of-range vertex indices are skipped.
  pub fn degenerate_faces(&self) -> Vec<usize> {
    let nvertices = self.nvertices();
    (0..self.nfaces())
      .filter(|&iface| self.triangles[iface].iter().all(|&v| v < nvertices))
      .filter(|&iface| {
        let [v0, v1, v2] = self.triangles[iface].map(|i| self.node_coords.column(i));
        let longest = [v1 - v0, v2 - v1, v0 - v2]
          .iter()
          .map(|e| e.norm_squared())
          .fold(0.0, f64::max);
        self.face_area(iface) <= DEGENERATE_AREA_RATIO * longest
      })
      .collect()
  }
}

const DEGENERATE_AREA_RATIO: f64 = 1e-12;

pub(crate) fn validate_triangles(
  nvertices: usize,
  triangles: &[[VertexIdx; 3]],
) -> Result<(), SegmentationError> {
  for (face, triangle) in triangles.iter().enumerate() {
    if let Some(&vertex) = triangle.iter().find(|&&v| v >= nvertices) {
      return Err(SegmentationError::FaceIndexOutOfRange {
        face,
        vertex,
        nvertices,
      });
    }
  }
  Ok(())
}
