//! Closed surface meshes for demos and tests.

use super::SurfaceMesh;
use crate::VertexIdx;

use itertools::Itertools;
use std::collections::HashMap;

/// Regular tetrahedron inscribed in the unit sphere.
pub fn tetrahedron() -> SurfaceMesh {
  let s = 3.0f64.sqrt().recip();
  let vertices = [[s, s, s], [s, -s, -s], [-s, s, -s], [-s, -s, s]].map(na::Vector3::from);
  regular_hull(&vertices)
}

/// Regular icosahedron inscribed in the unit sphere.
///
/// Its corners are the cyclic permutations of `(0, ±1, ±φ)`.
pub fn icosahedron() -> SurfaceMesh {
  let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
  let vertices = (0..3)
    .cartesian_product([-1.0, 1.0])
    .cartesian_product([-phi, phi])
    .map(|((axis, a), b)| {
      let mut v = na::Vector3::zeros();
      v[(axis + 1) % 3] = a;
      v[(axis + 2) % 3] = b;
      v
    })
    .collect_vec();
  regular_hull(&vertices)
}

/// Geodesic sphere from subdividing an icosahedron.
///
/// Has `10 * 4^n + 2` vertices and `20 * 4^n` faces, all outward oriented.
pub fn sphere_surface(nsubdivisions: usize) -> SurfaceMesh {
  let (mut triangles, coords) = icosahedron().into_parts();
  let mut refinement = Refinement {
    vertices: coords.column_iter().map(|c| c.into_owned()).collect(),
    edge_midpoints: HashMap::new(),
  };
  for _ in 0..nsubdivisions {
    triangles = refinement.split(&triangles);
  }
  SurfaceMesh::new(triangles, na::Matrix3xX::from_columns(&refinement.vertices))
}

/// Triangulates the hull of points on a regular polyhedron centered at the
/// origin: faces are the triples of mutually nearest points.
///
/// The result is scaled onto the unit sphere and oriented outward.
fn regular_hull(vertices: &[na::Vector3<f64>]) -> SurfaceMesh {
  let edge_len_sq = vertices
    .iter()
    .tuple_combinations()
    .map(|(a, b)| (a - b).norm_squared())
    .fold(f64::INFINITY, f64::min);
  let is_edge = |a: VertexIdx, b: VertexIdx| {
    ((vertices[a] - vertices[b]).norm_squared() - edge_len_sq).abs() < 1e-9 * edge_len_sq
  };

  let triangles = (0..vertices.len())
    .tuple_combinations()
    .filter(|&(a, b, c)| is_edge(a, b) && is_edge(b, c) && is_edge(c, a))
    .map(|(a, b, c)| {
      let normal = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
      if normal.dot(&vertices[a]) < 0.0 {
        [a, c, b]
      } else {
        [a, b, c]
      }
    })
    .collect_vec();

  let vertices = vertices.iter().map(|v| v.normalize()).collect_vec();
  SurfaceMesh::new(triangles, na::Matrix3xX::from_columns(&vertices))
}

/// 1-to-4 split of spherical triangles, sharing edge midpoints
/// between neighboring faces.
struct Refinement {
  vertices: Vec<na::Vector3<f64>>,
  edge_midpoints: HashMap<[VertexIdx; 2], VertexIdx>,
}
impl Refinement {
  fn split(&mut self, triangles: &[[VertexIdx; 3]]) -> Vec<[VertexIdx; 3]> {
    let mut refined = Vec::with_capacity(4 * triangles.len());
    for &[a, b, c] in triangles {
      let [ab, bc, ca] = [[a, b], [b, c], [c, a]].map(|edge| self.midpoint(edge));
      refined.extend([[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]);
    }
    refined
  }

  /// Index of the edge midpoint, pushed out onto the unit sphere.
  fn midpoint(&mut self, [a, b]: [VertexIdx; 2]) -> VertexIdx {
    let key = if a < b { [a, b] } else { [b, a] };
    if let Some(&imid) = self.edge_midpoints.get(&key) {
      return imid;
    }
    let imid = self.vertices.len();
    self
      .vertices
      .push((self.vertices[a] + self.vertices[b]).normalize());
    self.edge_midpoints.insert(key, imid);
    imid
  }
}
