//! Vertex adjacency graph induced by mesh faces.

use crate::{
  error::SegmentationError,
  mesh::{validate_triangles, SurfaceMesh},
  VertexIdx,
};

use itertools::Itertools;

/// Per-vertex neighbor lists built from triangle connectivity.
///
/// Every triangle `[i1, i2, i3]` appends `[i2, i3]` to `i1`, `[i1, i3]` to
/// `i2` and `[i1, i2]` to `i3`. Lists are not deduplicated: a neighbor
/// sharing an edge through two faces shows up twice. A graph over `F` faces
/// therefore always holds exactly `6 F` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborhoodGraph {
  lists: Vec<Vec<VertexIdx>>,
}
impl NeighborhoodGraph {
  pub fn from_triangles(
    nvertices: usize,
    triangles: &[[VertexIdx; 3]],
  ) -> Result<Self, SegmentationError> {
    validate_triangles(nvertices, triangles)?;

    let mut lists = vec![Vec::new(); nvertices];
    for &[i1, i2, i3] in triangles {
      lists[i1].extend([i2, i3]);
      lists[i2].extend([i1, i3]);
      lists[i3].extend([i1, i2]);
    }
    Ok(Self { lists })
  }

  pub fn from_mesh(mesh: &SurfaceMesh) -> Result<Self, SegmentationError> {
    Self::from_triangles(mesh.nvertices(), mesh.triangles())
  }

  pub fn nvertices(&self) -> usize {
    self.lists.len()
  }
  /// Total number of adjacency entries over all lists.
  pub fn nentries(&self) -> usize {
    self.lists.iter().map(Vec::len).sum()
  }
  pub fn neighbors(&self, ivertex: VertexIdx) -> &[VertexIdx] {
    &self.lists[ivertex]
  }
  pub fn degree(&self, ivertex: VertexIdx) -> usize {
    self.lists[ivertex].len()
  }
  /// Sorted neighbors without repetitions.
  pub fn unique_neighbors(&self, ivertex: VertexIdx) -> Vec<VertexIdx> {
    self.lists[ivertex].iter().copied().sorted_unstable().dedup().collect()
  }
  /// Vertices not referenced by any face.
  pub fn isolated_vertices(&self) -> impl Iterator<Item = VertexIdx> + '_ {
    self.lists.iter().positions(Vec::is_empty)
  }

  pub fn iter(&self) -> impl Iterator<Item = &[VertexIdx]> {
    self.lists.iter().map(Vec::as_slice)
  }
  pub fn as_lists(&self) -> &[Vec<VertexIdx>] {
    &self.lists
  }
  pub fn into_lists(self) -> Vec<Vec<VertexIdx>> {
    self.lists
  }
}
