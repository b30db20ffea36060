//! Spectral / topological segmentation of triangulated surface meshes.
//!
//! A [`segment::MeshSegmenter`] owns a [`mesh::SurfaceMesh`], computes its
//! Laplace-Beltrami operator and low-frequency eigenmodes through injected
//! collaborators, builds the vertex [`graph::NeighborhoodGraph`] from the
//! faces and hands that graph to a density-based mode-seeking graph
//! clusterer (ToMATo family).

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod cluster;
pub mod error;
pub mod evp;
pub mod graph;
pub mod mesh;
pub mod operator;
pub mod segment;
pub mod sparse;

pub use error::{BoxError, Result, SegmentationError};
pub use segment::{MeshSegmenter, Stage};

pub type VertexIdx = usize;
pub type FaceIdx = usize;
