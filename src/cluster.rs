//! Contract of the density-based mode-seeking graph clusterer (ToMATo family).

use crate::{error::BoxError, graph::NeighborhoodGraph};

/// How the clusterer obtains its proximity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphType {
  /// Graph supplied explicitly, not derived from point coordinates.
  Manual,
}

/// How the clusterer obtains the per-vertex density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityType {
  /// Density supplied explicitly.
  Manual,
  /// No density given; the clusterer derives or assumes one.
  Unspecified,
}

/// Everything handed to the clusterer for one fit.
#[derive(Debug, Clone, Copy)]
pub struct ClusterInput<'a> {
  graph: &'a NeighborhoodGraph,
  density: Option<&'a [f64]>,
}
impl<'a> ClusterInput<'a> {
  pub fn new(graph: &'a NeighborhoodGraph, density: Option<&'a [f64]>) -> Self {
    Self { graph, density }
  }
  pub fn graph(&self) -> &'a NeighborhoodGraph {
    self.graph
  }
  pub fn density(&self) -> Option<&'a [f64]> {
    self.density
  }
  pub fn graph_type(&self) -> GraphType {
    GraphType::Manual
  }
  pub fn density_type(&self) -> DensityType {
    match self.density {
      Some(_) => DensityType::Manual,
      None => DensityType::Unspecified,
    }
  }
}

/// Birth and death density of a cluster in the persistence diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistencePair {
  pub birth: f64,
  pub death: f64,
}
impl PersistencePair {
  pub fn new(birth: f64, death: f64) -> Self {
    Self { birth, death }
  }
  pub fn persistence(&self) -> f64 {
    self.birth - self.death
  }
}

/// Fitted clustering, as produced by a [`GraphClusterer`].
pub trait ClusterModel {
  /// Cluster label per vertex.
  fn labels(&self) -> &[usize];

  fn nclusters(&self) -> usize {
    self.labels().iter().max().map_or(0, |&l| l + 1)
  }

  /// Merge hierarchy, most persistent cluster first.
  fn persistence_diagram(&self) -> Vec<PersistencePair> {
    Vec::new()
  }
}

/// Graph-clustering collaborator.
pub trait GraphClusterer {
  type Model: ClusterModel;

  fn fit(&self, input: ClusterInput<'_>) -> Result<Self::Model, BoxError>;
}

impl<T: GraphClusterer + ?Sized> GraphClusterer for &T {
  type Model = T::Model;

  fn fit(&self, input: ClusterInput<'_>) -> Result<Self::Model, BoxError> {
    (**self).fit(input)
  }
}
