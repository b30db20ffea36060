//! Orchestration of operator, spectrum, graph and clustering for one mesh.

use crate::{
  cluster::{ClusterInput, ClusterModel, GraphClusterer},
  error::{Result, SegmentationError},
  evp::{Eigensolver, EvpConfig, Spectrum},
  graph::NeighborhoodGraph,
  mesh::SurfaceMesh,
  operator::{DifferentialOperator, LaplacianBuilder},
};

use tracing::{debug, info, warn};

/// Progress of a [`MeshSegmenter`].
///
/// Computing the operator is independent from the graph steps; it only
/// moves a freshly created segmenter to [`Stage::OperatorReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Initialized,
  OperatorReady,
  GraphReady,
  Segmented,
}

/// Segments one surface mesh.
///
/// Owns the mesh and everything derived from it. The numerical work is done
/// by the three injected collaborators.
pub struct MeshSegmenter<B, E, C> {
  mesh: SurfaceMesh,
  laplacian_builder: B,
  eigensolver: E,
  clusterer: C,
  evp_config: EvpConfig,

  stage: Stage,
  operator: Option<DifferentialOperator>,
  spectrum: Option<Spectrum>,
  graph: Option<NeighborhoodGraph>,
}

impl<B, E, C> MeshSegmenter<B, E, C>
where
  B: LaplacianBuilder,
  E: Eigensolver,
  C: GraphClusterer,
{
  pub fn new(mesh: SurfaceMesh, laplacian_builder: B, eigensolver: E, clusterer: C) -> Self {
    Self {
      mesh,
      laplacian_builder,
      eigensolver,
      clusterer,
      evp_config: EvpConfig::default(),
      stage: Stage::Initialized,
      operator: None,
      spectrum: None,
      graph: None,
    }
  }

  pub fn with_evp_config(mut self, evp_config: EvpConfig) -> Self {
    self.evp_config = evp_config;
    self
  }

  pub fn mesh(&self) -> &SurfaceMesh {
    &self.mesh
  }
  pub fn stage(&self) -> Stage {
    self.stage
  }
  pub fn evp_config(&self) -> &EvpConfig {
    &self.evp_config
  }
  pub fn operator(&self) -> Option<&DifferentialOperator> {
    self.operator.as_ref()
  }
  pub fn spectrum(&self) -> Option<&Spectrum> {
    self.spectrum.as_ref()
  }
  pub fn neighborhood_graph(&self) -> Option<&NeighborhoodGraph> {
    self.graph.as_ref()
  }

  /// Builds the Laplacian and mass matrix and, for `Some(k)`, the `k`
  /// eigenpairs closest to the configured shift.
  ///
  /// `k` must lie in `1..nvertices`. A call without `k` drops any spectrum
  /// from an earlier call.
  pub fn compute_differential_operator(&mut self, nmodes: Option<usize>) -> Result<()> {
    let nvertices = self.mesh.nvertices();
    if let Some(k) = nmodes {
      if k == 0 || k >= nvertices {
        return Err(SegmentationError::InvalidModeCount {
          requested: k,
          nvertices,
        });
      }
    }
    debug!(nvertices, nfaces = self.mesh.nfaces(), ?nmodes, "computing differential operator");
    let degenerate = self.mesh.degenerate_faces();
    if !degenerate.is_empty() {
      warn!(
        ndegenerate = degenerate.len(),
        first = degenerate[0],
        "mesh has faces of zero area"
      );
    }

    let operator = self
      .laplacian_builder
      .build(&self.mesh)
      .map_err(SegmentationError::Geometry)?;
    check_square("laplacian", operator.laplacian(), nvertices)?;
    check_square("mass", operator.mass(), nvertices)?;

    let spectrum = match nmodes {
      Some(k) => {
        let spectrum = self
          .eigensolver
          .solve(operator.laplacian(), operator.mass(), k, self.evp_config.shift)
          .map_err(SegmentationError::Eigensolver)?;
        let (nrows, ncols) = spectrum.eigenvectors().shape();
        if spectrum.nmodes() != k || nrows != nvertices || ncols != k {
          return Err(SegmentationError::SpectrumShape {
            nvalues: spectrum.nmodes(),
            nrows,
            ncols,
            nmodes: k,
            nvertices,
          });
        }
        Some(spectrum)
      }
      None => None,
    };

    self.operator = Some(operator);
    self.spectrum = spectrum;
    if self.stage == Stage::Initialized {
      self.stage = Stage::OperatorReady;
    }
    Ok(())
  }

  /// (Re)builds the vertex adjacency graph from the mesh faces.
  ///
  /// Replaces any earlier graph. On an invalid face the earlier graph is kept.
  pub fn build_neighborhood_graph(&mut self) -> Result<&NeighborhoodGraph> {
    let graph = NeighborhoodGraph::from_mesh(&self.mesh)?;
    debug!(
      nvertices = graph.nvertices(),
      nentries = graph.nentries(),
      "built neighborhood graph"
    );
    let nisolated = graph.isolated_vertices().count();
    if nisolated > 0 {
      warn!(nisolated, "neighborhood graph has isolated vertices");
    }

    self.stage = Stage::GraphReady;
    Ok(&*self.graph.insert(graph))
  }

  /// Clusters the neighborhood graph, using `weights` as per-vertex density.
  ///
  /// Requires [`Self::build_neighborhood_graph`] to have been called.
  pub fn segment(&mut self, weights: Option<&[f64]>) -> Result<C::Model> {
    let graph = self.graph.as_ref().ok_or(SegmentationError::GraphNotBuilt)?;
    let nvertices = graph.nvertices();

    if let Some(weights) = weights {
      if weights.len() != nvertices {
        return Err(SegmentationError::WeightCountMismatch {
          nweights: weights.len(),
          nvertices,
        });
      }
      if let Some((vertex, &weight)) = weights
        .iter()
        .enumerate()
        .find(|&(_, &w)| !(w.is_finite() && w >= 0.0))
      {
        return Err(SegmentationError::InvalidWeight { vertex, weight });
      }
    }

    let input = ClusterInput::new(graph, weights);
    debug!(
      nvertices,
      graph_type = ?input.graph_type(),
      density_type = ?input.density_type(),
      "clustering neighborhood graph"
    );
    let model = self
      .clusterer
      .fit(input)
      .map_err(SegmentationError::Clustering)?;

    let nlabels = model.labels().len();
    if nlabels != nvertices {
      return Err(SegmentationError::LabelCountMismatch { nlabels, nvertices });
    }
    info!(nclusters = model.nclusters(), "segmented mesh");

    self.stage = Stage::Segmented;
    Ok(model)
  }

  pub fn into_parts(
    self,
  ) -> (
    SurfaceMesh,
    Option<DifferentialOperator>,
    Option<Spectrum>,
    Option<NeighborhoodGraph>,
  ) {
    (self.mesh, self.operator, self.spectrum, self.graph)
  }
}

fn check_square(which: &'static str, matrix: &nas::CscMatrix<f64>, nvertices: usize) -> Result<()> {
  if matrix.nrows() != nvertices || matrix.ncols() != nvertices {
    return Err(SegmentationError::OperatorShape {
      which,
      nrows: matrix.nrows(),
      ncols: matrix.ncols(),
      nvertices,
    });
  }
  Ok(())
}
