use serde::{Deserialize, Serialize};
use tracing::debug;

use super::surface::SurfaceQuery;
use super::voxel::VoxelGrid;
use super::{
    EngineError, EngineResult, MeshEngine, ProjectParams, QuadRemeshParams, SmoothParams,
    VoxelRemeshParams, project, quad, relax,
};
use crate::mesh::{EdgeAdjacency, Mesh, dihedral_angle};

/// Tuning knobs for [`NativeEngine`], read from the `[engine]` config table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NativeEngineConfig {
    /// Upper bound on voxel grid cells for any single voxelization
    pub max_grid_cells: usize,
    /// Voxel sizes the quad solver tries before settling
    pub solver_attempts: u32,
    /// Accepted relative deviation from the target face count
    pub face_tolerance: f64,
}

impl Default for NativeEngineConfig {
    fn default() -> Self {
        Self {
            max_grid_cells: 16_000_000,
            solver_attempts: 4,
            face_tolerance: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeEngine {
    config: NativeEngineConfig,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NativeEngineConfig) -> Self {
        Self { config }
    }
}

impl MeshEngine for NativeEngine {
    fn voxel_remesh(&mut self, mesh: &mut Mesh, params: &VoxelRemeshParams) -> EngineResult<()> {
        if params.adaptivity != 0.0 {
            return Err(EngineError::Unsupported("adaptive voxel remesh"));
        }
        let grid = VoxelGrid::voxelize(
            mesh,
            params.voxel_size,
            [0.0; 3],
            self.config.max_grid_cells,
        )?;
        let surface = SurfaceQuery::new(mesh)?;

        let mut remeshed = grid.surface_mesh();
        if remeshed.is_empty() {
            return Err(EngineError::RemeshFailed(
                "voxel grid captured no volume".to_string(),
            ));
        }
        for p in &mut remeshed.positions {
            *p = surface.nearest_point(*p);
        }

        debug!(
            "Voxel remesh: {} faces -> {} faces at size {:.5}",
            mesh.face_count(),
            remeshed.face_count(),
            params.voxel_size
        );
        let polygons = remeshed.faces.into_iter().map(|f| f.vertices).collect();
        mesh.replace_geometry(remeshed.positions, polygons);
        Ok(())
    }

    fn mark_sharp_edges(&mut self, mesh: &mut Mesh, sharpness: f64) -> EngineResult<usize> {
        if !(sharpness.is_finite() && sharpness >= 0.0) {
            return Err(EngineError::invalid_param(
                "sharpness",
                sharpness,
                "must be a non-negative angle",
            ));
        }
        if mesh.is_empty() {
            return Err(EngineError::EmptyMesh);
        }

        let adjacency = EdgeAdjacency::build(mesh);
        let sharp: Vec<_> = adjacency
            .manifold_edges()
            .filter(|(_, [a, b])| dihedral_angle(mesh, *a, *b) > sharpness)
            .map(|(edge, _)| edge)
            .collect();

        let count = sharp.len();
        mesh.sharp_edges.extend(sharp);
        debug!(
            "Marked {} sharp edges (threshold {:.1}°)",
            count,
            sharpness.to_degrees()
        );
        Ok(count)
    }

    fn quad_remesh(&mut self, mesh: &mut Mesh, params: &QuadRemeshParams) -> EngineResult<()> {
        let mut out = quad::solve(mesh, params, &self.config)?;
        debug!(
            "Quad remesh: target {}, realized {} faces",
            params.target_faces,
            out.face_count()
        );
        out.auto_smooth_angle = mesh.auto_smooth_angle;
        *mesh = out;
        Ok(())
    }

    fn smooth(&mut self, mesh: &mut Mesh, params: &SmoothParams) -> EngineResult<()> {
        relax::laplacian_smooth(mesh, params)
    }

    fn project(&mut self, mesh: &mut Mesh, target: &Mesh, params: &ProjectParams) -> EngineResult<()> {
        project::shrinkwrap(mesh, target, params)
    }
}
