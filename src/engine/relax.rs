use super::{EngineError, EngineResult, SmoothParams};
use crate::geometry::vector::{self, Vec3};
use crate::mesh::{EdgeAdjacency, Mesh};

/// Move every free vertex toward the average of its neighbors.
///
/// Vertices on open boundaries or non-manifold edges stay pinned so the
/// outline of the mesh does not shrink.
pub fn laplacian_smooth(mesh: &mut Mesh, params: &SmoothParams) -> EngineResult<()> {
    if !(params.factor > 0.0 && params.factor <= 1.0) {
        return Err(EngineError::invalid_param(
            "factor",
            params.factor,
            "must be in (0, 1]",
        ));
    }
    if params.iterations == 0 || mesh.positions.is_empty() {
        return Ok(());
    }

    let adjacency = EdgeAdjacency::build(mesh);
    let mut pinned = vec![false; mesh.positions.len()];
    for (a, b) in adjacency
        .boundary_edges()
        .chain(adjacency.non_manifold_edges())
    {
        pinned[a as usize] = true;
        pinned[b as usize] = true;
    }

    let neighbors = mesh.vertex_neighbors();
    let mut next: Vec<Vec3> = mesh.positions.clone();

    for _ in 0..params.iterations {
        for (i, ring) in neighbors.iter().enumerate() {
            if pinned[i] || ring.is_empty() {
                continue;
            }
            let sum = ring
                .iter()
                .fold([0.0; 3], |acc, &n| vector::add(acc, mesh.positions[n as usize]));
            #[allow(clippy::cast_precision_loss)]
            let average = vector::scale(sum, 1.0 / ring.len() as f64);
            next[i] = vector::lerp(mesh.positions[i], average, params.factor);
        }
        mesh.positions.copy_from_slice(&next);
    }

    Ok(())
}
