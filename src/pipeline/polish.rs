use crate::engine::{EngineResult, MeshEngine, ProjectMethod, ProjectParams, SmoothParams};
use crate::mesh::Mesh;

pub const RELAX_ITERATIONS: u32 = 10;
pub const RELAX_FACTOR: f64 = 0.1;

/// Relaxation that irons out stair-stepping from the solve
pub const RELAX: SmoothParams = SmoothParams {
    iterations: RELAX_ITERATIONS,
    factor: RELAX_FACTOR,
};

/// Cast along the normal both ways to recover volume lost to relaxing
pub const VOLUME_SNAP: ProjectParams = ProjectParams {
    method: ProjectMethod::Project {
        positive: true,
        negative: true,
    },
    offset: 0.0,
};

/// Nearest-point cleanup of anything the directional pass left behind
pub const SURFACE_SNAP: ProjectParams = ProjectParams {
    method: ProjectMethod::NearestSurfacePoint,
    offset: 0.0,
};

/// Run the three polish passes in order, each committed before the next.
pub fn flow_polish<E: MeshEngine + ?Sized>(
    engine: &mut E,
    mesh: &mut Mesh,
    reference: &Mesh,
) -> EngineResult<()> {
    engine.smooth(mesh, &RELAX)?;
    engine.project(mesh, reference, &VOLUME_SNAP)?;
    engine.project(mesh, reference, &SURFACE_SNAP)
}
