use tracing::debug;

use super::surface::SurfaceQuery;
use super::{EngineError, EngineResult, ProjectMethod, ProjectParams};
use crate::geometry::vector;
use crate::mesh::Mesh;

/// Move the vertices of `mesh` onto `target`.
///
/// With [`ProjectMethod::Project`] each vertex is cast along its normal in
/// the enabled directions and lands on the closest hit; vertices whose rays
/// miss stay where they are. [`ProjectMethod::NearestSurfacePoint`] always
/// succeeds. In both modes the final position is pushed `offset` away from
/// the target along the projection direction.
pub fn shrinkwrap(mesh: &mut Mesh, target: &Mesh, params: &ProjectParams) -> EngineResult<()> {
    if !params.offset.is_finite() {
        return Err(EngineError::invalid_param(
            "offset",
            params.offset,
            "must be finite",
        ));
    }
    if let ProjectMethod::Project {
        positive: false,
        negative: false,
    } = params.method
    {
        return Err(EngineError::invalid_param(
            "method",
            "project",
            "needs at least one cast direction",
        ));
    }
    if mesh.positions.is_empty() {
        return Ok(());
    }

    let surface = SurfaceQuery::new(target)?;

    match params.method {
        ProjectMethod::NearestSurfacePoint => {
            for p in &mut mesh.positions {
                let q = surface.nearest_point(*p);
                *p = match vector::normalize(vector::sub(*p, q)) {
                    Some(dir) if params.offset != 0.0 => {
                        vector::add(q, vector::scale(dir, params.offset))
                    }
                    _ => q,
                };
            }
        }
        ProjectMethod::Project { positive, negative } => {
            let normals = mesh.vertex_normals();
            let mut missed = 0usize;

            for (p, n) in mesh.positions.iter_mut().zip(&normals) {
                let mut best: Option<(f64, [f64; 3])> = None;
                let directions = [(positive, *n), (negative, vector::scale(*n, -1.0))];
                for (enabled, dir) in directions {
                    if !enabled || vector::length(dir) == 0.0 {
                        continue;
                    }
                    if let Some(t) = surface.cast(*p, dir, f64::MAX)
                        && best.is_none_or(|(bt, _)| t < bt)
                    {
                        best = Some((t, dir));
                    }
                }

                match best {
                    Some((t, dir)) => {
                        let hit = vector::add(*p, vector::scale(dir, t));
                        *p = vector::add(hit, vector::scale(*n, params.offset));
                    }
                    None => missed += 1,
                }
            }

            if missed > 0 {
                debug!("{} vertices found no surface along their normal", missed);
            }
        }
    }

    Ok(())
}
