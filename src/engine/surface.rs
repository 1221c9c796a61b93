use parry3d_f64::math::{Point, Vector};
use parry3d_f64::query::{PointQuery, Ray, RayCast};
use parry3d_f64::shape::TriMesh;

use super::{EngineError, EngineResult};
use crate::geometry::vector::{self, Vec3};
use crate::mesh::Mesh;

/// BVH-accelerated view of a mesh surface
pub struct SurfaceQuery {
    trimesh: TriMesh,
}

fn to_point(p: Vec3) -> Point<f64> {
    Point::new(p[0], p[1], p[2])
}

impl SurfaceQuery {
    /// Build the query structure from a (fan-triangulated) copy of the mesh
    pub fn new(mesh: &Mesh) -> EngineResult<Self> {
        let indices = mesh.triangles();
        if indices.is_empty() {
            return Err(EngineError::EmptyMesh);
        }
        if !mesh.positions.iter().all(|p| vector::is_finite(*p)) {
            return Err(EngineError::MalformedMesh(
                "vertex coordinates contain NaN or infinity".to_string(),
            ));
        }

        let points = mesh.positions.iter().map(|p| to_point(*p)).collect();
        let trimesh = TriMesh::new(points, indices)
            .map_err(|e| EngineError::MalformedMesh(format!("{e:?}")))?;
        Ok(Self { trimesh })
    }

    /// Closest point on the surface
    pub fn nearest_point(&self, p: Vec3) -> Vec3 {
        let projection = self.trimesh.project_local_point(&to_point(p), false);
        [projection.point.x, projection.point.y, projection.point.z]
    }

    /// Distance along `dir` from `origin` to the first surface hit, if any
    pub fn cast(&self, origin: Vec3, dir: Vec3, max_distance: f64) -> Option<f64> {
        let ray = Ray::new(to_point(origin), Vector::new(dir[0], dir[1], dir[2]));
        self.trimesh.cast_local_ray(&ray, max_distance, false)
    }
}
