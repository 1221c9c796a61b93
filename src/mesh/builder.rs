use hashbrown::HashMap;

use super::polymesh::Mesh;
use crate::geometry::Vec3;

/// A triangle for STL output
#[derive(Debug, Clone)]
pub struct Triangle {
    /// Three vertices: [[x, y, z], [x, y, z], [x, y, z]]
    pub vertices: [[f32; 3]; 3],
    /// Normal vector [nx, ny, nz]
    pub normal: [f32; 3],
}

impl Triangle {
    /// Create a new triangle and calculate its normal
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Self {
        let normal = calculate_normal(v0, v1, v2);
        Self {
            vertices: [v0, v1, v2],
            normal,
        }
    }

    /// Create a triangle from double precision model coordinates
    pub fn from_positions(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let narrow = |p: Vec3| [p[0] as f32, p[1] as f32, p[2] as f32];
        Self::new(narrow(v0), narrow(v1), narrow(v2))
    }
}

/// Calculate the normal vector for a triangle using the cross product
fn calculate_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let u = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let v = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

    let nx = u[1] * v[2] - u[2] * v[1];
    let ny = u[2] * v[0] - u[0] * v[2];
    let nz = u[0] * v[1] - u[1] * v[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-10 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 1.0] // Default to up for degenerate triangles
    }
}

/// Default weld distance for coincident vertices
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-6;

/// Accumulator for indexed polygon meshes.
///
/// Vertices closer than the weld tolerance (per axis, after snapping to a
/// grid of that size) collapse into one, which turns STL-style triangle soup
/// into connected topology.
#[derive(Debug)]
pub struct MeshBuilder {
    positions: Vec<Vec3>,
    polygons: Vec<Vec<u32>>,
    weld: HashMap<[i64; 3], u32>,
    tolerance: f64,
    skipped: usize,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::with_tolerance(DEFAULT_WELD_TOLERANCE)
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            positions: Vec::new(),
            polygons: Vec::new(),
            weld: HashMap::new(),
            tolerance: tolerance.max(f64::MIN_POSITIVE),
            skipped: 0,
        }
    }

    /// Add a vertex, returning the index of an existing one within tolerance
    pub fn add_vertex(&mut self, p: Vec3) -> u32 {
        let key = [
            (p[0] / self.tolerance).round() as i64,
            (p[1] / self.tolerance).round() as i64,
            (p[2] / self.tolerance).round() as i64,
        ];
        let next = self.positions.len() as u32;
        let index = *self.weld.entry(key).or_insert(next);
        if index == next {
            self.positions.push(p);
        }
        index
    }

    /// Add a polygon from corner positions.
    ///
    /// Corners that weld together are merged; a polygon left with fewer than
    /// three distinct corners is dropped and counted in [`skipped`](Self::skipped).
    pub fn add_polygon(&mut self, corners: &[Vec3]) {
        let mut indices: Vec<u32> = Vec::with_capacity(corners.len());
        for &c in corners {
            let idx = self.add_vertex(c);
            if indices.last() != Some(&idx) {
                indices.push(idx);
            }
        }
        while indices.len() > 1 && indices.first() == indices.last() {
            indices.pop();
        }
        if indices.len() < 3 {
            self.skipped += 1;
            return;
        }
        self.polygons.push(indices);
    }

    /// Add a triangle from three vertices
    pub fn add_triangle(&mut self, v0: Vec3, v1: Vec3, v2: Vec3) {
        self.add_polygon(&[v0, v1, v2]);
    }

    /// Add a quad from four vertices in counter-clockwise order
    pub fn add_quad(&mut self, v0: Vec3, v1: Vec3, v2: Vec3, v3: Vec3) {
        self.add_polygon(&[v0, v1, v2, v3]);
    }

    /// Number of polygons accepted so far
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Polygons dropped because they collapsed during welding
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume the builder and return the mesh
    pub fn finish(self) -> Mesh {
        Mesh::from_polygons(self.positions, self.polygons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal() {
        // A triangle in the XY plane should have a Z-pointing normal
        let tri = Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);

        assert!((tri.normal[0]).abs() < 0.001);
        assert!((tri.normal[1]).abs() < 0.001);
        assert!((tri.normal[2] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_mesh_builder_welds_shared_corners() {
        let mut builder = MeshBuilder::new();
        builder.add_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        builder.add_triangle([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0 + 1e-9, 0.0]);

        assert_eq!(builder.len(), 2);
        let mesh = builder.finish();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.unique_edges().len(), 5);
    }

    #[test]
    fn test_mesh_builder_coarse_tolerance() {
        let mut builder = MeshBuilder::with_tolerance(0.01);
        builder.add_triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        builder.add_triangle([1.001, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.999, 0.0]);

        let mesh = builder.finish();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mesh_builder_drops_collapsed_faces() {
        let mut builder = MeshBuilder::new();
        builder.add_triangle([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        builder.add_quad(
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        );

        assert_eq!(builder.len(), 1);
        assert_eq!(builder.skipped(), 1);
        assert_eq!(builder.finish().faces[0].len(), 4);
    }
}
