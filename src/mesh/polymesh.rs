//! Polygon mesh with the per-face and per-edge attributes the pipeline reads.
//!
//! Faces are index lists of three or more vertices with counter-clockwise
//! winding when viewed from outside. Sharp edges are stored as unordered
//! vertex pairs, so they only stay meaningful while the topology they were
//! marked on is alive; [`Mesh::replace_geometry`] clears them.

use hashbrown::HashSet;

use crate::geometry::vector::{self, Vec3};
use crate::geometry::Aabb;

/// An undirected edge as a `(low, high)` vertex index pair
pub type EdgeKey = (u32, u32);

/// Normalize an edge so that `(a, b)` and `(b, a)` share a key
pub fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// A single polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Vertex indices in winding order
    pub vertices: Vec<u32>,
    /// Smooth (interpolated) shading flag
    pub smooth: bool,
}

impl Face {
    pub fn new(vertices: Vec<u32>) -> Self {
        Self {
            vertices,
            smooth: false,
        }
    }

    /// Number of sides
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges of the polygon boundary, as normalized keys
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| edge_key(self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Indexed polygon mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// Edges flagged as feature lines for the solver
    pub sharp_edges: HashSet<EdgeKey>,
    /// Angle-based auto smoothing threshold in radians, if enabled
    pub auto_smooth_angle: Option<f64>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from raw positions and polygon index lists
    pub fn from_polygons(positions: Vec<Vec3>, polygons: Vec<Vec<u32>>) -> Self {
        Self {
            positions,
            faces: polygons.into_iter().map(Face::new).collect(),
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// A mesh without faces has no surface to work on
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Bounding-box diagonal, or 0 for a mesh without vertices
    pub fn extent(&self) -> f64 {
        self.bounds().map(|b| b.diagonal()).unwrap_or(0.0)
    }

    /// Destructively replace positions and topology.
    ///
    /// Shading flags reset to flat and the sharp-edge set is cleared, since both
    /// refer to the old faces and edges.
    pub fn replace_geometry(&mut self, positions: Vec<Vec3>, polygons: Vec<Vec<u32>>) {
        self.positions = positions;
        self.faces = polygons.into_iter().map(Face::new).collect();
        self.sharp_edges.clear();
    }

    /// Twice the area-weighted normal of a face (unnormalized)
    fn face_area_vector(&self, face: &Face) -> Vec3 {
        let Some(&first) = face.vertices.first() else {
            return [0.0; 3];
        };
        let p0 = self.positions[first as usize];
        let mut sum = [0.0; 3];
        for pair in face.vertices[1..].windows(2) {
            let a = vector::sub(self.positions[pair[0] as usize], p0);
            let b = vector::sub(self.positions[pair[1] as usize], p0);
            sum = vector::add(sum, vector::cross(a, b));
        }
        sum
    }

    /// Unit normal of a face, or zero for degenerate faces
    pub fn face_normal(&self, face: usize) -> Vec3 {
        vector::normalize(self.face_area_vector(&self.faces[face])).unwrap_or([0.0; 3])
    }

    pub fn face_area(&self, face: usize) -> f64 {
        0.5 * vector::length(self.face_area_vector(&self.faces[face]))
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.face_area(f)).sum()
    }

    pub fn face_centroid(&self, face: usize) -> Vec3 {
        let verts = &self.faces[face].vertices;
        let mut sum = [0.0; 3];
        for &v in verts {
            sum = vector::add(sum, self.positions[v as usize]);
        }
        vector::scale(sum, 1.0 / verts.len().max(1) as f64)
    }

    /// All distinct edges, sorted
    pub fn unique_edges(&self) -> Vec<EdgeKey> {
        let mut seen: HashSet<EdgeKey> = HashSet::new();
        for face in &self.faces {
            seen.extend(face.edges());
        }
        let mut edges: Vec<EdgeKey> = seen.into_iter().collect();
        edges.sort_unstable();
        edges
    }

    /// One-ring neighbors of every vertex, without duplicates
    pub fn vertex_neighbors(&self) -> Vec<Vec<u32>> {
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); self.positions.len()];
        for (a, b) in self.unique_edges() {
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
        }
        neighbors
    }

    /// Area-weighted vertex normals. Isolated vertices get a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![[0.0; 3]; self.positions.len()];
        for face in &self.faces {
            let n = self.face_area_vector(face);
            for &v in &face.vertices {
                normals[v as usize] = vector::add(normals[v as usize], n);
            }
        }
        normals
            .into_iter()
            .map(|n| vector::normalize(n).unwrap_or([0.0; 3]))
            .collect()
    }

    /// Fan-triangulate every face
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let mut tris = Vec::with_capacity(self.faces.len() * 2);
        for face in &self.faces {
            let v = &face.vertices;
            for i in 1..v.len().saturating_sub(1) {
                tris.push([v[0], v[i], v[i + 1]]);
            }
        }
        tris
    }

    pub fn set_smooth_shading(&mut self, smooth: bool) {
        for face in &mut self.faces {
            face.smooth = smooth;
        }
    }

    pub fn is_sharp(&self, a: u32, b: u32) -> bool {
        self.sharp_edges.contains(&edge_key(a, b))
    }
}
