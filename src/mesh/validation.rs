//! Mesh validation and repair utilities
//!
//! Checks loaded meshes before they enter the pipeline and summarizes the
//! topology that comes out of it:
//! - Face-size histogram (triangles, quads, n-gons)
//! - Degenerate faces (near-zero area or repeated vertices)
//! - NaN/Inf coordinates
//! - Boundary and non-manifold edges

use super::adjacency::EdgeAdjacency;
use super::polymesh::Mesh;
use crate::geometry::vector;

/// Result of mesh validation
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct TopologyReport {
    /// Total number of faces validated
    pub faces: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub quads: usize,
    /// Faces with more than four sides
    pub ngons: usize,
    /// Faces with (near) zero area or repeated vertices
    pub degenerate: usize,
    /// Faces touching a vertex with NaN/Inf coordinates
    pub invalid_coords: usize,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    /// Warning messages for issues found
    pub warnings: Vec<String>,
}

impl TopologyReport {
    /// Check if the mesh can be processed at all
    pub fn is_valid(&self) -> bool {
        self.invalid_coords == 0 && self.faces > 0
    }

    /// Check if the mesh has any issues at all
    pub fn has_issues(&self) -> bool {
        self.degenerate > 0
            || self.invalid_coords > 0
            || self.boundary_edges > 0
            || self.non_manifold_edges > 0
    }

    /// Fraction of faces that are quads
    pub fn quad_ratio(&self) -> f64 {
        if self.faces == 0 {
            0.0
        } else {
            self.quads as f64 / self.faces as f64
        }
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} faces ({} quads, {} tris, {} n-gons), {} vertices",
            self.faces, self.quads, self.triangles, self.ngons, self.vertices
        );
        if self.has_issues() {
            text.push_str(&format!(
                "; {} degenerate, {} invalid coords, {} boundary edges, {} non-manifold edges",
                self.degenerate, self.invalid_coords, self.boundary_edges, self.non_manifold_edges
            ));
        }
        text
    }
}

/// Minimum area threshold for non-degenerate faces, in squared model units
const MIN_FACE_AREA: f64 = 1e-14;

/// Validate a mesh and return a detailed report
pub fn validate_mesh(mesh: &Mesh) -> TopologyReport {
    let mut result = TopologyReport {
        faces: mesh.face_count(),
        vertices: mesh.vertex_count(),
        ..Default::default()
    };

    for face_idx in 0..mesh.face_count() {
        match mesh.faces[face_idx].len() {
            3 => result.triangles += 1,
            4 => result.quads += 1,
            n if n > 4 => result.ngons += 1,
            _ => {}
        }

        if has_invalid_coords(mesh, face_idx) {
            result.invalid_coords += 1;
            continue;
        }

        if is_degenerate(mesh, face_idx) {
            result.degenerate += 1;
        }
    }

    let adjacency = EdgeAdjacency::build(mesh);
    result.boundary_edges = adjacency.boundary_edges().count();
    result.non_manifold_edges = adjacency.non_manifold_edges().count();

    if result.invalid_coords > 0 {
        result.warnings.push(format!(
            "{} faces have NaN/Inf coordinates (will be removed)",
            result.invalid_coords
        ));
    }
    if result.degenerate > 0 {
        result.warnings.push(format!(
            "{} degenerate faces detected (will be removed)",
            result.degenerate
        ));
    }
    if result.boundary_edges > 0 || result.non_manifold_edges > 0 {
        result.warnings.push(format!(
            "Mesh is not watertight: {} boundary edges, {} non-manifold edges",
            result.boundary_edges, result.non_manifold_edges
        ));
    }

    result
}

/// Check if a face references any invalid (NaN/Inf) coordinates
fn has_invalid_coords(mesh: &Mesh, face: usize) -> bool {
    mesh.faces[face]
        .vertices
        .iter()
        .any(|&v| !vector::is_finite(mesh.positions[v as usize]))
}

/// Check if a face is degenerate (repeated vertices or near-zero area)
fn is_degenerate(mesh: &Mesh, face: usize) -> bool {
    let verts = &mesh.faces[face].vertices;
    let mut sorted = verts.clone();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len() < 3 || mesh.face_area(face) < MIN_FACE_AREA
}

/// Remove degenerate and invalid faces, then drop unreferenced vertices
///
/// Returns the number of faces removed
pub fn remove_degenerate(mesh: &mut Mesh) -> usize {
    let keep: Vec<bool> = (0..mesh.face_count())
        .map(|f| !has_invalid_coords(mesh, f) && !is_degenerate(mesh, f))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return 0;
    }

    let mut remap: Vec<Option<u32>> = vec![None; mesh.vertex_count()];
    let mut positions = Vec::new();
    let mut polygons = Vec::new();
    for (face, _) in mesh.faces.iter().zip(&keep).filter(|(_, k)| **k) {
        let polygon = face
            .vertices
            .iter()
            .map(|&v| {
                *remap[v as usize].get_or_insert_with(|| {
                    positions.push(mesh.positions[v as usize]);
                    (positions.len() - 1) as u32
                })
            })
            .collect();
        polygons.push(polygon);
    }

    mesh.replace_geometry(positions, polygons);
    removed
}

/// Validate, clean and report in one pass
///
/// 1. Validates the mesh and reports issues
/// 2. Removes degenerate/invalid faces
///
/// Returns the cleaned mesh and the report of the input
pub fn validate_and_fix(mut mesh: Mesh) -> (Mesh, TopologyReport) {
    let report = validate_mesh(&mesh);
    remove_degenerate(&mut mesh);
    (mesh, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polymesh::fixtures::{triangulated_cube, unit_cube};

    #[test]
    fn test_valid_cube() {
        let report = validate_mesh(&unit_cube());

        assert_eq!(report.faces, 6);
        assert_eq!(report.quads, 6);
        assert_eq!(report.ngons, 0);
        assert!(report.is_valid());
        assert!(!report.has_issues());
        assert_eq!(report.quad_ratio(), 1.0);
    }

    #[test]
    fn test_face_histogram() {
        let mut mesh = triangulated_cube(1.0);
        mesh.positions.push([0.5, 0.5, 2.0]);
        mesh.positions.push([0.6, 0.5, 2.0]);
        mesh.faces.push(crate::mesh::Face::new(vec![0, 1, 5, 8, 9, 4]));

        let report = validate_mesh(&mesh);
        assert_eq!(report.triangles, 12);
        assert_eq!(report.ngons, 1);
        assert!(report.non_manifold_edges > 0);
    }

    #[test]
    fn test_degenerate_face_collinear() {
        let mesh = Mesh::from_polygons(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![vec![0, 1, 2]],
        );
        assert!(is_degenerate(&mesh, 0));
    }

    #[test]
    fn test_degenerate_face_repeated_vertex() {
        let mesh = Mesh::from_polygons(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 1]],
        );
        assert!(is_degenerate(&mesh, 0));
    }

    #[test]
    fn test_invalid_coords_nan() {
        let mesh = Mesh::from_polygons(
            vec![[f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2]],
        );
        assert!(has_invalid_coords(&mesh, 0));
        assert!(!validate_mesh(&mesh).is_valid());
    }

    #[test]
    fn test_remove_degenerate_compacts_vertices() {
        let mut mesh = Mesh::from_polygons(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [5.0, 5.0, 5.0],
                [6.0, 5.0, 5.0],
                [f64::INFINITY, 0.0, 0.0],
            ],
            vec![vec![0, 1, 2], vec![3, 4, 4], vec![0, 1, 5]],
        );

        let removed = remove_degenerate(&mut mesh);
        assert_eq!(removed, 2);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_validate_and_fix() {
        let mut mesh = unit_cube();
        mesh.faces.push(crate::mesh::Face::new(vec![0, 1, 0]));

        let (cleaned, report) = validate_and_fix(mesh);

        assert_eq!(report.faces, 7);
        assert_eq!(report.degenerate, 1);
        assert_eq!(cleaned.face_count(), 6);
    }
}
