use hashbrown::HashMap;

use super::polymesh::{EdgeKey, Mesh};
use crate::geometry::vector;

/// Maps every edge to the faces that use it
#[derive(Debug, Clone)]
pub struct EdgeAdjacency {
    edge_to_faces: HashMap<EdgeKey, Vec<usize>>,
}

impl EdgeAdjacency {
    pub fn build(mesh: &Mesh) -> Self {
        let mut edge_to_faces: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
        for (face_idx, face) in mesh.faces.iter().enumerate() {
            for edge in face.edges() {
                edge_to_faces.entry(edge).or_default().push(face_idx);
            }
        }
        Self { edge_to_faces }
    }

    pub fn faces_of(&self, edge: EdgeKey) -> &[usize] {
        self.edge_to_faces.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Edges used by exactly one face
    pub fn boundary_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(edge, _)| *edge)
    }

    /// Edges used by more than two faces
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(edge, _)| *edge)
    }

    /// Edges shared by exactly two faces, paired with those faces
    pub fn manifold_edges(&self) -> impl Iterator<Item = (EdgeKey, [usize; 2])> + '_ {
        self.edge_to_faces.iter().filter_map(|(edge, faces)| match faces.as_slice() {
            [a, b] => Some((*edge, [*a, *b])),
            _ => None,
        })
    }
}

/// Angle between the normals of two faces, in radians.
///
/// 0 for coplanar faces, π/2 for the faces meeting at a cube edge.
pub fn dihedral_angle(mesh: &Mesh, a: usize, b: usize) -> f64 {
    vector::angle_between(mesh.face_normal(a), mesh.face_normal(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polymesh::fixtures::{triangulated_cube, unit_cube};

    #[test]
    fn test_closed_cube_has_no_boundary() {
        let adj = EdgeAdjacency::build(&unit_cube());
        assert_eq!(adj.edge_count(), 12);
        assert_eq!(adj.boundary_edges().count(), 0);
        assert_eq!(adj.non_manifold_edges().count(), 0);
        assert_eq!(adj.manifold_edges().count(), 12);
    }

    #[test]
    fn test_open_mesh_boundary() {
        let mesh = Mesh::from_polygons(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
        );
        let adj = EdgeAdjacency::build(&mesh);
        assert_eq!(adj.boundary_edges().count(), 4);
        assert_eq!(adj.faces_of((0, 2)).len(), 2);
        assert!(adj.faces_of((1, 3)).is_empty());
    }

    #[test]
    fn test_non_manifold_fin() {
        let mesh = Mesh::from_polygons(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.5, -1.0, 0.0],
                [0.5, 0.0, 1.0],
            ],
            vec![vec![0, 1, 2], vec![1, 0, 3], vec![0, 1, 4]],
        );
        let adj = EdgeAdjacency::build(&mesh);
        assert_eq!(adj.non_manifold_edges().collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn test_dihedral_angles_on_cube() {
        let cube = triangulated_cube(1.0);
        let adj = EdgeAdjacency::build(&cube);
        let mut right_angles = 0;
        let mut flat = 0;
        for (_, [a, b]) in adj.manifold_edges() {
            let angle = dihedral_angle(&cube, a, b);
            if (angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9 {
                right_angles += 1;
            } else if angle.abs() < 1e-9 {
                flat += 1;
            }
        }
        assert_eq!(right_angles, 12);
        assert_eq!(flat, 6);
    }
}
