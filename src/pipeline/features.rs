use crate::config::clamp_sensitivity;
use crate::engine::{EngineResult, MeshEngine};
use crate::mesh::Mesh;

/// Dihedral angle (degrees) above which an edge counts as sharp.
///
/// Sensitivity 1.0 maps to 15°, 0.1 to 82.5°. Out-of-range input is clamped.
pub fn sharpness_threshold_degrees(sensitivity: f64) -> f64 {
    90.0 - clamp_sensitivity(sensitivity) * 75.0
}

/// Flag the edges sharper than the sensitivity threshold. Returns how many
/// edges the engine selected.
pub fn mark_sharp_edges<E: MeshEngine + ?Sized>(
    engine: &mut E,
    mesh: &mut Mesh,
    sensitivity: f64,
) -> EngineResult<usize> {
    let threshold = sharpness_threshold_degrees(sensitivity);
    engine.mark_sharp_edges(mesh, threshold.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeEngine;
    use crate::mesh::polymesh::fixtures::{cuboid, unit_cube};

    #[test]
    fn test_sensitivity_mapping() {
        assert!((sharpness_threshold_degrees(1.0) - 15.0).abs() < 1e-9);
        assert!((sharpness_threshold_degrees(0.1) - 82.5).abs() < 1e-9);
        assert!((sharpness_threshold_degrees(0.5) - 52.5).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_sensitivity_clamped() {
        assert!((sharpness_threshold_degrees(5.0) - 15.0).abs() < 1e-9);
        assert!((sharpness_threshold_degrees(-1.0) - 82.5).abs() < 1e-9);
    }

    #[test]
    fn test_marks_box_edges() {
        let mut engine = NativeEngine::new();
        let mut cube = unit_cube();
        let count = mark_sharp_edges(&mut engine, &mut cube, 0.5).unwrap();
        assert_eq!(count, 12);
        assert!(cube.is_sharp(0, 1));
    }

    #[test]
    fn test_shallow_fold_depends_on_sensitivity() {
        // Two quads folded by 30° along the y axis
        let (s, c) = 30.0_f64.to_radians().sin_cos();
        let fold = || {
            Mesh::from_polygons(
                vec![
                    [-1.0, 0.0, 0.0],
                    [0.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0],
                    [-1.0, 1.0, 0.0],
                    [c, 0.0, s],
                    [c, 1.0, s],
                ],
                vec![vec![0, 1, 2, 3], vec![1, 4, 5, 2]],
            )
        };

        let mut engine = NativeEngine::new();
        let mut mesh = fold();
        assert_eq!(mark_sharp_edges(&mut engine, &mut mesh, 1.0).unwrap(), 1);
        assert!(mesh.is_sharp(1, 2));

        let mut mesh = fold();
        assert_eq!(mark_sharp_edges(&mut engine, &mut mesh, 0.5).unwrap(), 0);

        // Right angles clear even the least sensitive threshold
        let mut slab = cuboid([0.0; 3], [4.0, 4.0, 0.5]);
        assert_eq!(mark_sharp_edges(&mut engine, &mut slab, 0.1).unwrap(), 12);
    }
}
