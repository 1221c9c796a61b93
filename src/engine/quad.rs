//! Quad-dominant remeshing by voxel surface extraction.
//!
//! The solver searches for a voxel size whose exposed-face count lands near
//! the requested target, extracts that surface as an all-quad mesh, and
//! snaps it back onto the input. Sharp input edges attract nearby output
//! vertices so that creases survive as edge loops.

use hashbrown::HashMap;
use tracing::debug;

use super::native::NativeEngineConfig;
use super::surface::SurfaceQuery;
use super::voxel::VoxelGrid;
use super::{EngineError, EngineResult, QuadRemeshParams};
use crate::geometry::vector::{self, Vec3};
use crate::mesh::Mesh;

/// Faces produced per unit of `area / cell²` on typical curved input
const SURFACE_FACE_FACTOR: f64 = 1.5;

/// Pull radius toward sharp edges, as a fraction of the voxel size
const SHARP_CAPTURE: f64 = 0.75;

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Grid offset in cell units derived from the seed
#[allow(clippy::cast_precision_loss)]
fn seed_shift(seed: u64) -> Vec3 {
    let mut state = seed;
    std::array::from_fn(|_| (splitmix64(&mut state) >> 11) as f64 / (1u64 << 53) as f64)
}

#[allow(clippy::cast_precision_loss)]
fn relative_error(count: usize, target: f64) -> f64 {
    (count as f64 - target).abs() / target
}

/// Solve a quad-dominant mesh for `mesh`
pub fn solve(
    mesh: &Mesh,
    params: &QuadRemeshParams,
    config: &NativeEngineConfig,
) -> EngineResult<Mesh> {
    if params.target_faces == 0 {
        return Err(EngineError::invalid_param(
            "target_faces",
            params.target_faces,
            "must be positive",
        ));
    }
    if params.use_symmetry {
        return Err(EngineError::Unsupported("mesh symmetry"));
    }
    if mesh.is_empty() {
        return Err(EngineError::EmptyMesh);
    }
    let area = mesh.surface_area();
    if !(area.is_finite() && area > 0.0) {
        return Err(EngineError::RemeshFailed(format!(
            "input has no usable surface area ({area})"
        )));
    }

    let surface = SurfaceQuery::new(mesh)?;
    let shift = seed_shift(params.seed);
    let target = f64::from(params.target_faces);

    let mut cell = (SURFACE_FACE_FACTOR * area / target).sqrt();
    let mut best: Option<(VoxelGrid, usize)> = None;

    for attempt in 1..=config.solver_attempts.max(1) {
        let grid = match VoxelGrid::voxelize(mesh, cell, shift, config.max_grid_cells) {
            Ok(grid) => grid,
            // A finer grid than we can afford; settle for what we have
            Err(EngineError::GridTooLarge { .. }) if best.is_some() => break,
            Err(e) => return Err(e),
        };
        let count = grid.surface_face_count();
        debug!(
            "Quad solve attempt {}: cell {:.5} -> {} faces (target {})",
            attempt, cell, count, params.target_faces
        );

        let error = relative_error(count, target);
        if count > 0 && best.as_ref().is_none_or(|(_, c)| error < relative_error(*c, target)) {
            best = Some((grid, count));
        }
        if count > 0 && error <= config.face_tolerance {
            break;
        }

        cell *= if count == 0 {
            0.5
        } else {
            (count as f64 / target).sqrt()
        };
    }

    let Some((grid, _)) = best else {
        return Err(EngineError::RemeshFailed(
            "voxel grid captured no volume; is the input closed?".to_string(),
        ));
    };

    let mut out = grid.surface_mesh();
    for p in &mut out.positions {
        *p = surface.nearest_point(*p);
    }

    if params.preserve_sharp && !mesh.sharp_edges.is_empty() {
        let pulled = snap_to_sharp_edges(&mut out, mesh, SHARP_CAPTURE * grid.cell_size());
        debug!(
            "Pulled {} vertices onto sharp edges, {} sharp edges in output",
            pulled,
            out.sharp_edges.len()
        );
    }

    // Voxel output is always closed, so boundary preservation has nothing to hold
    if params.smooth_normals {
        out.set_smooth_shading(true);
    }

    Ok(out)
}

#[allow(clippy::cast_possible_truncation)]
fn bucket_key(p: Vec3, size: f64) -> [i64; 3] {
    p.map(|c| (c / size).floor() as i64)
}

/// Uniform spatial hash over line segments
struct SegmentIndex {
    segments: Vec<[Vec3; 2]>,
    buckets: HashMap<[i64; 3], Vec<usize>>,
    bucket_size: f64,
}

impl SegmentIndex {
    fn new(segments: Vec<[Vec3; 2]>, bucket_size: f64) -> Self {
        let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        for (i, [a, b]) in segments.iter().enumerate() {
            let lo = bucket_key(std::array::from_fn(|k| a[k].min(b[k]) - bucket_size), bucket_size);
            let hi = bucket_key(std::array::from_fn(|k| a[k].max(b[k]) + bucket_size), bucket_size);
            for x in lo[0]..=hi[0] {
                for y in lo[1]..=hi[1] {
                    for z in lo[2]..=hi[2] {
                        buckets.entry([x, y, z]).or_default().push(i);
                    }
                }
            }
        }
        Self {
            segments,
            buckets,
            bucket_size,
        }
    }

    /// Closest point on any segment within `radius` of `p`
    fn nearest_within(&self, p: Vec3, radius: f64) -> Option<Vec3> {
        let candidates = self.buckets.get(&bucket_key(p, self.bucket_size))?;
        candidates
            .iter()
            .map(|&i| {
                let [a, b] = self.segments[i];
                vector::closest_point_on_segment(p, a, b)
            })
            .map(|q| (vector::distance(p, q), q))
            .filter(|(d, _)| *d <= radius)
            .min_by(|x, y| x.0.total_cmp(&y.0))
            .map(|(_, q)| q)
    }
}

/// Move output vertices near sharp input edges onto them and flag the
/// output edges that run between two such vertices
fn snap_to_sharp_edges(out: &mut Mesh, input: &Mesh, radius: f64) -> usize {
    let mut keys: Vec<_> = input.sharp_edges.iter().copied().collect();
    keys.sort_unstable();
    let segments = keys
        .into_iter()
        .map(|(a, b)| [input.positions[a as usize], input.positions[b as usize]])
        .collect();
    let index = SegmentIndex::new(segments, radius);

    let mut on_edge = vec![false; out.positions.len()];
    for (p, flag) in out.positions.iter_mut().zip(&mut on_edge) {
        if let Some(q) = index.nearest_within(*p, radius) {
            *p = q;
            *flag = true;
        }
    }

    let sharp: Vec<_> = out
        .unique_edges()
        .into_iter()
        .filter(|&(a, b)| on_edge[a as usize] && on_edge[b as usize])
        .collect();
    out.sharp_edges.extend(sharp);

    on_edge.iter().filter(|f| **f).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polymesh::fixtures::unit_cube;

    fn cube_with_sharp_edges() -> Mesh {
        let mut cube = unit_cube();
        let edges = cube.unique_edges();
        cube.sharp_edges.extend(edges);
        cube
    }

    #[test]
    fn test_cube_solves_to_quads() {
        let params = QuadRemeshParams::new(600).with_seed(3);
        let out = solve(&unit_cube(), &params, &NativeEngineConfig::default()).unwrap();

        assert!(out.faces.iter().all(|f| f.len() == 4));
        assert!((300..=1200).contains(&out.face_count()));
        for p in &out.positions {
            let on_face = p.iter().any(|c| c.abs() < 1e-9 || (c - 1.0).abs() < 1e-9);
            assert!(on_face, "{p:?} is not on the cube surface");
        }
    }

    #[test]
    fn test_seed_controls_output() {
        let config = NativeEngineConfig::default();
        let cube = unit_cube();
        let a = solve(&cube, &QuadRemeshParams::new(200).with_seed(1), &config).unwrap();
        let b = solve(&cube, &QuadRemeshParams::new(200).with_seed(1), &config).unwrap();
        let c = solve(&cube, &QuadRemeshParams::new(200).with_seed(2), &config).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sharp_edges_survive() {
        let params = QuadRemeshParams::new(600).with_seed(11);
        let out = solve(&cube_with_sharp_edges(), &params, &NativeEngineConfig::default()).unwrap();

        assert!(!out.sharp_edges.is_empty());
        for &(a, b) in &out.sharp_edges {
            for v in [a, b] {
                let p = out.positions[v as usize];
                let on_boundary = p
                    .iter()
                    .filter(|c| c.abs() < 1e-9 || (*c - 1.0).abs() < 1e-9)
                    .count();
                assert!(on_boundary >= 2, "{p:?} is not on a cube edge");
            }
        }
    }

    #[test]
    fn test_sharp_edges_ignored_when_disabled() {
        let params = QuadRemeshParams::new(600).with_preserve_sharp(false);
        let out = solve(&cube_with_sharp_edges(), &params, &NativeEngineConfig::default()).unwrap();
        assert!(out.sharp_edges.is_empty());
    }

    #[test]
    fn test_smooth_normals_flag() {
        let mut params = QuadRemeshParams::new(200);
        params.smooth_normals = true;
        let out = solve(&unit_cube(), &params, &NativeEngineConfig::default()).unwrap();
        assert!(out.faces.iter().all(|f| f.smooth));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let config = NativeEngineConfig::default();
        let mut params = QuadRemeshParams::new(100);
        params.use_symmetry = true;
        assert!(matches!(
            solve(&unit_cube(), &params, &config),
            Err(EngineError::Unsupported(_))
        ));
        assert!(matches!(
            solve(&unit_cube(), &QuadRemeshParams::new(0), &config),
            Err(EngineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            solve(&Mesh::new(), &QuadRemeshParams::new(100), &config),
            Err(EngineError::EmptyMesh)
        ));
    }

    #[test]
    fn test_seed_shift_in_unit_range() {
        for seed in [0, 1, u64::MAX] {
            assert!(seed_shift(seed).iter().all(|c| (0.0..1.0).contains(c)));
        }
    }
}
