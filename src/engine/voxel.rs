//! Voxelization and blocky surface extraction.
//!
//! Inside/outside is decided per voxel by scanline parity along each of the
//! three axes, and a voxel is kept when at least two of the three scans agree
//! it is inside. A hole in the input only confuses the scans that pass
//! through it, so open and self-intersecting meshes still voxelize to a
//! sensible solid.
//!
//! Before extraction, voxels that touch only along an edge or at a corner are
//! bridged so every 2x2x2 block is face-connected on both the filled and the
//! empty side. The extracted surface is then a closed 2-manifold.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use hashbrown::HashMap;
use tracing::debug;

use super::{EngineError, EngineResult};
use crate::geometry::Vec3;
use crate::mesh::Mesh;

/// Empty layers kept around the object on every side
const PADDING: f64 = 1.0;

/// Sub-voxel offset of the scanline sample points, keeping rays off the
/// shared edges of axis-aligned input
const SAMPLE_JITTER: [f64; 2] = [1.37e-6, 0.71e-6];

/// A dense boolean voxel grid
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    origin: Vec3,
    cell: f64,
    dims: [usize; 3],
    filled: Vec<bool>,
}

impl VoxelGrid {
    /// Voxelize a mesh.
    ///
    /// `shift` moves the grid origin by a fraction of a cell per axis (each
    /// component in `[0, 1)`), which changes where the voxel boundaries land.
    pub fn voxelize(mesh: &Mesh, cell: f64, shift: Vec3, max_cells: usize) -> EngineResult<Self> {
        if !(cell.is_finite() && cell > 0.0) {
            return Err(EngineError::DegenerateVoxelSize(cell));
        }
        if mesh.is_empty() {
            return Err(EngineError::EmptyMesh);
        }
        let bounds = mesh.bounds().ok_or(EngineError::EmptyMesh)?;

        let mut origin = [0.0; 3];
        let mut dims = [0usize; 3];
        for axis in 0..3 {
            origin[axis] = bounds.min[axis] - (PADDING + shift[axis]) * cell;
            let span = (bounds.max[axis] - origin[axis]) / cell;
            dims[axis] = span.ceil() as usize + PADDING as usize;
        }

        let cells = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .unwrap_or(usize::MAX);
        if cells > max_cells {
            return Err(EngineError::GridTooLarge {
                cells,
                limit: max_cells,
            });
        }

        let triangles: Vec<[Vec3; 3]> = mesh
            .triangles()
            .into_iter()
            .map(|t| t.map(|v| mesh.positions[v as usize]))
            .collect();

        let mut grid = Self {
            origin,
            cell,
            dims,
            filled: vec![false; cells],
        };

        let mut votes = vec![0u8; cells];
        for axis in 0..3 {
            grid.scan_axis(axis, &triangles, &mut votes);
        }
        for (slot, vote) in grid.filled.iter_mut().zip(&votes) {
            *slot = *vote >= 2;
        }
        let bridged = grid.fill_pinches();
        if bridged > 0 {
            debug!("Filled {} voxels at edge or corner pinches", bridged);
        }

        debug!(
            "Voxelized {} triangles into {}x{}x{} grid (cell {:.5}): {} filled",
            triangles.len(),
            dims[0],
            dims[1],
            dims[2],
            cell,
            grid.filled_count()
        );

        Ok(grid)
    }

    fn index(&self, c: [usize; 3]) -> usize {
        c[0] + self.dims[0] * (c[1] + self.dims[1] * c[2])
    }

    /// Cell-center coordinate of layer `i` along `axis`
    fn center(&self, axis: usize, i: usize) -> f64 {
        self.origin[axis] + (i as f64 + 0.5) * self.cell
    }

    /// Range of layers along `axis` whose centers fall inside `[lo, hi]`
    fn layers_between(&self, axis: usize, lo: f64, hi: f64) -> Option<(usize, usize)> {
        let first = ((lo - self.origin[axis]) / self.cell - 0.5).ceil().max(0.0);
        let last = ((hi - self.origin[axis]) / self.cell - 0.5).floor();
        let max = (self.dims[axis] - 1) as f64;
        if last < 0.0 || first > max || first > last {
            return None;
        }
        Some((first as usize, last.min(max) as usize))
    }

    /// Cast one scanline per (u, v) column along `axis` and vote for the
    /// cells between entry/exit pairs
    fn scan_axis(&self, axis: usize, triangles: &[[Vec3; 3]], votes: &mut [u8]) {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let (nu, nv) = (self.dims[u], self.dims[v]);

        // Bin triangles by the columns their footprint covers
        let mut bins: Vec<Vec<u32>> = vec![Vec::new(); nu * nv];
        for (t, tri) in triangles.iter().enumerate() {
            let (mut umin, mut umax) = (f64::MAX, f64::MIN);
            let (mut vmin, mut vmax) = (f64::MAX, f64::MIN);
            for p in tri {
                umin = umin.min(p[u]);
                umax = umax.max(p[u]);
                vmin = vmin.min(p[v]);
                vmax = vmax.max(p[v]);
            }
            let slack = self.cell * 1e-5;
            let (Some((j0, j1)), Some((k0, k1))) = (
                self.layers_between(u, umin - slack, umax + slack),
                self.layers_between(v, vmin - slack, vmax + slack),
            ) else {
                continue;
            };
            for k in k0..=k1 {
                for j in j0..=j1 {
                    bins[j + nu * k].push(t as u32);
                }
            }
        }

        let mut hits: Vec<f64> = Vec::new();
        for k in 0..nv {
            for j in 0..nu {
                let bin = &bins[j + nu * k];
                if bin.is_empty() {
                    continue;
                }
                let pu = self.center(u, j) + SAMPLE_JITTER[0] * self.cell;
                let pv = self.center(v, k) + SAMPLE_JITTER[1] * self.cell;

                hits.clear();
                hits.extend(
                    bin.iter()
                        .filter_map(|&t| intersect_column(&triangles[t as usize], axis, pu, pv)),
                );
                hits.sort_by(f64::total_cmp);

                for pair in hits.chunks_exact(2) {
                    let Some((i0, i1)) = self.layers_between(axis, pair[0], pair[1]) else {
                        continue;
                    };
                    for i in i0..=i1 {
                        let mut c = [0usize; 3];
                        c[axis] = i;
                        c[u] = j;
                        c[v] = k;
                        votes[self.index(c)] += 1;
                    }
                }
            }
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    /// Dense index of a cell, `None` outside the grid
    fn checked_index(&self, c: [isize; 3]) -> Option<usize> {
        for axis in 0..3 {
            if c[axis] < 0 || c[axis] as usize >= self.dims[axis] {
                return None;
            }
        }
        Some(self.index([c[0] as usize, c[1] as usize, c[2] as usize]))
    }

    pub fn is_filled(&self, x: isize, y: isize, z: isize) -> bool {
        self.checked_index([x, y, z]).is_some_and(|i| self.filled[i])
    }

    /// Fill empty voxels until no 2x2x2 block splits into several
    /// face-connected pieces of filled or of empty cells. Returns the number
    /// of voxels added.
    ///
    /// Inside a pinched block the empty cells face-adjacent to two or more
    /// filled cells are filled; when there are none (cells meeting at a
    /// single corner) every empty cell next to a filled one is.
    fn fill_pinches(&mut self) -> usize {
        let mut pinched = [false; 256];
        for (mask, slot) in pinched.iter_mut().enumerate() {
            let mask = mask as u8;
            *slot = block_components(mask) > 1 || block_components(!mask) > 1;
        }

        let [nx, ny, nz] = self.dims;
        let mut added = 0;
        loop {
            let mut changed = false;
            for z in 0..=nz {
                for y in 0..=ny {
                    for x in 0..=nx {
                        // Block of the eight cells around grid corner (x, y, z)
                        let base = [x as isize - 1, y as isize - 1, z as isize - 1];
                        let cell_of = |i: u8| {
                            [
                                base[0] + isize::from(i & 1),
                                base[1] + isize::from((i >> 1) & 1),
                                base[2] + isize::from((i >> 2) & 1),
                            ]
                        };

                        let mut mask = 0u8;
                        for i in 0..8u8 {
                            let [cx, cy, cz] = cell_of(i);
                            if self.is_filled(cx, cy, cz) {
                                mask |= 1 << i;
                            }
                        }
                        if !pinched[usize::from(mask)] {
                            continue;
                        }

                        let filled_neighbors = |i: u8| {
                            BLOCK_AXES
                                .iter()
                                .filter(|&&flip| mask & (1 << (i ^ flip)) != 0)
                                .count()
                        };
                        let empty = (0..8u8).filter(|&i| mask & (1 << i) == 0);
                        let mut bridge: Vec<u8> =
                            empty.clone().filter(|&i| filled_neighbors(i) >= 2).collect();
                        if bridge.is_empty() {
                            bridge = empty.filter(|&i| filled_neighbors(i) >= 1).collect();
                        }

                        for i in bridge {
                            if let Some(index) = self.checked_index(cell_of(i)) {
                                self.filled[index] = true;
                                added += 1;
                                changed = true;
                            }
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        added
    }

    pub fn filled_count(&self) -> usize {
        self.filled.iter().filter(|f| **f).count()
    }

    /// Visit every exposed voxel face as `(cell, axis, positive_side)`
    fn for_each_exposed_face(&self, mut visit: impl FnMut([usize; 3], usize, bool)) {
        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                for x in 0..self.dims[0] {
                    if !self.filled[self.index([x, y, z])] {
                        continue;
                    }
                    let c = [x as isize, y as isize, z as isize];
                    for axis in 0..3 {
                        for positive in [true, false] {
                            let mut n = c;
                            n[axis] += if positive { 1 } else { -1 };
                            if !self.is_filled(n[0], n[1], n[2]) {
                                visit([x, y, z], axis, positive);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Number of quads [`surface_mesh`](Self::surface_mesh) would produce
    pub fn surface_face_count(&self) -> usize {
        let mut count = 0;
        self.for_each_exposed_face(|_, _, _| count += 1);
        count
    }

    /// Extract the boundary between filled and empty voxels as outward-facing quads
    pub fn surface_mesh(&self) -> Mesh {
        let mut corner_index: HashMap<[usize; 3], u32> = HashMap::new();
        let mut positions: Vec<Vec3> = Vec::new();
        let mut polygons: Vec<Vec<u32>> = Vec::new();

        self.for_each_exposed_face(|cell, axis, positive| {
            let u = (axis + 1) % 3;
            let v = (axis + 2) % 3;
            let mut base = cell;
            if positive {
                base[axis] += 1;
            }
            let offset = |du: usize, dv: usize| {
                let mut c = base;
                c[u] += du;
                c[v] += dv;
                c
            };
            // (axis, u, v) is right-handed, so u -> v winding faces +axis
            let corners = if positive {
                [offset(0, 0), offset(1, 0), offset(1, 1), offset(0, 1)]
            } else {
                [offset(0, 0), offset(0, 1), offset(1, 1), offset(1, 0)]
            };

            let face = corners
                .iter()
                .map(|key| {
                    *corner_index.entry(*key).or_insert_with(|| {
                        positions.push([
                            self.origin[0] + key[0] as f64 * self.cell,
                            self.origin[1] + key[1] as f64 * self.cell,
                            self.origin[2] + key[2] as f64 * self.cell,
                        ]);
                        (positions.len() - 1) as u32
                    })
                })
                .collect();
            polygons.push(face);
        });

        Mesh::from_polygons(positions, polygons)
    }
}

/// Bit flips that move between face-adjacent cells of a 2x2x2 block, with
/// cell `i` at offset `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`
const BLOCK_AXES: [u8; 3] = [1, 2, 4];

/// Number of face-connected pieces among the cells set in `mask`
fn block_components(mask: u8) -> usize {
    let mut seen = 0u8;
    let mut count = 0;
    for start in 0..8u8 {
        if mask & (1 << start) == 0 || seen & (1 << start) != 0 {
            continue;
        }
        count += 1;
        seen |= 1 << start;
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            for flip in BLOCK_AXES {
                let j = i ^ flip;
                if mask & (1 << j) != 0 && seen & (1 << j) == 0 {
                    seen |= 1 << j;
                    stack.push(j);
                }
            }
        }
    }
    count
}

/// Where the line through `(pu, pv)` parallel to `axis` crosses the triangle
fn intersect_column(tri: &[Vec3; 3], axis: usize, pu: f64, pv: f64) -> Option<f64> {
    let u = (axis + 1) % 3;
    let v = (axis + 2) % 3;
    let [a, b, c] = tri;

    let det = (b[v] - c[v]) * (a[u] - c[u]) + (c[u] - b[u]) * (a[v] - c[v]);
    if det.abs() < f64::EPSILON * 16.0 {
        return None; // triangle is parallel to the scan direction
    }
    let l1 = ((b[v] - c[v]) * (pu - c[u]) + (c[u] - b[u]) * (pv - c[v])) / det;
    let l2 = ((c[v] - a[v]) * (pu - c[u]) + (a[u] - c[u]) * (pv - c[v])) / det;
    let l3 = 1.0 - l1 - l2;
    if l1 < 0.0 || l2 < 0.0 || l3 < 0.0 {
        return None;
    }
    Some(l1 * a[axis] + l2 * b[axis] + l3 * c[axis])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::EdgeAdjacency;
    use crate::mesh::polymesh::fixtures::{triangulated_cube, two_boxes_sharing_an_edge, unit_cube};

    const LIMIT: usize = 10_000_000;

    #[test]
    fn test_cube_voxelizes_exactly() {
        let grid = VoxelGrid::voxelize(&unit_cube(), 0.1, [0.0; 3], LIMIT).unwrap();
        assert_eq!(grid.filled_count(), 1000);
        assert_eq!(grid.surface_face_count(), 600);

        let surface = grid.surface_mesh();
        assert_eq!(surface.face_count(), 600);
        assert_eq!(surface.vertex_count(), 602);
        assert!(surface.faces.iter().all(|f| f.len() == 4));
    }

    #[test]
    fn test_surface_is_closed_and_outward() {
        let grid = VoxelGrid::voxelize(&triangulated_cube(1.0), 0.25, [0.3, 0.6, 0.1], LIMIT)
            .unwrap();
        let surface = grid.surface_mesh();

        let adj = EdgeAdjacency::build(&surface);
        assert_eq!(adj.boundary_edges().count(), 0);

        let center = surface.bounds().unwrap().center();
        for f in 0..surface.face_count() {
            let n = surface.face_normal(f);
            let out = crate::geometry::vector::sub(surface.face_centroid(f), center);
            assert!(crate::geometry::vector::dot(n, out) > 0.0);
        }
    }

    fn grid_with(dims: [usize; 3], cells: &[[usize; 3]]) -> VoxelGrid {
        let mut grid = VoxelGrid {
            origin: [0.0; 3],
            cell: 1.0,
            dims,
            filled: vec![false; dims.iter().product()],
        };
        for &c in cells {
            let index = grid.index(c);
            grid.filled[index] = true;
        }
        grid
    }

    #[test]
    fn test_edge_touching_cells_are_bridged() {
        let mut grid = grid_with([4, 4, 3], &[[1, 1, 1], [2, 2, 1]]);
        assert_eq!(grid.fill_pinches(), 2);
        assert!(grid.is_filled(2, 1, 1) && grid.is_filled(1, 2, 1));
        assert!(!grid.is_filled(1, 1, 0));

        let adj = EdgeAdjacency::build(&grid.surface_mesh());
        assert_eq!(adj.non_manifold_edges().count(), 0);
        assert_eq!(adj.boundary_edges().count(), 0);
    }

    #[test]
    fn test_corner_touching_cells_are_bridged() {
        let mut grid = grid_with([4, 4, 4], &[[1, 1, 1], [2, 2, 2]]);
        assert_eq!(grid.fill_pinches(), 6);
        assert_eq!(grid.filled_count(), 8);
        assert_eq!(grid.surface_face_count(), 24);
    }

    #[test]
    fn test_unpinched_grid_untouched() {
        let mut grid = grid_with([4, 4, 4], &[[1, 1, 1], [2, 1, 1], [2, 2, 1]]);
        assert_eq!(grid.fill_pinches(), 0);
        assert_eq!(grid.filled_count(), 3);
    }

    #[test]
    fn test_boxes_sharing_an_edge_extract_manifold() {
        let mesh = two_boxes_sharing_an_edge();
        let grid = VoxelGrid::voxelize(&mesh, 0.1, [0.0; 3], LIMIT).unwrap();
        assert_eq!(grid.filled_count(), 2020);

        let adj = EdgeAdjacency::build(&grid.surface_mesh());
        assert_eq!(adj.non_manifold_edges().count(), 0);
        assert_eq!(adj.boundary_edges().count(), 0);
    }

    #[test]
    fn test_open_box_still_fills() {
        let mut open_box = unit_cube();
        open_box.faces.remove(1); // drop the top
        let grid = VoxelGrid::voxelize(&open_box, 0.1, [0.0; 3], LIMIT).unwrap();
        assert_eq!(grid.filled_count(), 1000);
    }

    #[test]
    fn test_flat_sheet_has_no_volume() {
        let sheet = Mesh::from_polygons(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2, 3]],
        );
        let grid = VoxelGrid::voxelize(&sheet, 0.1, [0.0; 3], LIMIT).unwrap();
        assert_eq!(grid.filled_count(), 0);
        assert_eq!(grid.surface_mesh().face_count(), 0);
    }

    #[test]
    fn test_degenerate_cell_size() {
        for size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                VoxelGrid::voxelize(&unit_cube(), size, [0.0; 3], LIMIT),
                Err(EngineError::DegenerateVoxelSize(_))
            ));
        }
    }

    #[test]
    fn test_grid_limit() {
        let err = VoxelGrid::voxelize(&unit_cube(), 0.001, [0.0; 3], LIMIT).unwrap_err();
        assert!(matches!(err, EngineError::GridTooLarge { .. }));
    }

    #[test]
    fn test_empty_mesh() {
        assert!(matches!(
            VoxelGrid::voxelize(&Mesh::new(), 0.1, [0.0; 3], LIMIT),
            Err(EngineError::EmptyMesh)
        ));
    }
}
