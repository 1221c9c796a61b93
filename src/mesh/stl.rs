use super::builder::{MeshBuilder, Triangle};
use super::polymesh::Mesh;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Read an ASCII or binary STL file into a welded polygon mesh
pub fn read_stl(path: &Path) -> Result<Mesh> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open STL file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let indexed = stl_io::read_stl(&mut reader)
        .with_context(|| format!("Failed to parse STL file: {}", path.display()))?;

    let mut builder = MeshBuilder::new();
    for face in &indexed.faces {
        let corner = |i: usize| {
            let v = indexed.vertices[face.vertices[i]];
            [v[0] as f64, v[1] as f64, v[2] as f64]
        };
        builder.add_triangle(corner(0), corner(1), corner(2));
    }

    if builder.skipped() > 0 {
        tracing::debug!(
            "Dropped {} degenerate STL facets from {}",
            builder.skipped(),
            path.display()
        );
    }

    Ok(builder.finish())
}

/// Fan-triangulate a polygon mesh into STL facets
pub fn to_triangles(mesh: &Mesh) -> Vec<Triangle> {
    mesh.triangles()
        .into_iter()
        .map(|[a, b, c]| {
            Triangle::from_positions(
                mesh.positions[a as usize],
                mesh.positions[b as usize],
                mesh.positions[c as usize],
            )
        })
        .collect()
}

/// Write triangles to a binary STL file: an 80 byte header, a little endian
/// `u32` count, then 50 bytes per facet (normal, three corners, attribute)
pub fn write_stl(path: &Path, triangles: &[Triangle]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create STL file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut header = [b' '; 80];
    let banner = b"quadify - quad-dominant retopology output";
    header[..banner.len()].copy_from_slice(banner);
    writer.write_all(&header)?;

    let count = triangles.len() as u32;
    writer.write_all(&count.to_le_bytes())?;

    for tri in triangles {
        for &n in &tri.normal {
            writer.write_all(&n.to_le_bytes())?;
        }

        for vertex in &tri.vertices {
            for &coord in vertex {
                writer.write_all(&coord.to_le_bytes())?;
            }
        }

        // Attribute byte count (2 bytes, usually 0)
        writer.write_all(&[0u8, 0u8])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polymesh::fixtures::unit_cube;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_stl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.stl");

        let triangles = vec![
            Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Triangle::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        write_stl(&path, &triangles).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), 84 + 2 * 50);
    }

    #[test]
    fn test_read_binary_stl_welds_vertices() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        write_stl(&path, &to_triangles(&unit_cube())).unwrap();

        let mesh = read_stl(&path).unwrap();
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.vertex_count(), 8);
        assert!((mesh.surface_area() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_read_ascii_stl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        fs::write(
            &path,
            "solid tri\n\
             facet normal 0 0 1\n\
             outer loop\n\
             vertex 0 0 0\n\
             vertex 1 0 0\n\
             vertex 0 1 0\n\
             endloop\n\
             endfacet\n\
             endsolid tri\n",
        )
        .unwrap();

        let mesh = read_stl(&path).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.faces[0].vertices.len(), 3);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_stl(Path::new("/definitely/not/here.stl")).unwrap_err();
        assert!(err.to_string().contains("Failed to open STL file"));
    }
}
