use super::obj::{read_obj, write_obj};
use super::polymesh::Mesh;
use super::stl::{read_stl, to_triangles, write_stl};
use anyhow::{Result, bail};
use std::path::Path;

/// Supported mesh file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    /// Pick a format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("stl") => Ok(MeshFormat::Stl),
            Some("obj") => Ok(MeshFormat::Obj),
            Some(other) => bail!("Unsupported mesh format: .{}", other),
            None => bail!("Cannot infer mesh format without a file extension: {}", path.display()),
        }
    }
}

pub fn load_mesh(path: &Path) -> Result<Mesh> {
    match MeshFormat::from_path(path)? {
        MeshFormat::Stl => read_stl(path),
        MeshFormat::Obj => read_obj(path),
    }
}

/// Save a mesh. STL output is triangulated; OBJ keeps polygons.
pub fn save_mesh(path: &Path, mesh: &Mesh) -> Result<()> {
    match MeshFormat::from_path(path)? {
        MeshFormat::Stl => write_stl(path, &to_triangles(mesh)),
        MeshFormat::Obj => write_obj(path, mesh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polymesh::fixtures::unit_cube;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_path(Path::new("a.STL")).unwrap(), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_path(Path::new("dir/b.obj")).unwrap(), MeshFormat::Obj);
        assert!(MeshFormat::from_path(Path::new("c.fbx")).is_err());
        assert!(MeshFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_stl_output_is_triangulated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        save_mesh(&path, &unit_cube()).unwrap();

        let loaded = load_mesh(&path).unwrap();
        assert_eq!(loaded.face_count(), 12);
        assert!(loaded.faces.iter().all(|f| f.len() == 3));
    }
}
