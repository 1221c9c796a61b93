//! Wavefront OBJ reading and writing.
//!
//! Only geometry is handled: `v` records and `f` records (with `v/vt/vn`
//! style tokens and negative relative indices). Polygons are kept as-is, which
//! is the point of writing OBJ rather than STL for quad output.

use super::polymesh::Mesh;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Parse OBJ text into a mesh
pub fn parse_obj(reader: impl BufRead) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut polygons = Vec::new();
    let mut any_smooth = false;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(str::parse::<f64>)
                    .collect::<std::result::Result<_, _>>()
                    .with_context(|| format!("Bad vertex on line {}", line_no + 1))?;
                if coords.len() != 3 {
                    bail!("Vertex on line {} has fewer than 3 coordinates", line_no + 1);
                }
                positions.push([coords[0], coords[1], coords[2]]);
            }
            Some("f") => {
                let mut face = Vec::new();
                for token in tokens {
                    let index = token.split('/').next().unwrap_or_default();
                    let raw: i64 = index
                        .parse()
                        .with_context(|| format!("Bad face index '{}' on line {}", token, line_no + 1))?;
                    let resolved = if raw < 0 {
                        positions.len() as i64 + raw
                    } else {
                        raw - 1
                    };
                    if resolved < 0 || resolved >= positions.len() as i64 {
                        bail!(
                            "Face index {} on line {} is out of range ({} vertices)",
                            raw,
                            line_no + 1,
                            positions.len()
                        );
                    }
                    face.push(resolved as u32);
                }
                if face.len() < 3 {
                    bail!("Face on line {} has fewer than 3 vertices", line_no + 1);
                }
                polygons.push(face);
            }
            Some("s") => {
                any_smooth = !matches!(tokens.next(), Some("off") | Some("0") | None);
            }
            _ => {}
        }
    }

    let mut mesh = Mesh::from_polygons(positions, polygons);
    mesh.set_smooth_shading(any_smooth);
    Ok(mesh)
}

/// Read an OBJ file from disk
pub fn read_obj(path: &Path) -> Result<Mesh> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    parse_obj(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))
}

/// Write a mesh as OBJ, keeping polygons intact
pub fn write_obj(path: &Path, mesh: &Mesh) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create OBJ file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_obj_to(&mut writer, mesh)?;
    writer.flush()?;
    Ok(())
}

fn write_obj_to(writer: &mut impl Write, mesh: &Mesh) -> Result<()> {
    writeln!(writer, "# quadify")?;
    writeln!(
        writer,
        "# {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    )?;

    for p in &mesh.positions {
        writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
    }

    let smooth = !mesh.faces.is_empty() && mesh.faces.iter().all(|f| f.smooth);
    writeln!(writer, "s {}", if smooth { "1" } else { "off" })?;

    for face in &mesh.faces {
        write!(writer, "f")?;
        for &v in &face.vertices {
            write!(writer, " {}", v + 1)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}
