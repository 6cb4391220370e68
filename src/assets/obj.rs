use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::mesh::TriangleMesh;

/// Writes the mesh as Wavefront OBJ text (`v`/`vt`/`vn`/`f`, 1-based
/// indices). Float fields use Rust's shortest round-trip formatting, so a
/// save/load cycle reproduces every corner attribute bit for bit (vertex
/// numbering may differ, since loading re-indexes by first appearance).
pub fn save_mesh(path: &Path, mesh: &TriangleMesh) -> Result<(), String> {
    let mut out = String::new();

    for p in mesh.positions.chunks_exact(3) {
        let _ = writeln!(out, "v {} {} {}", p[0], p[1], p[2]);
    }
    for uv in mesh.uvs.chunks_exact(2) {
        let _ = writeln!(out, "vt {} {}", uv[0], uv[1]);
    }
    for n in mesh.normals.chunks_exact(3) {
        let _ = writeln!(out, "vn {} {} {}", n[0], n[1], n[2]);
    }
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
    }

    fs::write(path, out).map_err(|e| format!("write {}: {}", path.display(), e))
}

/// Reads a Wavefront OBJ. Faces with more than three corners are fan
/// triangulated; corners missing a texcoord or normal get `(0, 0)` and the
/// up axis. Corner triples are re-indexed so each distinct
/// position/texcoord/normal combination becomes one vertex.
pub fn load_mesh(path: &Path) -> Result<TriangleMesh, String> {
    let text =
        fs::read_to_string(path).map_err(|e| format!("read {}: {}", path.display(), e))?;

    let mut src_positions: Vec<[f32; 3]> = Vec::new();
    let mut src_uvs: Vec<[f32; 2]> = Vec::new();
    let mut src_normals: Vec<[f32; 3]> = Vec::new();

    let mut mesh = TriangleMesh {
        positions: Vec::new(),
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: Vec::new(),
    };
    let mut seen: HashMap<(usize, usize, usize), u32> = HashMap::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(keyword) = fields.next() else {
            continue;
        };

        let bad = |what: &str| format!("{}: bad {} on line {}", path.display(), what, line_no + 1);

        match keyword {
            "v" => {
                let p = parse_floats::<3>(&mut fields).ok_or_else(|| bad("vertex"))?;
                src_positions.push(p);
            }
            "vt" => {
                let uv = parse_floats::<2>(&mut fields).ok_or_else(|| bad("texcoord"))?;
                src_uvs.push(uv);
            }
            "vn" => {
                let n = parse_floats::<3>(&mut fields).ok_or_else(|| bad("normal"))?;
                src_normals.push(n);
            }
            "f" => {
                let mut corners = Vec::new();
                for field in fields {
                    let corner = parse_corner(
                        field,
                        src_positions.len(),
                        src_uvs.len(),
                        src_normals.len(),
                    )
                    .ok_or_else(|| bad("face"))?;
                    corners.push(corner);
                }
                if corners.len() < 3 {
                    return Err(bad("face"));
                }

                for i in 1..corners.len() - 1 {
                    for corner in [corners[0], corners[i], corners[i + 1]] {
                        let index = *seen.entry(corner).or_insert_with(|| {
                            let (pi, ti, ni) = corner;
                            let p = src_positions[pi];
                            mesh.positions.extend_from_slice(&p);

                            let uv = if ti == usize::MAX {
                                [0.0, 0.0]
                            } else {
                                src_uvs[ti]
                            };
                            mesh.uvs.extend_from_slice(&uv);

                            let n = if ni == usize::MAX {
                                [0.0, 1.0, 0.0]
                            } else {
                                src_normals[ni]
                            };
                            mesh.normals.extend_from_slice(&n);

                            (mesh.positions.len() / 3 - 1) as u32
                        });
                        mesh.indices.push(index);
                    }
                }
            }
            _ => {}
        }
    }

    if mesh.indices.is_empty() {
        return Err(format!("{}: no faces", path.display()));
    }
    Ok(mesh)
}

fn parse_floats<'a, const N: usize>(
    fields: &mut impl Iterator<Item = &'a str>,
) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    for slot in &mut out {
        *slot = fields.next()?.parse().ok()?;
    }
    Some(out)
}

/// Parses one `p`, `p/t`, `p//n` or `p/t/n` face corner into zero-based
/// indices; `usize::MAX` marks an absent texcoord/normal. Negative OBJ
/// indices count back from the end of the respective list.
fn parse_corner(
    field: &str,
    positions: usize,
    uvs: usize,
    normals: usize,
) -> Option<(usize, usize, usize)> {
    let mut parts = field.split('/');

    let pi = resolve_index(parts.next()?, positions)?;
    let ti = match parts.next() {
        None | Some("") => usize::MAX,
        Some(s) => resolve_index(s, uvs)?,
    };
    let ni = match parts.next() {
        None | Some("") => usize::MAX,
        Some(s) => resolve_index(s, normals)?,
    };
    Some((pi, ti, ni))
}

fn resolve_index(field: &str, len: usize) -> Option<usize> {
    let raw: i64 = field.parse().ok()?;
    let index = if raw > 0 {
        raw as usize - 1
    } else if raw < 0 {
        len.checked_sub(raw.unsigned_abs() as usize)?
    } else {
        return None;
    };
    (index < len).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generate_grid;
    use glam::Vec3;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }

    /// Per-corner attribute stream, independent of vertex numbering.
    fn corner_stream(mesh: &TriangleMesh) -> Vec<([f32; 3], [f32; 2], [f32; 3])> {
        mesh.indices
            .iter()
            .map(|&i| {
                let i = i as usize;
                (
                    [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    [mesh.uvs[i * 2], mesh.uvs[i * 2 + 1]],
                    [
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn save_load_round_trip_is_exact() {
        let mesh = generate_grid(7, 5, Vec3::new(1.0, 0.05, 0.5));
        let path = temp_path("noisefield_grid_roundtrip.obj");
        save_mesh(&path, &mesh).unwrap();

        // Loading re-indexes vertices by first appearance, so compare the
        // dereferenced corners rather than the raw attribute arrays.
        let loaded = load_mesh(&path).unwrap();
        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(corner_stream(&loaded), corner_stream(&mesh));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_mesh(Path::new("/nonexistent/nope.obj")).is_err());
    }

    #[test]
    fn quads_are_fan_triangulated() {
        let path = temp_path("noisefield_quad.obj");
        fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nf 1 2 3 4\n",
        )
        .unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        // Absent texcoords and normals fall back to defaults.
        assert_eq!(&mesh.uvs[..2], [0.0, 0.0]);
        assert_eq!(&mesh.normals[..3], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn negative_indices_resolve_from_end() {
        let path = temp_path("noisefield_negative.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 0 1\nf -3 -2 -1\n").unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(&mesh.positions[3..6], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn malformed_face_is_an_error() {
        let path = temp_path("noisefield_bad_face.obj");
        fs::write(&path, "v 0 0 0\nf 1 2\n").unwrap();
        assert!(load_mesh(&path).is_err());
    }
}
