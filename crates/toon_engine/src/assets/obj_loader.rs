//! OBJ file loader for 3D models

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::mesh::{MeshData, Topology};

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A number or index failed to parse
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
    /// Structurally unusable file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Reads Wavefront OBJ geometry
pub struct ObjLoader;

#[derive(Clone, Copy)]
struct FaceVertex {
    position: usize,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let path = path.as_ref();
        log::debug!("Loading OBJ from {:?}", path);
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text.
    ///
    /// Face corners are expanded into one vertex each. When every face is a
    /// quad the mesh keeps [`Topology::Quads`]; otherwise faces are fan
    /// triangulated. Corners without a normal get their face's flat normal.
    pub fn parse<R: BufRead>(reader: R) -> Result<MeshData, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut faces: Vec<Vec<FaceVertex>> = Vec::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line_no = line_index + 1;
            let line = line?;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => positions.push(parse_floats::<3>(&mut parts, line_no, "vertex")?),
                Some("vn") => normals.push(parse_floats::<3>(&mut parts, line_no, "normal")?),
                Some("vt") => tex_coords.push(parse_floats::<2>(&mut parts, line_no, "tex coord")?),
                Some("f") => {
                    let face = parts
                        .map(|corner| {
                            parse_corner(corner, positions.len(), tex_coords.len(), normals.len(), line_no)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    if face.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_no,
                            message: format!("face has {} corners", face.len()),
                        });
                    }
                    faces.push(face);
                }
                // Comments, groups, materials and smoothing are ignored
                _ => {}
            }
        }

        if faces.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ file".to_string()));
        }

        let all_quads = faces.iter().all(|f| f.len() == 4);
        let has_tex_coords = faces.iter().flatten().any(|c| c.tex_coord.is_some());

        let mut mesh = MeshData {
            topology: Some(if all_quads { Topology::Quads } else { Topology::Triangles }),
            ..Default::default()
        };

        for face in &faces {
            let face_normal = flat_normal(&positions, face);
            let base = mesh.positions.len() as u32;

            for corner in face {
                mesh.positions.push(positions[corner.position]);
                mesh.normals.push(corner.normal.map_or(face_normal, |n| normals[n]));
                if has_tex_coords {
                    mesh.tex_coords.push(corner.tex_coord.map_or([0.0, 0.0], |t| tex_coords[t]));
                }
            }

            let corners = face.len() as u32;
            if all_quads {
                mesh.indices.extend(base..base + 4);
            } else {
                for i in 1..corners - 1 {
                    mesh.indices.extend([base, base + i, base + i + 1]);
                }
            }
        }

        log::debug!(
            "Parsed OBJ: {} faces, {} vertices, {:?}",
            faces.len(),
            mesh.positions.len(),
            mesh.topology()
        );
        Ok(mesh)
    }
}

fn parse_floats<'a, const N: usize>(
    parts: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for slot in &mut out {
        let token = parts.next().ok_or_else(|| ObjError::ParseError {
            line,
            message: format!("{} has fewer than {} components", what, N),
        })?;
        *slot = token.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {} component '{}'", what, token),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index into a 0-based one
fn resolve_index(token: &str, count: usize, line: usize, what: &str) -> Result<usize, ObjError> {
    let raw: i64 = token.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid {} index '{}'", what, token),
    })?;

    let resolved = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => count as i64 + r,
        _ => -1,
    };

    if resolved < 0 || resolved as usize >= count {
        return Err(ObjError::InvalidFormat(format!(
            "line {}: {} index {} out of bounds ({} defined)",
            line, what, raw, count
        )));
    }
    Ok(resolved as usize)
}

fn parse_corner(
    corner: &str,
    position_count: usize,
    tex_coord_count: usize,
    normal_count: usize,
    line: usize,
) -> Result<FaceVertex, ObjError> {
    let mut fields = corner.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), position_count, line, "position")?;

    let tex_coord = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, tex_coord_count, line, "tex coord")?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count, line, "normal")?),
        _ => None,
    };

    Ok(FaceVertex {
        position,
        tex_coord,
        normal,
    })
}

fn flat_normal(positions: &[[f32; 3]], face: &[FaceVertex]) -> [f32; 3] {
    let a = Vec3::from(positions[face[0].position]);
    let b = Vec3::from(positions[face[1].position]);
    let c = Vec3::from(positions[face[2].position]);
    (b - a)
        .cross(&(c - a))
        .try_normalize(f32::EPSILON)
        .map_or(crate::render::mesh::DEFAULT_NORMAL, |n| [n.x, n.y, n.z])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<MeshData, ObjError> {
        ObjLoader::parse(Cursor::new(text))
    }

    #[test]
    fn test_triangle_with_normals_and_uvs() {
        let mesh = parse(
            "# one triangle\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 0 1\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1\n",
        )
        .unwrap();

        assert_eq!(mesh.topology(), Topology::Triangles);
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.tex_coords[1], [1.0, 0.0]);
        assert_eq!(mesh.normals[2], [0.0, 0.0, 1.0]);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_all_quads_keep_quad_topology() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nf 1 2 3 4\n").unwrap();
        assert_eq!(mesh.topology(), Topology::Quads);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3]);
        assert!(mesh.tex_coords.is_empty());
    }

    #[test]
    fn test_mixed_faces_are_fan_triangulated() {
        let mesh = parse(
            "v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nv 2 0 0\n\
             f 1 2 3 4\nf 2 5 3\n",
        )
        .unwrap();
        assert_eq!(mesh.topology(), Topology::Triangles);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_missing_normals_use_face_normal() {
        // Counter-clockwise in the XZ plane seen from below gives -Y
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.normals[0], [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.positions[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_out_of_bounds_index_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, ObjError::InvalidFormat(_)));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let err = parse("v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert!(matches!(err, ObjError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_no_faces_rejected() {
        assert!(matches!(parse("v 0 0 0\n"), Err(ObjError::InvalidFormat(_))));
    }
}
