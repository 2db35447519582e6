//! OBJ format support
//!
//! Only geometry is read: `v` positions and `f` polygons. Texture and
//! normal references in face tokens (`7/2/7`, `7//7`) are dropped, and all
//! other statements are ignored.

use crate::{IoError, MeshFile, MeshReader, MeshWriter};
use meshview_core::{check_face, MeshWarning, Point3d, PolygonMesh, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl ObjReader {
    /// Parse OBJ text from any buffered reader.
    ///
    /// Malformed `v` lines and face tokens that are not integers abort with
    /// a parse error. Faces that only fail validation (too few vertices,
    /// indices outside the vertex list) are skipped and reported in
    /// [`MeshFile::warnings`].
    pub fn parse<R: BufRead>(reader: R) -> std::result::Result<MeshFile, IoError> {
        let mut vertices: Vec<Point3d> = Vec::new();
        // File-order faces; unresolvable ones already carry their warning
        let mut faces: Vec<std::result::Result<Vec<usize>, MeshWarning>> = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_idx + 1;
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line.as_str(),
            };
            let mut tokens = content.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "v" => vertices.push(parse_vertex(tokens, line_no)?),
                "f" => {
                    let face_idx = faces.len();
                    faces.push(parse_face(tokens, face_idx, vertices.len(), line_no)?);
                }
                _ => {}
            }
        }

        let vertex_count = vertices.len();
        let mut warnings = Vec::new();
        let mut kept = Vec::with_capacity(faces.len());
        for (fi, face) in faces.into_iter().enumerate() {
            let checked = face.and_then(|f| match check_face(fi, &f, vertex_count) {
                Some(warning) => Err(warning),
                None => Ok(f),
            });
            match checked {
                Ok(f) => kept.push(f),
                Err(warning) => {
                    tracing::warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }

        // Every face was validated above, so this reports nothing new
        let (mesh, _) = PolygonMesh::from_polygons(vertices, kept);
        tracing::debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            skipped = warnings.len(),
            "parsed OBJ"
        );
        Ok(MeshFile { mesh, warnings })
    }

    /// Parse OBJ text held in memory
    pub fn parse_str(source: &str) -> Result<MeshFile> {
        Ok(Self::parse(source.as_bytes())?)
    }
}

fn parse_vertex<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> std::result::Result<Point3d, IoError> {
    let mut coord = |axis: &str| -> std::result::Result<f64, IoError> {
        let token = tokens
            .next()
            .ok_or_else(|| IoError::parse(line_no, format!("vertex is missing its {axis} coordinate")))?;
        let value: f64 = token
            .parse()
            .map_err(|_| IoError::parse(line_no, format!("invalid {axis} coordinate `{token}`")))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IoError::parse(line_no, format!("non-finite {axis} coordinate `{token}`")))
        }
    };
    let x = coord("x")?;
    let y = coord("y")?;
    let z = coord("z")?;
    // An optional w (or per-vertex color) may follow and is ignored
    Ok(Point3d::new(x, y, z))
}

/// Resolve one face line into 0-based indices.
///
/// Positive indices are 1-based; negative ones count back from the last
/// vertex read so far. An index that cannot name any vertex turns the whole
/// face into an `InvalidIndex` warning.
fn parse_face<'a>(
    tokens: impl Iterator<Item = &'a str>,
    face_idx: usize,
    vertices_so_far: usize,
    line_no: usize,
) -> std::result::Result<std::result::Result<Vec<usize>, MeshWarning>, IoError> {
    let mut face = Vec::new();
    let mut invalid = None;

    for token in tokens {
        let index_part = token.split('/').next().unwrap_or_default();
        let raw: i64 = index_part
            .parse()
            .map_err(|_| IoError::parse(line_no, format!("invalid face index `{token}`")))?;

        let resolved = match raw {
            r if r > 0 => usize::try_from(r - 1).ok(),
            r if r < 0 => {
                let back = usize::try_from(r.unsigned_abs()).unwrap_or(usize::MAX);
                vertices_so_far.checked_sub(back)
            }
            _ => None,
        };
        match resolved {
            Some(index) => face.push(index),
            None => {
                invalid.get_or_insert(raw);
            }
        }
    }

    Ok(match invalid {
        Some(index) => Err(MeshWarning::InvalidIndex {
            face: face_idx,
            index,
        }),
        None => Ok(face),
    })
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<MeshFile> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        })?;
        Ok(Self::parse(BufReader::new(file))?)
    }
}

impl ObjWriter {
    /// Write `v` and 1-based `f` lines for every vertex and face
    pub fn write<W: Write>(mesh: &PolygonMesh, writer: W) -> std::result::Result<(), IoError> {
        let mut writer = BufWriter::new(writer);
        writeln!(
            writer,
            "# meshview: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        )?;
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for face in &mesh.faces {
            write!(writer, "f")?;
            for &index in face {
                write!(writer, " {}", index + 1)?;
            }
            writeln!(writer)?;
        }
        writer.flush().map_err(|e| IoError::WriteError {
            message: e.to_string(),
        })
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolygonMesh, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        Ok(Self::write(mesh, file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::Error;
    use tempfile::NamedTempFile;

    const CUBE: &str = "\
# unit cube
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
v 0 0 1
v 1 0 1
v 0 1 1
v 1 1 1
f 1 3 4 2
f 5 6 8 7
f 1 2 6 5
f 3 7 8 4
f 1 5 7 3
f 2 4 8 6
";

    #[test]
    fn test_cube() {
        let file = ObjReader::parse_str(CUBE).unwrap();
        assert!(file.warnings.is_empty());
        assert_eq!(file.mesh.vertex_count(), 8);
        assert_eq!(file.mesh.face_count(), 6);
        assert_eq!(file.mesh.faces[0], vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_out_of_range_face_is_skipped() {
        let source = CUBE.replace("f 2 4 8 6", "f 2 4 999 6");
        let file = ObjReader::parse_str(&source).unwrap();
        assert_eq!(file.mesh.face_count(), 5);
        assert_eq!(
            file.warnings,
            vec![MeshWarning::IndexOutOfRange {
                face: 5,
                index: 998,
                vertex_count: 8
            }]
        );
    }

    #[test]
    fn test_slash_suffixes_and_ignored_statements() {
        let source = "\
mtllib scene.mtl
o thing
v 0 0 0 1.0
v 1 0 0
v 0 1 0
vt 0 0
vn 0 0 1
g group
s off
usemtl red
f 1/1/1 2/1/1 3/1/1
f 1//1 2//1 3//1 # trailing comment
l 1 2
";
        let file = ObjReader::parse_str(source).unwrap();
        assert_eq!(file.mesh.vertex_count(), 3);
        assert_eq!(file.mesh.faces, vec![vec![0, 1, 2], vec![0, 1, 2]]);
    }

    #[test]
    fn test_negative_indices() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
v 1 1 0
f -3 -1 -2
";
        let file = ObjReader::parse_str(source).unwrap();
        assert_eq!(file.mesh.faces, vec![vec![0, 1, 2], vec![1, 3, 2]]);
    }

    #[test]
    fn test_invalid_indices_warn() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 0 1 2
f -4 1 2
f 1 2
f 1 2 3
";
        let file = ObjReader::parse_str(source).unwrap();
        assert_eq!(file.mesh.faces, vec![vec![0, 1, 2]]);
        assert_eq!(
            file.warnings,
            vec![
                MeshWarning::InvalidIndex { face: 0, index: 0 },
                MeshWarning::InvalidIndex { face: 1, index: -4 },
                MeshWarning::DegenerateFace { face: 2, valence: 2 },
            ]
        );
    }

    #[test]
    fn test_malformed_vertex_fails() {
        for bad in ["v 1.0 2.0", "v 1.0 abc 3.0", "v nan 0 0"] {
            let source = format!("v 0 0 0\n{bad}\n");
            match ObjReader::parse_str(&source) {
                Err(Error::LoadFailed(message)) => assert!(message.contains("line 2")),
                other => panic!("expected LoadFailed for `{bad}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unparsable_face_token_fails() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 two 3\n";
        assert!(matches!(
            ObjReader::parse_str(source),
            Err(Error::LoadFailed(_))
        ));
    }

    #[test]
    fn test_empty_source() {
        let file = ObjReader::parse_str("# nothing here\n\n").unwrap();
        assert!(file.mesh.is_empty());
        assert!(file.warnings.is_empty());
    }

    #[test]
    fn test_write_read_file() {
        let (mesh, _) = PolygonMesh::from_polygons(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.5, 0.0, 0.0),
                Point3d::new(1.5, 2.25, 0.0),
                Point3d::new(0.0, 2.25, -0.125),
            ],
            vec![vec![0, 1, 2, 3]],
        );
        let temp = NamedTempFile::new().unwrap();
        ObjWriter::write_mesh(&mesh, temp.path()).unwrap();

        let text = std::fs::read_to_string(temp.path()).unwrap();
        assert!(text.contains("f 1 2 3 4"));

        let loaded = ObjReader::read_mesh(temp.path()).unwrap();
        assert_eq!(loaded.mesh.vertices, mesh.vertices);
        assert_eq!(loaded.mesh.faces, mesh.faces);
    }
}
