//! I/O operations for meshes
//!
//! Reads and writes polygon meshes. OBJ is the only supported format;
//! [`read_mesh`] and [`write_mesh`] pick the format from the file extension.

pub mod error;
pub mod obj;

pub use error::*;
pub use obj::{ObjReader, ObjWriter};

use meshview_core::{MeshWarning, PolygonMesh, Result};
use std::path::Path;

/// A mesh read from disk, with the faces that had to be skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshFile {
    pub mesh: PolygonMesh,
    pub warnings: Vec<MeshWarning>,
}

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<MeshFile>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolygonMesh, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<MeshFile> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjReader::read_mesh(path),
        _ => Err(IoError::InvalidFormat {
            format: format!("unsupported mesh format: {}", path.display()),
        }
        .into()),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &PolygonMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => ObjWriter::write_mesh(mesh, path),
        _ => Err(IoError::InvalidFormat {
            format: format!("unsupported mesh format: {}", path.display()),
        }
        .into()),
    }
}
