//! Error types for meshview

use thiserror::Error;

/// Main error type for meshview operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load mesh: {0}")]
    LoadFailed(String),

    #[error("Mesh has no vertices")]
    EmptyMesh,

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: usize, vertex_count: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Operation `{operation}` is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Another operation is already in flight")]
    Busy,

    #[error("Background job panicked: {0}")]
    JobPanicked(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for meshview operations
pub type Result<T> = std::result::Result<T, Error>;

/// A recoverable per-face problem.
///
/// The offending face is dropped and processing continues; the warning is
/// kept so callers can report what was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshWarning {
    /// A face referenced a vertex that does not exist
    IndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
    /// A face had fewer than three vertices
    DegenerateFace { face: usize, valence: usize },
    /// A face used an index that names no vertex at all (zero, or a
    /// relative index reaching before the first vertex)
    InvalidIndex { face: usize, index: i64 },
}

impl MeshWarning {
    /// Ordinal of the face the warning refers to
    pub fn face(&self) -> usize {
        match self {
            MeshWarning::IndexOutOfRange { face, .. } => *face,
            MeshWarning::DegenerateFace { face, .. } => *face,
            MeshWarning::InvalidIndex { face, .. } => *face,
        }
    }
}

impl std::fmt::Display for MeshWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshWarning::IndexOutOfRange {
                face,
                index,
                vertex_count,
            } => write!(
                f,
                "face {face} skipped: vertex index {index} out of range ({vertex_count} vertices)"
            ),
            MeshWarning::DegenerateFace { face, valence } => {
                write!(f, "face {face} skipped: valence {valence} < 3")
            }
            MeshWarning::InvalidIndex { face, index } => {
                write!(f, "face {face} skipped: invalid vertex index {index}")
            }
        }
    }
}
