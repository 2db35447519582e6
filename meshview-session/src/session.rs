//! The mesh session state machine.
//!
//! A session owns two meshes: the Original snapshot taken right after a
//! successful load, and the Working mesh currently on screen. Every
//! operation rebuilds Working from Original, so simplifying to 50% and then
//! to 80% gives the same result as simplifying straight to 80%.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use meshview_algorithms::loop_subdivide;
use meshview_core::{Error, MeshStats, MeshWarning, PolygonMesh, Result};
use meshview_io::{read_mesh, MeshFile};
use meshview_simplification::{validate_ratio, MeshSimplifier};

use crate::buffers::RenderBuffers;
use crate::config::SessionConfig;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing loaded; only `load` is accepted
    #[default]
    Empty,
    Loading,
    /// A mesh is loaded and idle
    Ready,
    Simplifying,
    Subdividing,
    Resetting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "Empty",
            SessionState::Loading => "Loading",
            SessionState::Ready => "Ready",
            SessionState::Simplifying => "Simplifying",
            SessionState::Subdividing => "Subdividing",
            SessionState::Resetting => "Resetting",
        };
        f.write_str(name)
    }
}

/// An operation that rebuilds the Working mesh from the Original
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Keep roughly `ratio` of the original triangles
    Simplify { ratio: f64 },
    /// Loop-subdivide the original `iterations` times
    Subdivide { iterations: usize },
    /// Show the original again
    Reset,
}

impl Operation {
    /// Simplification from a UI percentage in [0, 100]
    pub fn simplify_percent(percent: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::InvalidParameter(format!(
                "operation value must be within [0, 100], got {percent}"
            )));
        }
        let ratio = percent / 100.0;
        validate_ratio(ratio)?;
        Ok(Operation::Simplify { ratio })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Simplify { .. } => "apply_operation",
            Operation::Subdivide { .. } => "subdivide",
            Operation::Reset => "reset",
        }
    }

    /// State the session is in while this operation runs
    pub fn state(&self) -> SessionState {
        match self {
            Operation::Simplify { .. } => SessionState::Simplifying,
            Operation::Subdivide { .. } => SessionState::Subdividing,
            Operation::Reset => SessionState::Resetting,
        }
    }

    /// Ratio reported back to the UI once the operation is applied
    fn echoed_ratio(&self) -> f64 {
        match self {
            Operation::Simplify { ratio } => *ratio,
            Operation::Subdivide { .. } | Operation::Reset => 0.0,
        }
    }
}

/// What a successful load produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Counts of the loaded mesh, before triangulation
    pub stats: MeshStats,
    /// Faces skipped while reading or triangulating
    pub warnings: Vec<MeshWarning>,
}

/// Output of a load, ready to install into a session
#[derive(Debug)]
pub(crate) struct LoadedMesh {
    original: PolygonMesh,
    buffers: RenderBuffers,
    report: LoadReport,
}

/// Output of an operation, ready to install into a session
#[derive(Debug)]
pub(crate) struct DerivedMesh {
    mesh: PolygonMesh,
    buffers: RenderBuffers,
}

fn load_failed(path: &Path, err: Error) -> Error {
    match err {
        Error::LoadFailed(message) => Error::LoadFailed(format!("{}: {message}", path.display())),
        other => Error::LoadFailed(format!("{}: {other}", path.display())),
    }
}

/// Read, normalize and derive everything for the file at `path`.
///
/// Runs without touching any session so it can execute on a worker thread.
pub(crate) fn load_mesh(path: &Path, config: &SessionConfig) -> Result<LoadedMesh> {
    let MeshFile { mut mesh, mut warnings } =
        read_mesh(path).map_err(|e| load_failed(path, e))?;

    mesh.normalize().map_err(|e| load_failed(path, e))?;
    mesh.update_normals();

    let (buffers, index_warnings) =
        RenderBuffers::build(&mesh, config.curvature).map_err(|e| load_failed(path, e))?;
    warnings.extend(index_warnings);

    let stats = mesh.stats();
    tracing::info!(path = %path.display(), %stats, skipped = warnings.len(), "mesh loaded");

    Ok(LoadedMesh {
        original: mesh,
        buffers,
        report: LoadReport {
            path: path.to_path_buf(),
            stats,
            warnings,
        },
    })
}

/// Rebuild a Working mesh from `original`
pub(crate) fn run_operation(
    original: &PolygonMesh,
    operation: Operation,
    config: &SessionConfig,
) -> Result<DerivedMesh> {
    let mut mesh = match operation {
        Operation::Simplify { ratio } => config.simplification.simplify(original, ratio)?,
        Operation::Subdivide { iterations } => {
            loop_subdivide(original, &config.subdivision(iterations))?
        }
        Operation::Reset => original.clone(),
    };
    if !mesh.has_normals() {
        mesh.update_normals();
    }
    let (buffers, _) = RenderBuffers::build(&mesh, config.curvature)?;
    Ok(DerivedMesh { mesh, buffers })
}

/// Single-threaded mesh session
#[derive(Debug, Default)]
pub struct MeshSession {
    config: SessionConfig,
    state: SessionState,
    original: Option<Arc<PolygonMesh>>,
    working: PolygonMesh,
    buffers: RenderBuffers,
    report: Option<LoadReport>,
    last_ratio: f64,
}

impl MeshSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The post-load snapshot, if a mesh is loaded
    pub fn original(&self) -> Option<&PolygonMesh> {
        self.original.as_deref()
    }

    /// The mesh currently on screen (empty when nothing is loaded)
    pub fn working(&self) -> &PolygonMesh {
        &self.working
    }

    pub fn buffers(&self) -> &RenderBuffers {
        &self.buffers
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    /// Ratio of the last applied simplification; 0 after load, reset and
    /// subdivide
    pub fn last_ratio(&self) -> f64 {
        self.last_ratio
    }

    /// Load the mesh at `path`, replacing whatever was loaded before.
    ///
    /// Accepted in every state. On failure the session ends up `Empty` and
    /// the error is `LoadFailed`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&LoadReport> {
        self.begin_load();
        let loaded = load_mesh(path.as_ref(), &self.config);
        self.finish_load(loaded)
    }

    /// Simplify the original to `percent` of its triangles (0..=100)
    pub fn apply_operation(&mut self, percent: f64) -> Result<()> {
        self.ensure_ready("apply_operation")?;
        self.run(Operation::simplify_percent(percent)?)
    }

    /// Show the original again
    pub fn reset(&mut self) -> Result<()> {
        self.run(Operation::Reset)
    }

    /// Loop-subdivide the original
    pub fn subdivide(&mut self, iterations: usize) -> Result<()> {
        self.run(Operation::Subdivide { iterations })
    }

    fn run(&mut self, operation: Operation) -> Result<()> {
        let original = self.begin(operation)?;
        let derived = run_operation(&original, operation, &self.config);
        self.finish(operation, derived)
    }

    pub(crate) fn ensure_ready(&self, operation: &'static str) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Drop everything loaded and enter `Loading`
    pub(crate) fn begin_load(&mut self) {
        self.original = None;
        self.working = PolygonMesh::new();
        self.buffers = RenderBuffers::default();
        self.report = None;
        self.last_ratio = 0.0;
        self.transition(SessionState::Loading);
    }

    pub(crate) fn finish_load(&mut self, loaded: Result<LoadedMesh>) -> Result<&LoadReport> {
        match loaded {
            Ok(loaded) => {
                self.working = loaded.original.clone();
                self.original = Some(Arc::new(loaded.original));
                self.buffers = loaded.buffers;
                self.transition(SessionState::Ready);
                Ok(self.report.insert(loaded.report))
            }
            Err(err) => {
                tracing::warn!("{err}");
                self.transition(SessionState::Empty);
                Err(err)
            }
        }
    }

    /// Enter the operation's state and hand out the original to rebuild from
    pub(crate) fn begin(&mut self, operation: Operation) -> Result<Arc<PolygonMesh>> {
        self.ensure_ready(operation.name())?;
        let original = self.original.clone().ok_or_else(|| Error::InvalidState {
            operation: operation.name(),
            state: self.state.to_string(),
        })?;
        self.transition(operation.state());
        Ok(original)
    }

    /// Install an operation's result; on failure Working is left as it was
    pub(crate) fn finish(&mut self, operation: Operation, derived: Result<DerivedMesh>) -> Result<()> {
        self.transition(SessionState::Ready);
        let derived = derived.map_err(|err| {
            tracing::warn!(operation = operation.name(), "{err}");
            err
        })?;
        self.working = derived.mesh;
        self.buffers = derived.buffers;
        self.last_ratio = operation.echoed_ratio();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshview_core::Bounded;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CUBE: &str = "\
v 0 0 0
v 2 0 0
v 0 2 0
v 2 2 0
v 0 0 2
v 2 0 2
v 0 2 2
v 2 2 2
f 1 3 4 2
f 5 6 8 7
f 1 2 6 5
f 3 7 8 4
f 1 5 7 3
f 2 4 8 6
";

    fn obj_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn loaded_cube() -> (MeshSession, NamedTempFile) {
        let file = obj_file(CUBE);
        let mut session = MeshSession::default();
        session.load(file.path()).unwrap();
        (session, file)
    }

    #[test]
    fn test_empty_session_rejects_operations() {
        let mut session = MeshSession::default();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(matches!(
            session.apply_operation(50.0),
            Err(Error::InvalidState { operation: "apply_operation", .. })
        ));
        assert!(matches!(session.reset(), Err(Error::InvalidState { .. })));
        assert!(matches!(session.subdivide(1), Err(Error::InvalidState { .. })));
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.buffers().is_empty());
    }

    #[test]
    fn test_load_cube() {
        let (session, _file) = loaded_cube();
        assert_eq!(session.state(), SessionState::Ready);

        let report = session.report().unwrap();
        assert_eq!(report.stats.vertices, 8);
        assert_eq!(report.stats.faces, 6);
        assert_eq!(report.stats.edges, 12);
        assert!(report.warnings.is_empty());

        let buffers = session.buffers();
        assert_eq!(buffers.triangle_count(), 12);
        assert_eq!(buffers.edge_count(), 12);
        assert_eq!(buffers.vertex_count(), 8);

        // Normalized into [-1, 1]
        let (min, max) = session.working().bounding_box().unwrap();
        for axis in 0..3 {
            assert_relative_eq!(min[axis], -1.0, epsilon = 1e-6);
            assert_relative_eq!(max[axis], 1.0, epsilon = 1e-6);
        }
        assert_eq!(session.original(), Some(session.working()));
    }

    #[test]
    fn test_load_failure_ends_empty() {
        let (mut session, _file) = loaded_cube();
        let bad = obj_file("v 0 0 0\nv 1 x 0\n");
        assert!(matches!(session.load(bad.path()), Err(Error::LoadFailed(_))));
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.original().is_none());
        assert!(session.buffers().is_empty());
    }

    #[test]
    fn test_load_single_point_is_degenerate() {
        let file = obj_file("v 1 1 1\n");
        let mut session = MeshSession::default();
        match session.load(file.path()) {
            Err(Error::LoadFailed(message)) => assert!(message.contains("Degenerate")),
            other => panic!("expected LoadFailed, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn test_percent_validation_keeps_state() {
        let (mut session, _file) = loaded_cube();
        let before = session.buffers().clone();
        for bad in [-1.0, 100.5, f64::NAN] {
            assert!(matches!(
                session.apply_operation(bad),
                Err(Error::InvalidParameter(_))
            ));
            assert_eq!(session.state(), SessionState::Ready);
        }
        assert_eq!(session.buffers(), &before);
    }

    #[test]
    fn test_full_percent_keeps_all_triangles() {
        let (mut session, _file) = loaded_cube();
        session.apply_operation(100.0).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.buffers().triangle_count(), 12);
        assert_relative_eq!(session.last_ratio(), 1.0);
    }

    #[test]
    fn test_reset_restores_original() {
        let (mut session, _file) = loaded_cube();
        let original = session.original().unwrap().clone();
        let original_buffers = session.buffers().clone();

        session.subdivide(1).unwrap();
        assert_eq!(session.working().face_count(), 48);
        session.apply_operation(30.0).unwrap();
        assert_relative_eq!(session.last_ratio(), 0.3);

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.working(), &original);
        assert_eq!(session.buffers(), &original_buffers);
        assert_eq!(session.last_ratio(), 0.0);
    }

    #[test]
    fn test_subdivide_limit() {
        let (mut session, _file) = loaded_cube();
        assert!(matches!(
            session.subdivide(100),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.working().face_count(), 6);
    }

    #[test]
    fn test_operation_from_percent() {
        assert_eq!(
            Operation::simplify_percent(25.0).unwrap(),
            Operation::Simplify { ratio: 0.25 }
        );
        assert_eq!(Operation::Reset.state(), SessionState::Resetting);
        assert_eq!(SessionState::Simplifying.to_string(), "Simplifying");
    }
}
