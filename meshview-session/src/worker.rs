//! Background execution of session jobs.
//!
//! [`SessionWorker`] wraps a [`MeshSession`] and runs loads and operations
//! on a spawned thread. Results come back over a `flume` channel and are
//! installed by [`SessionWorker::poll`] (or [`SessionWorker::wait`]) on the
//! owning thread, so buffers are only ever swapped as a whole.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use flume::{Receiver, Sender};
use meshview_core::{Error, Result};

use crate::buffers::RenderBuffers;
use crate::config::SessionConfig;
use crate::session::{
    load_mesh, run_operation, DerivedMesh, LoadReport, LoadedMesh, MeshSession, Operation,
    SessionState,
};

enum JobOutput {
    Load(Result<LoadedMesh>),
    Operation(Operation, Result<DerivedMesh>),
}

struct JobResult {
    generation: u64,
    output: JobOutput,
}

/// A job whose result has been installed
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Loaded(LoadReport),
    Applied(Operation),
}

/// Runs one session job at a time off the calling thread
pub struct SessionWorker {
    session: MeshSession,
    sender: Sender<JobResult>,
    receiver: Receiver<JobResult>,
    /// Bumped by every load; results tagged with an older value are stale
    generation: u64,
    in_flight: bool,
}

impl SessionWorker {
    pub fn new(config: SessionConfig) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            session: MeshSession::new(config),
            sender,
            receiver,
            generation: 0,
            in_flight: false,
        }
    }

    pub fn session(&self) -> &MeshSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn buffers(&self) -> &RenderBuffers {
        self.session.buffers()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Start loading `path`.
    ///
    /// Always accepted: a job still in flight is superseded and its result
    /// will be dropped when it arrives.
    pub fn load(&mut self, path: impl AsRef<Path>) {
        self.generation += 1;
        self.session.begin_load();

        let path: PathBuf = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        let config = self.session.config().clone();
        self.spawn(
            move || JobOutput::Load(load_mesh(&path, &config)),
            move |message| JobOutput::Load(Err(Error::LoadFailed(format!("{display}: {message}")))),
        );
    }

    /// Start simplifying to `percent` of the original triangles
    pub fn apply_operation(&mut self, percent: f64) -> Result<()> {
        self.ensure_idle()?;
        self.session.ensure_ready("apply_operation")?;
        self.start(Operation::simplify_percent(percent)?)
    }

    /// Start restoring the original
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.start(Operation::Reset)
    }

    /// Start subdividing the original
    pub fn subdivide(&mut self, iterations: usize) -> Result<()> {
        self.ensure_idle()?;
        self.start(Operation::Subdivide { iterations })
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.in_flight {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    fn start(&mut self, operation: Operation) -> Result<()> {
        let original = self.session.begin(operation)?;
        let config = self.session.config().clone();
        self.spawn(
            move || JobOutput::Operation(operation, run_operation(&original, operation, &config)),
            move |message| JobOutput::Operation(operation, Err(Error::JobPanicked(message))),
        );
        Ok(())
    }

    /// Run `job` on its own thread. A panicking job still reports back,
    /// through `on_panic`, so the worker never waits on a result that
    /// will not come.
    fn spawn<F, P>(&mut self, job: F, on_panic: P)
    where
        F: FnOnce() -> JobOutput + Send + 'static,
        P: FnOnce(String) -> JobOutput + Send + 'static,
    {
        let generation = self.generation;
        let sender = self.sender.clone();
        self.in_flight = true;
        thread::spawn(move || {
            let output = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(generation, "session job panicked: {message}");
                on_panic(message)
            });
            if sender.send(JobResult { generation, output }).is_err() {
                tracing::debug!(generation, "session worker dropped before job finished");
            }
        });
    }

    /// Install the result of the current job if it has arrived.
    ///
    /// Returns `None` while the job is still running (or when nothing was
    /// started). Stale results from superseded jobs are discarded.
    pub fn poll(&mut self) -> Option<Result<Completion>> {
        while let Ok(result) = self.receiver.try_recv() {
            if let Some(done) = self.accept(result) {
                return Some(done);
            }
        }
        None
    }

    /// Block until the current job finishes and install its result
    pub fn wait(&mut self) -> Option<Result<Completion>> {
        while self.in_flight {
            let result = self.receiver.recv().ok()?;
            if let Some(done) = self.accept(result) {
                return Some(done);
            }
        }
        None
    }

    fn accept(&mut self, result: JobResult) -> Option<Result<Completion>> {
        if result.generation != self.generation {
            tracing::debug!(
                stale = result.generation,
                current = self.generation,
                "discarding stale session result"
            );
            return None;
        }
        self.in_flight = false;
        Some(match result.output {
            JobOutput::Load(loaded) => self
                .session
                .finish_load(loaded)
                .map(|report| Completion::Loaded(report.clone())),
            JobOutput::Operation(operation, derived) => self
                .session
                .finish(operation, derived)
                .map(|()| Completion::Applied(operation)),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl Default for SessionWorker {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TETRAHEDRON: &str = "\
v 0 0 0
v 1 0 0
v 0.5 1 0
v 0.5 0.5 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    fn obj_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_idle_worker() {
        let mut worker = SessionWorker::default();
        assert!(!worker.is_busy());
        assert!(worker.poll().is_none());
        assert!(worker.wait().is_none());
        assert!(matches!(worker.reset(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_load_in_background() {
        let file = obj_file(TETRAHEDRON);
        let mut worker = SessionWorker::default();
        worker.load(file.path());
        assert!(worker.is_busy());
        assert_eq!(worker.state(), SessionState::Loading);

        match worker.wait() {
            Some(Ok(Completion::Loaded(report))) => assert_eq!(report.stats.faces, 4),
            other => panic!("unexpected completion: {other:?}"),
        }
        assert!(!worker.is_busy());
        assert_eq!(worker.state(), SessionState::Ready);
        assert_eq!(worker.buffers().triangle_count(), 4);
    }

    #[test]
    fn test_busy_rejects_second_operation() {
        let file = obj_file(TETRAHEDRON);
        let mut worker = SessionWorker::default();
        worker.load(file.path());
        worker.wait().unwrap().unwrap();

        worker.subdivide(1).unwrap();
        assert_eq!(worker.state(), SessionState::Subdividing);
        assert!(matches!(worker.apply_operation(50.0), Err(Error::Busy)));
        assert!(matches!(worker.reset(), Err(Error::Busy)));

        assert_eq!(
            worker.wait().unwrap().unwrap(),
            Completion::Applied(Operation::Subdivide { iterations: 1 })
        );
        assert_eq!(worker.buffers().triangle_count(), 16);
    }

    #[test]
    fn test_load_discards_stale_result() {
        let file = obj_file(TETRAHEDRON);
        let mut worker = SessionWorker::default();
        worker.load(file.path());
        worker.wait().unwrap().unwrap();

        worker.subdivide(2).unwrap();
        // Superseded before the subdivision result is installed
        worker.load(file.path());
        match worker.wait() {
            Some(Ok(Completion::Loaded(_))) => {}
            other => panic!("unexpected completion: {other:?}"),
        }
        assert_eq!(worker.buffers().triangle_count(), 4);
        assert!(worker.poll().is_none());
    }

    #[test]
    fn test_panicking_job_still_completes() {
        let file = obj_file(TETRAHEDRON);
        let mut worker = SessionWorker::default();
        worker.load(file.path());
        worker.wait().unwrap().unwrap();

        worker.session.begin(Operation::Reset).unwrap();
        worker.spawn(
            || -> JobOutput { panic!("mesh went away") },
            |message| JobOutput::Operation(Operation::Reset, Err(Error::JobPanicked(message))),
        );
        match worker.wait() {
            Some(Err(Error::JobPanicked(message))) => assert_eq!(message, "mesh went away"),
            other => panic!("unexpected completion: {other:?}"),
        }
        assert!(!worker.is_busy());
        assert_eq!(worker.state(), SessionState::Ready);
        assert_eq!(worker.buffers().triangle_count(), 4);

        // The worker keeps accepting jobs afterwards
        worker.subdivide(1).unwrap();
        assert!(worker.wait().unwrap().is_ok());
        assert_eq!(worker.buffers().triangle_count(), 16);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn test_failed_load_ends_empty() {
        let mut worker = SessionWorker::default();
        worker.load("/definitely/not/here.obj");
        assert!(matches!(worker.wait(), Some(Err(Error::LoadFailed(_)))));
        assert_eq!(worker.state(), SessionState::Empty);
        assert!(!worker.is_busy());
    }
}
