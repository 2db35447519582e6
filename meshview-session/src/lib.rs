//! Mesh session controller
//!
//! Ties the meshview crates together: a [`MeshSession`] loads an OBJ file,
//! normalizes it, keeps the post-load snapshot and rebuilds the displayed
//! mesh from that snapshot for every simplify, subdivide or reset request.
//! The result of each step is a [`RenderBuffers`] value that a renderer can
//! upload as-is. [`SessionWorker`] runs the same steps on a background
//! thread.

pub mod buffers;
pub mod config;
pub mod session;
pub mod worker;

pub use buffers::*;
pub use config::*;
pub use session::*;
pub use worker::*;
