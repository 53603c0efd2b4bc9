//! vistaxr
//!
//! A lightweight, cross-platform 3D/XR viewer runtime. The crate's core is
//! lifecycle orchestration: it stands up a render engine, a physics world and
//! an optional immersive session over a drawable surface, keeps them
//! consistent across resizes and asynchronous subsystem initialization, and
//! guarantees deterministic teardown. Render and physics engines are consumed
//! as opaque capability providers behind traits; wgpu- and rapier-backed
//! providers ship with the crate.
//!
//! High-level modules
//! - `surface`: drawable-surface binding and resize notifications
//! - `engine`: render-engine contract and fixed construction configuration
//! - `gpu`: the wgpu-backed render engine provider
//! - `scene`: cameras, lights, meshes, materials and per-frame hooks
//! - `physics`: asynchronous physics capability (rapier-backed)
//! - `xr`: immersive-session negotiation and state observation
//! - `lifecycle`: mount/unmount orchestration and the bootstrap sequence
//! - `content`: placeholder scene content
//! - `api`: typed client for the document-management backend
//!

pub mod api;
#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod content;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod lifecycle;
pub mod physics;
pub mod scene;
pub mod surface;
pub mod xr;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Deg, Point3, Rad, Vector3};
pub use error::ViewerError;
pub use lifecycle::{BootstrapPhase, LifecycleController, MountOptions, ViewerHandle};
pub use scene::Scene;
pub use surface::{ResizeSignal, Surface};

/// Route `log` output to the browser console. Native builds initialize
/// `env_logger` in `app::run` instead.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    let _ = console_log::init_with_level(log::Level::Info);
}
