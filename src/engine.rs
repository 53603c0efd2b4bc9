//! Render-engine contract.
//!
//! The lifecycle controller consumes render engines as opaque capability
//! providers behind [`RenderEngine`]; the concrete wgpu provider lives in
//! [`crate::gpu`] and test doubles implement the same trait. Engines are
//! constructed through a boxed [`EngineFactory`] so the controller never
//! depends on a concrete backend type.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::error::ViewerError;
use crate::surface::Surface;

/// GPU selection hint passed through to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerPreference {
    LowPower,
    HighPerformance,
}

/// Fixed engine construction flags. Set once, never mutated after the engine
/// exists.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable a stencil buffer (required for highlight/outline effects).
    pub stencil: bool,
    /// Enable multisampling.
    pub antialias: bool,
    /// Bring up the audio subsystem alongside the renderer.
    pub audio_engine: bool,
    /// Scale the backing store by the device pixel ratio.
    pub adapt_to_device_ratio: bool,
    /// Force the legacy GL backend instead of the platform default.
    pub force_legacy_backend: bool,
    /// Request higher-precision shader math where the backend supports it.
    pub use_high_precision_floats: bool,
    /// GPU selection hint.
    pub power_preference: PowerPreference,
    /// Fail construction when only a software rasterizer is available.
    /// When false, the engine tolerates the fallback.
    pub fail_on_software_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stencil: true,
            antialias: true,
            audio_engine: true,
            adapt_to_device_ratio: true,
            force_legacy_backend: false,
            use_high_precision_floats: true,
            power_preference: PowerPreference::HighPerformance,
            fail_on_software_fallback: false,
        }
    }
}

/// Per-frame callback registered via [`RenderEngine::run_render_loop`]. It is
/// invoked once per display refresh until the engine is disposed and must not
/// block.
pub type FrameCallback = Box<dyn FnMut() + Send>;

/// Wraps a GPU context bound to exactly one [`Surface`].
pub trait RenderEngine: Send {
    /// Recompute the backing-store resolution from the surface's current
    /// dimensions and device pixel ratio. Safe to call at any time after
    /// construction; a no-op while the surface has zero area.
    fn resize(&mut self);

    /// Register the per-frame callback. The loop runs until disposal.
    fn run_render_loop(&mut self, callback: FrameCallback);

    fn render_loop_running(&self) -> bool;

    /// Advance the render loop by one frame: invoke the registered callback,
    /// then present. Does nothing before `run_render_loop` or after
    /// `dispose`.
    fn step_frame(&mut self);

    /// Release the GPU context. Idempotent; the render loop stops.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    /// Escape hatch for provider-specific wiring (e.g. handing the scene to
    /// the wgpu engine for drawing).
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Engines shared between the lifecycle handle, the resize listener and the
/// window shell.
pub type SharedEngine = Arc<Mutex<Box<dyn RenderEngine>>>;

/// Boxed engine constructor. Construction failure is the one fatal path of a
/// mount: the controller propagates the error instead of catching it.
pub type EngineFactory = Box<
    dyn FnOnce(Arc<dyn Surface>, &EngineConfig) -> Result<Box<dyn RenderEngine>, ViewerError>
        + Send,
>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_construction_contract() {
        let config = EngineConfig::default();
        assert!(config.stencil);
        assert!(config.antialias);
        assert!(config.audio_engine);
        assert!(config.adapt_to_device_ratio);
        assert!(!config.force_legacy_backend);
        assert!(config.use_high_precision_floats);
        assert_eq!(config.power_preference, PowerPreference::HighPerformance);
        assert!(!config.fail_on_software_fallback);
    }
}
