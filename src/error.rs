//! Error taxonomy for the viewer runtime.
//!
//! Only engine construction failures are fatal to a mount. Everything on an
//! enhancement path (physics, immersive sessions, placeholder textures)
//! degrades the experience instead of aborting it and is reported through
//! `log::warn!` at the recovery site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The requested rendering backend could not be brought up. Fatal to
    /// mounting; propagated to the caller.
    #[error("rendering backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The physics capability failed to initialize. The scene continues
    /// without physics.
    #[error("physics initialization failed: {0}")]
    PhysicsInitFailed(String),

    /// A physics world is attached to a scene exactly once.
    #[error("a physics world is already attached to this scene")]
    PhysicsAlreadyAttached,

    /// The platform advertises no immersive capability. A degraded-capability
    /// signal, not a failure of the base experience.
    #[error("immersive sessions are not supported on this platform")]
    ImmersiveUnsupported,

    /// Session negotiation started but did not complete (denied permission,
    /// timeout, runtime error). The scene stays in its 2D configuration.
    #[error("immersive session negotiation failed: {0}")]
    ImmersiveNegotiationFailed(String),

    /// An immersive session is attached to a scene at most once.
    #[error("an immersive session is already attached to this scene")]
    XrSessionAlreadyAttached,

    /// A placeholder texture could not be loaded; the material falls back to
    /// a solid color.
    #[error("texture load failed: {0}")]
    TextureLoadFailed(String),

    /// The operation targeted a scene that has already been torn down.
    #[error("scene has already been disposed")]
    SceneDisposed,
}
