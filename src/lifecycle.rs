//! Mount/unmount orchestration and the bootstrap sequence.
//!
//! The controller sequences surface → engine → scene → enhancements → render
//! loop. The core path is synchronous and either fully succeeds or fails the
//! mount; the enhancement paths (physics, immersive session) are asynchronous
//! and allowed to fail with a warning. The render loop is never delayed by an
//! enhancement, and teardown is deterministic: scene first, then engine, then
//! the resize listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::content;
use crate::engine::{EngineConfig, EngineFactory, SharedEngine};
use crate::error::ViewerError;
use crate::physics::PhysicsBackend;
use crate::scene::Scene;
use crate::surface::{ListenerId, ResizeSignal, Surface};
use crate::xr::{SessionRequest, XrRuntime};

/// Bootstrap progression, recorded for diagnostics. Nothing gates on it:
/// `Rendering` is reached whether or not the enhancement tasks have resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    AwaitingPhysics,
    ScenePopulated,
    XrAttempted,
    Rendering,
}

/// Capability providers for one mount.
pub struct MountOptions {
    pub engine_config: EngineConfig,
    pub engine: EngineFactory,
    pub physics: Arc<dyn PhysicsBackend>,
    pub xr: Arc<dyn XrRuntime>,
}

#[cfg(not(target_arch = "wasm32"))]
type PendingTasks = Vec<tokio::task::JoinHandle<()>>;
#[cfg(target_arch = "wasm32")]
type PendingTasks = Vec<()>;

#[cfg(not(target_arch = "wasm32"))]
fn spawn_enhancement<F>(pending: &mut PendingTasks, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    pending.push(tokio::spawn(future));
}

#[cfg(target_arch = "wasm32")]
fn spawn_enhancement<F>(_pending: &mut PendingTasks, future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Sequences engine, scene, physics and immersive-session setup over a
/// surface and owns the resize listener registration for each mount.
pub struct LifecycleController {
    resize: ResizeSignal,
}

impl LifecycleController {
    pub fn new(resize: ResizeSignal) -> Self {
        Self { resize }
    }

    pub fn resize_signal(&self) -> &ResizeSignal {
        &self.resize
    }

    /// Bring the viewer up over `surface`.
    ///
    /// A missing surface makes the whole mount a no-op (`Ok(None)`): no
    /// partial engine or scene is created. Engine construction failure is
    /// fatal and propagated. On success the returned handle owns everything
    /// created here and must be passed to [`ViewerHandle::unmount`].
    pub fn mount(
        &self,
        surface: Option<Arc<dyn Surface>>,
        options: MountOptions,
    ) -> Result<Option<ViewerHandle>, ViewerError> {
        let Some(surface) = surface else {
            return Ok(None);
        };
        let MountOptions {
            engine_config,
            engine: factory,
            physics,
            xr,
        } = options;

        let engine = factory(Arc::clone(&surface), &engine_config)?;
        let engine: SharedEngine = Arc::new(Mutex::new(engine));
        let scene = Arc::new(Mutex::new(Scene::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let listener_engine = Arc::clone(&engine);
        let resize_listener = self.resize.subscribe(Box::new(move || {
            if let Ok(mut engine) = listener_engine.lock() {
                engine.resize();
            }
        }));

        let mut pending = PendingTasks::new();
        let phase = bootstrap(&scene, &engine, &alive, physics, xr, &mut pending);

        Ok(Some(ViewerHandle {
            scene,
            engine,
            resize: self.resize.clone(),
            resize_listener,
            alive,
            phase,
            pending,
        }))
    }
}

/// The bootstrap sequence. Phases advance synchronously; the two enhancement
/// tasks run fire-and-forget and re-check liveness before touching the scene.
fn bootstrap(
    scene: &Arc<Mutex<Scene>>,
    engine: &SharedEngine,
    alive: &Arc<AtomicBool>,
    physics: Arc<dyn PhysicsBackend>,
    xr: Arc<dyn XrRuntime>,
    pending: &mut PendingTasks,
) -> BootstrapPhase {
    let mut phase = BootstrapPhase::AwaitingPhysics;
    log::debug!("bootstrap: {phase:?}");

    // The scene lock is held across the physics spawn and population, so a
    // world that resolves instantly still attaches against the populated
    // mesh set.
    let mut scene_guard = scene.lock().unwrap();

    // Physics acquisition suspends only its own branch; scene population
    // below does not wait for it.
    let physics_scene = Arc::clone(scene);
    let physics_alive = Arc::clone(alive);
    spawn_enhancement(pending, async move {
        match physics.acquire().await {
            Ok(mut world) => {
                if !physics_alive.load(Ordering::Acquire) {
                    log::debug!("physics resolved after unmount, dropping world");
                    return;
                }
                let Ok(mut scene) = physics_scene.lock() else {
                    return;
                };
                if scene.is_disposed() {
                    log::debug!("physics resolved against a disposed scene, dropping world");
                    return;
                }
                for mesh in scene.meshes() {
                    world.insert_for_mesh(mesh);
                }
                match scene.attach_physics(world) {
                    Ok(()) => log::info!("physics world attached"),
                    Err(e) => log::warn!("could not attach physics world: {e}"),
                }
            }
            Err(e) => log::warn!("physics initialization failed, continuing without physics: {e}"),
        }
    });

    content::populate(&mut scene_guard);
    phase = BootstrapPhase::ScenePopulated;
    log::debug!("bootstrap: {phase:?}");

    // The immersive attempt needs the floor meshes, so it starts only after
    // population. It may suspend for permission prompts; the render loop
    // below does not wait for it either.
    let floor_meshes = scene_guard.floor_mesh_names();
    drop(scene_guard);
    let xr_scene = Arc::clone(scene);
    let xr_alive = Arc::clone(alive);
    spawn_enhancement(pending, async move {
        let request = SessionRequest {
            floor_meshes,
            optional_features: true,
        };
        match xr.negotiate(request).await {
            Ok(session) => {
                if !xr_alive.load(Ordering::Acquire) {
                    log::debug!("immersive session resolved after unmount, dropping it");
                    return;
                }
                session.on_state_changed().add(Box::new(|state| {
                    log::info!("immersive session state changed: {state:?}");
                }));
                let Ok(mut scene) = xr_scene.lock() else {
                    return;
                };
                if scene.is_disposed() {
                    log::debug!("immersive session resolved against a disposed scene");
                    return;
                }
                log::info!(
                    "immersive session established with {} floor meshes",
                    session.floor_meshes().len()
                );
                if let Err(e) = scene.set_xr_session(session) {
                    log::warn!("could not keep immersive session: {e}");
                }
            }
            Err(ViewerError::ImmersiveUnsupported) => {
                log::warn!("immersive sessions unsupported on this platform, staying in 2D");
            }
            Err(e) => log::warn!("immersive session negotiation failed, staying in 2D: {e}"),
        }
    });
    phase = BootstrapPhase::XrAttempted;
    log::debug!("bootstrap: {phase:?}");

    // Engine, scene and active camera all exist now; start the loop without
    // waiting for either enhancement.
    debug_assert!(
        scene.lock().unwrap().active_camera().is_some(),
        "active camera must be set before the render loop starts"
    );
    let loop_scene = Arc::clone(scene);
    engine
        .lock()
        .unwrap()
        .run_render_loop(Box::new(move || {
            if let Ok(mut scene) = loop_scene.lock() {
                scene.render();
            }
        }));
    phase = BootstrapPhase::Rendering;
    log::debug!("bootstrap: {phase:?}");
    phase
}

/// Running mount. Dropping it without calling [`unmount`](Self::unmount)
/// leaks the resize listener on purpose: teardown is an explicit operation.
pub struct ViewerHandle {
    scene: Arc<Mutex<Scene>>,
    engine: SharedEngine,
    resize: ResizeSignal,
    resize_listener: ListenerId,
    alive: Arc<AtomicBool>,
    phase: BootstrapPhase,
    pending: PendingTasks,
}

impl ViewerHandle {
    pub fn scene(&self) -> Arc<Mutex<Scene>> {
        Arc::clone(&self.scene)
    }

    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    /// Wait until both enhancement tasks have settled. Diagnostic/test
    /// helper; the render loop never needs this.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn wait_for_enhancements(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        futures::future::join_all(pending).await;
    }

    /// Tear the mount down: scene first (it cannot outlive the engine that
    /// renders it), then the engine, then exactly this mount's resize
    /// listener. In-flight enhancement acquisitions are not cancelled; their
    /// continuations observe the dead liveness flag and drop their results.
    pub fn unmount(self) {
        self.alive.store(false, Ordering::Release);

        if let Ok(mut scene) = self.scene.lock() {
            scene.dispose();
        }
        if let Ok(mut engine) = self.engine.lock() {
            engine.dispose();
        }
        if !self.resize.unsubscribe(self.resize_listener) {
            log::warn!("resize listener was already removed");
        }
        log::debug!("viewer unmounted");
    }
}
