//! Test doubles for the lifecycle seams: a windowless surface, a manually
//! stepped engine, and scripted physics/XR providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cgmath::Vector3;

use vistaxr::ViewerError;
use vistaxr::engine::{EngineConfig, EngineFactory, FrameCallback, RenderEngine};
use vistaxr::lifecycle::MountOptions;
use vistaxr::physics::{GRAVITY, PhysicsBackend, PhysicsWorld};
use vistaxr::surface::{Surface, SurfaceSize};
use vistaxr::xr::{ImmersiveSession, SessionRequest, XrRuntime};

pub struct FakeSurface {
    pub width: u32,
    pub height: u32,
}

impl FakeSurface {
    pub fn shared(width: u32, height: u32) -> Arc<dyn Surface> {
        Arc::new(Self { width, height })
    }
}

impl Surface for FakeSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        2.0
    }
}

#[derive(Default)]
struct ProbeInner {
    resize_calls: AtomicUsize,
    frames: AtomicUsize,
    loop_running: AtomicBool,
    disposed: AtomicBool,
}

/// Shared view into a [`ManualEngine`]'s observable state.
#[derive(Clone, Default)]
pub struct EngineProbe {
    inner: Arc<ProbeInner>,
}

impl EngineProbe {
    pub fn resize_calls(&self) -> usize {
        self.inner.resize_calls.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> usize {
        self.inner.frames.load(Ordering::SeqCst)
    }

    pub fn loop_running(&self) -> bool {
        self.inner.loop_running.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

/// Engine that only advances when the test steps it.
pub struct ManualEngine {
    probe: EngineProbe,
    callback: Option<FrameCallback>,
}

impl ManualEngine {
    /// Factory handing out one engine plus the probe watching it.
    pub fn factory() -> (EngineFactory, EngineProbe) {
        let probe = EngineProbe::default();
        let engine_probe = probe.clone();
        let factory: EngineFactory = Box::new(move |_surface, _config| {
            Ok(Box::new(ManualEngine {
                probe: engine_probe,
                callback: None,
            }) as Box<dyn RenderEngine>)
        });
        (factory, probe)
    }

    /// Factory whose construction always fails.
    pub fn failing_factory(message: &str) -> EngineFactory {
        let message = message.to_string();
        Box::new(move |_surface, _config| Err(ViewerError::BackendUnavailable(message)))
    }
}

impl RenderEngine for ManualEngine {
    fn resize(&mut self) {
        self.probe.inner.resize_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn run_render_loop(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
        self.probe.inner.loop_running.store(true, Ordering::SeqCst);
    }

    fn render_loop_running(&self) -> bool {
        self.probe.loop_running() && !self.probe.disposed()
    }

    fn step_frame(&mut self) {
        if self.probe.disposed() || !self.probe.loop_running() {
            return;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback();
        }
        self.probe.inner.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&mut self) {
        self.probe.inner.loop_running.store(false, Ordering::SeqCst);
        self.probe.inner.disposed.store(true, Ordering::SeqCst);
        self.callback = None;
    }

    fn is_disposed(&self) -> bool {
        self.probe.disposed()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Physics provider that resolves immediately.
pub struct ReadyPhysics;

#[async_trait]
impl PhysicsBackend for ReadyPhysics {
    async fn acquire(&self) -> Result<PhysicsWorld, ViewerError> {
        Ok(PhysicsWorld::new(Vector3::from(GRAVITY)))
    }
}

/// Physics provider that always fails.
pub struct FailingPhysics;

#[async_trait]
impl PhysicsBackend for FailingPhysics {
    async fn acquire(&self) -> Result<PhysicsWorld, ViewerError> {
        Err(ViewerError::PhysicsInitFailed("no solver".into()))
    }
}

/// Physics provider that resolves after a delay, for racing against unmount.
pub struct SlowPhysics {
    pub delay_ms: u64,
}

#[async_trait]
impl PhysicsBackend for SlowPhysics {
    async fn acquire(&self) -> Result<PhysicsWorld, ViewerError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        Ok(PhysicsWorld::new(Vector3::from(GRAVITY)))
    }
}

/// XR runtime that grants every request.
pub struct AcceptingXr;

#[async_trait]
impl XrRuntime for AcceptingXr {
    async fn negotiate(&self, request: SessionRequest) -> Result<ImmersiveSession, ViewerError> {
        Ok(ImmersiveSession::new(request.floor_meshes))
    }
}

/// XR runtime that refuses every request.
pub struct RejectingXr;

#[async_trait]
impl XrRuntime for RejectingXr {
    async fn negotiate(&self, _request: SessionRequest) -> Result<ImmersiveSession, ViewerError> {
        Err(ViewerError::ImmersiveNegotiationFailed("denied".into()))
    }
}

/// Default mount options over the given engine factory.
pub fn options(engine: EngineFactory) -> MountOptions {
    MountOptions {
        engine_config: EngineConfig::default(),
        engine,
        physics: Arc::new(ReadyPhysics),
        xr: Arc::new(AcceptingXr),
    }
}
