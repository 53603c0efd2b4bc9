//! Native window shell.
//!
//! Hosts the viewer inside a winit event loop: window creation, mount on
//! resume, resize and redraw forwarding, unmount on close. On this target the
//! engine is built up front on the shell's tokio runtime, then handed to the
//! lifecycle controller through its factory seam.

use std::sync::Arc;

use tokio::runtime::Runtime;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::Window;

use crate::engine::{EngineConfig, RenderEngine};
use crate::gpu::WgpuEngine;
use crate::lifecycle::{LifecycleController, MountOptions, ViewerHandle};
use crate::physics::RapierBackend;
use crate::surface::{ResizeSignal, Surface, WindowSurface};
use crate::xr::UnsupportedXrRuntime;

struct ViewerApp {
    runtime: Runtime,
    controller: LifecycleController,
    handle: Option<ViewerHandle>,
}

impl ViewerApp {
    fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            controller: LifecycleController::new(ResizeSignal::default()),
            handle: None,
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.handle.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("vistaxr");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let engine_config = EngineConfig::default();
        let engine = match self
            .runtime
            .block_on(WgpuEngine::new(Arc::clone(&window), &engine_config))
        {
            Ok(engine) => engine,
            Err(e) => {
                log::error!("engine construction failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let surface: Arc<dyn Surface> = Arc::new(WindowSurface::new(Arc::clone(&window)));
        let options = MountOptions {
            engine_config,
            engine: Box::new(move |_surface, _config| {
                Ok(Box::new(engine) as Box<dyn RenderEngine>)
            }),
            physics: Arc::new(RapierBackend),
            xr: Arc::new(UnsupportedXrRuntime),
        };

        // The enhancement tasks spawn onto this runtime.
        let _guard = self.runtime.enter();
        match self.controller.mount(Some(surface), options) {
            Ok(Some(handle)) => {
                if let Ok(mut engine) = handle.engine().lock() {
                    if let Some(engine) = engine.as_any_mut().downcast_mut::<WgpuEngine>() {
                        engine.bind_scene(handle.scene());
                    }
                }
                self.handle = Some(handle);
                window.request_redraw();
            }
            Ok(None) => {
                log::warn!("mount skipped, no surface");
                event_loop.exit();
            }
            Err(e) => {
                log::error!("mount failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(handle) = self.handle.take() {
                    handle.unmount();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.controller.resize_signal().emit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(handle) = &self.handle {
                    if let Ok(mut engine) = handle.engine().lock() {
                        engine.step_frame();
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let runtime = Runtime::new()?;
    let event_loop = EventLoop::new()?;
    let mut app = ViewerApp::new(runtime);
    event_loop.run_app(&mut app)?;
    Ok(())
}
