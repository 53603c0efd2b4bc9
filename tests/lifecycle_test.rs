//! Mount/unmount orchestration behavior over scripted providers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    AcceptingXr, FailingPhysics, FakeSurface, ManualEngine, RejectingXr, SlowPhysics, options,
};
use vistaxr::content::BOX_SPIN_RADIANS_PER_FRAME;
use vistaxr::lifecycle::{BootstrapPhase, LifecycleController};
use vistaxr::surface::ResizeSignal;
use vistaxr::ViewerError;

#[tokio::test]
async fn missing_surface_is_a_noop_mount() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();

    let handle = controller.mount(None, options(factory)).unwrap();

    assert!(handle.is_none());
    assert_eq!(controller.resize_signal().listener_count(), 0);
    assert!(!probe.loop_running());
}

#[tokio::test]
async fn engine_construction_failure_is_fatal() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let factory = ManualEngine::failing_factory("no gpu");

    let result = controller.mount(Some(FakeSurface::shared(800, 600)), options(factory));

    assert!(matches!(result, Err(ViewerError::BackendUnavailable(_))));
    assert_eq!(controller.resize_signal().listener_count(), 0);
}

#[tokio::test]
async fn mount_consumes_the_factory_and_hands_it_surface_and_config() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use vistaxr::engine::EngineFactory;
    use vistaxr::surface::SurfaceSize;

    let controller = LifecycleController::new(ResizeSignal::new());
    let (inner_factory, probe) = ManualEngine::factory();
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let factory: EngineFactory = Box::new(move |surface, config| {
        assert_eq!(surface.size(), SurfaceSize::new(640, 480));
        assert!(!config.force_legacy_backend);
        flag.store(true, Ordering::SeqCst);
        inner_factory(surface, config)
    });

    let handle = controller
        .mount(Some(FakeSurface::shared(640, 480)), options(factory))
        .unwrap()
        .expect("handle");

    assert!(invoked.load(Ordering::SeqCst));
    assert_eq!(handle.phase(), BootstrapPhase::Rendering);
    assert!(probe.loop_running());
    handle.unmount();
}

#[tokio::test]
async fn mount_reaches_rendering_and_unmount_tears_down() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();

    let handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), options(factory))
        .unwrap()
        .expect("mount with a surface yields a handle");

    assert_eq!(handle.phase(), BootstrapPhase::Rendering);
    assert!(probe.loop_running());
    assert_eq!(controller.resize_signal().listener_count(), 1);

    let scene = handle.scene();
    handle.unmount();

    assert!(probe.disposed());
    assert!(scene.lock().unwrap().is_disposed());
    assert_eq!(controller.resize_signal().listener_count(), 0);
}

#[tokio::test]
async fn each_resize_event_maps_to_one_engine_resize() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();

    let handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), options(factory))
        .unwrap()
        .expect("handle");

    controller.resize_signal().emit();
    controller.resize_signal().emit();
    controller.resize_signal().emit();
    assert_eq!(probe.resize_calls(), 3);

    handle.unmount();
    controller.resize_signal().emit();
    assert_eq!(probe.resize_calls(), 3);
}

#[tokio::test]
async fn physics_failure_never_stops_the_render_loop() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();
    let mut opts = options(factory);
    opts.physics = Arc::new(FailingPhysics);

    let mut handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), opts)
        .unwrap()
        .expect("handle");
    handle.wait_for_enhancements().await;

    assert!(probe.loop_running());
    {
        let scene = handle.scene();
        let scene = scene.lock().unwrap();
        assert!(scene.physics().is_none());
        assert_eq!(scene.meshes().len(), 2);
    }
    handle.engine().lock().unwrap().step_frame();
    assert_eq!(probe.frames(), 1);
    handle.unmount();
}

#[tokio::test]
async fn resolved_physics_attaches_colliders_for_the_content() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, _probe) = ManualEngine::factory();

    let mut handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), options(factory))
        .unwrap()
        .expect("handle");
    handle.wait_for_enhancements().await;

    {
        let scene = handle.scene();
        let scene = scene.lock().unwrap();
        let world = scene.physics().expect("physics world attached");
        // Static ground slab plus the dynamic box.
        assert_eq!(world.collider_count(), 2);
        assert_eq!(world.body_count(), 1);
    }
    handle.unmount();
}

#[tokio::test]
async fn xr_rejection_leaves_the_scene_in_2d() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();
    let mut opts = options(factory);
    opts.xr = Arc::new(RejectingXr);

    let mut handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), opts)
        .unwrap()
        .expect("handle");
    handle.wait_for_enhancements().await;

    assert!(probe.loop_running());
    {
        let scene = handle.scene();
        let scene = scene.lock().unwrap();
        assert!(scene.xr_session().is_none());
    }
    handle.unmount();
}

#[tokio::test]
async fn negotiated_session_carries_the_floor_meshes() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, _probe) = ManualEngine::factory();
    let mut opts = options(factory);
    opts.xr = Arc::new(AcceptingXr);

    let mut handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), opts)
        .unwrap()
        .expect("handle");
    handle.wait_for_enhancements().await;

    {
        let scene = handle.scene();
        let scene = scene.lock().unwrap();
        let session = scene.xr_session().expect("session attached");
        assert_eq!(session.floor_meshes(), ["ground".to_string()]);
    }
    handle.unmount();
}

#[tokio::test]
async fn stepping_the_engine_advances_scene_frames_and_the_spin() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, probe) = ManualEngine::factory();

    let handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), options(factory))
        .unwrap()
        .expect("handle");

    for _ in 0..3 {
        handle.engine().lock().unwrap().step_frame();
    }

    assert_eq!(probe.frames(), 3);
    {
        let scene = handle.scene();
        let scene = scene.lock().unwrap();
        assert_eq!(scene.frames_rendered(), 3);
        let rotation = scene.mesh("box").expect("box").rotation.y;
        assert!((rotation - 3.0 * BOX_SPIN_RADIANS_PER_FRAME).abs() < 1e-5);
    }
    handle.unmount();
}

#[tokio::test]
async fn late_physics_resolution_never_touches_a_disposed_scene() {
    let controller = LifecycleController::new(ResizeSignal::new());
    let (factory, _probe) = ManualEngine::factory();
    let mut opts = options(factory);
    opts.physics = Arc::new(SlowPhysics { delay_ms: 50 });

    let handle = controller
        .mount(Some(FakeSurface::shared(800, 600)), opts)
        .unwrap()
        .expect("handle");
    let scene = handle.scene();
    handle.unmount();

    // Let the acquisition finish well after teardown.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let scene = scene.lock().unwrap();
    assert!(scene.is_disposed());
    assert!(scene.physics().is_none());
}
