//! Scene data: cameras, lights, meshes, materials and per-frame hooks.
//!
//! A [`Scene`] is owned by exactly one engine at a time and is the unit of
//! disposal. Meshes are kept in insertion order; the active camera is nullable
//! until set and must be present before the render loop starts. The physics
//! world and immersive session are optional attachments resolved
//! asynchronously after the scene is populated.

use cgmath::{Point3, Vector3};

use crate::error::ViewerError;
use crate::physics::PhysicsWorld;
use crate::xr::ImmersiveSession;

/// Decoded image payload backing a material.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub name: String,
    pub image: image::DynamicImage,
}

/// Placeholder geometry is generated, not loaded, so shapes are parametric.
#[derive(Debug, Clone, Copy)]
pub enum MeshShape {
    /// Flat plane in the XZ plane, centered on the mesh position.
    Ground { width: f32, depth: f32 },
    /// Axis-aligned cube with the given edge length.
    Box { size: f32 },
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub diffuse_color: [f32; 3],
    pub diffuse_texture: Option<TextureData>,
}

impl Material {
    pub fn solid(name: &str, diffuse_color: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            diffuse_color,
            diffuse_texture: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub shape: MeshShape,
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied per-frame by the renderer.
    pub rotation: Vector3<f32>,
    pub material: Material,
}

impl Mesh {
    pub fn ground(name: &str, width: f32, depth: f32, material: Material) -> Self {
        Self {
            name: name.to_string(),
            shape: MeshShape::Ground { width, depth },
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            material,
        }
    }

    pub fn cube(name: &str, size: f32, material: Material) -> Self {
        Self {
            name: name.to_string(),
            shape: MeshShape::Box { size },
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            material,
        }
    }
}

/// Hemispheric-style light: a direction and an intensity.
#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub direction: Vector3<f32>,
    pub intensity: f32,
}

impl Light {
    pub fn hemispheric(name: &str, direction: Vector3<f32>, intensity: f32) -> Self {
        Self {
            name: name.to_string(),
            direction,
            intensity,
        }
    }
}

/// Orbit camera: azimuth/elevation/radius around a target point.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub name: String,
    /// Azimuth around the Y axis, radians.
    pub alpha: f32,
    /// Elevation measured from the Y axis, radians.
    pub beta: f32,
    pub radius: f32,
    pub target: Vector3<f32>,
    controls_attached: bool,
}

impl OrbitCamera {
    pub fn new(name: &str, alpha: f32, beta: f32, radius: f32, target: Vector3<f32>) -> Self {
        Self {
            name: name.to_string(),
            alpha,
            beta,
            radius,
            target,
            controls_attached: false,
        }
    }

    /// Bind the camera to input controls.
    pub fn attach_control(&mut self) {
        self.controls_attached = true;
    }

    pub fn controls_attached(&self) -> bool {
        self.controls_attached
    }

    /// Camera position derived from the orbit parameters.
    pub fn eye(&self) -> Point3<f32> {
        let sin_beta = self.beta.sin();
        Point3::new(
            self.target.x + self.radius * sin_beta * self.alpha.cos(),
            self.target.y + self.radius * self.beta.cos(),
            self.target.z + self.radius * sin_beta * self.alpha.sin(),
        )
    }
}

/// Floor classification is a naming convention, not a typed tag: any mesh
/// whose name contains "ground" or "floor" (case-insensitive) is a valid
/// teleportation/boundary surface for immersive mode.
pub fn is_floor_mesh(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("ground") || name.contains("floor")
}

/// Hook invoked before each frame renders. Hooks mutate scene content (the
/// placeholder spin animation lives here) and must not block.
pub type BeforeRenderHook = Box<dyn FnMut(&mut Scene) + Send>;

pub struct Scene {
    meshes: Vec<Mesh>,
    lights: Vec<Light>,
    cameras: Vec<OrbitCamera>,
    active_camera: Option<usize>,
    physics: Option<PhysicsWorld>,
    xr_session: Option<ImmersiveSession>,
    before_render: Vec<BeforeRenderHook>,
    frames_rendered: u64,
    disposed: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
            active_camera: None,
            physics: None,
            xr_session: None,
            before_render: Vec::new(),
            frames_rendered: 0,
            disposed: false,
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    pub fn mesh_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|mesh| mesh.name == name)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_camera(&mut self, camera: OrbitCamera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    pub fn set_active_camera(&mut self, index: usize) {
        if index < self.cameras.len() {
            self.active_camera = Some(index);
        } else {
            log::warn!("camera index {index} out of range, active camera unchanged");
        }
    }

    pub fn active_camera(&self) -> Option<&OrbitCamera> {
        self.active_camera.and_then(|index| self.cameras.get(index))
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut OrbitCamera> {
        let index = self.active_camera?;
        self.cameras.get_mut(index)
    }

    /// Attach the resolved physics world. Performed exactly once per scene;
    /// a second attach and an attach after disposal are both rejected.
    pub fn attach_physics(&mut self, world: PhysicsWorld) -> Result<(), ViewerError> {
        if self.disposed {
            return Err(ViewerError::SceneDisposed);
        }
        if self.physics.is_some() {
            return Err(ViewerError::PhysicsAlreadyAttached);
        }
        self.physics = Some(world);
        Ok(())
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_mut()
    }

    /// Attach a negotiated immersive session. At most one per scene; a
    /// second attach and an attach after disposal are both rejected.
    pub fn set_xr_session(&mut self, session: ImmersiveSession) -> Result<(), ViewerError> {
        if self.disposed {
            return Err(ViewerError::SceneDisposed);
        }
        if self.xr_session.is_some() {
            return Err(ViewerError::XrSessionAlreadyAttached);
        }
        self.xr_session = Some(session);
        Ok(())
    }

    pub fn xr_session(&self) -> Option<&ImmersiveSession> {
        self.xr_session.as_ref()
    }

    /// Names of the meshes classified as floors, in mesh order.
    pub fn floor_mesh_names(&self) -> Vec<String> {
        self.meshes
            .iter()
            .filter(|mesh| is_floor_mesh(&mesh.name))
            .map(|mesh| mesh.name.clone())
            .collect()
    }

    pub fn register_before_render(&mut self, hook: BeforeRenderHook) {
        self.before_render.push(hook);
    }

    /// Advance the scene by one frame: run the per-frame hooks, step physics
    /// if attached, and bump the frame counter. A disposed scene ignores the
    /// call.
    pub fn render(&mut self) {
        if self.disposed {
            return;
        }
        let mut hooks = std::mem::take(&mut self.before_render);
        for hook in &mut hooks {
            hook(self);
        }
        // Hooks registered during this frame run from the next frame on.
        let mut added = std::mem::replace(&mut self.before_render, hooks);
        self.before_render.append(&mut added);

        if let Some(physics) = self.physics.as_mut() {
            physics.step();
        }
        self.frames_rendered += 1;
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Release everything the scene owns. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.before_render.clear();
        self.meshes.clear();
        self.lights.clear();
        self.cameras.clear();
        self.active_camera = None;
        self.physics = None;
        self.xr_session = None;
        self.disposed = true;
        log::debug!("scene disposed after {} frames", self.frames_rendered);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
