//! Placeholder scene content.
//!
//! Everything here is stand-in content, not part of the lifecycle contract:
//! an orbit camera, a hemispheric light, a ground plane and a spinning
//! textured box. The box texture degrades to a solid color when the asset is
//! missing.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

use cgmath::Vector3;

use crate::error::ViewerError;
use crate::scene::{Light, Material, Mesh, OrbitCamera, Scene, TextureData};

/// Spin applied to the placeholder box each frame. Accumulates without bound.
pub const BOX_SPIN_RADIANS_PER_FRAME: f32 = 0.01;

/// Ground plane edge length in meters.
pub const GROUND_SIZE: f32 = 10.0;

/// Placeholder box edge length in meters.
pub const BOX_SIZE: f32 = 2.0;

const BOX_TEXTURE: &str = "amiga.jpg";

/// Build the default content set into an empty scene: camera (attached to
/// controls and made active), light, ground, box and the spin hook.
pub fn populate(scene: &mut Scene) {
    let mut camera = OrbitCamera::new(
        "camera",
        -FRAC_PI_2,
        FRAC_PI_3,
        10.0,
        Vector3::new(0.0, 1.0, 0.0),
    );
    camera.attach_control();
    let index = scene.add_camera(camera);
    scene.set_active_camera(index);

    scene.add_light(Light::hemispheric("light", Vector3::unit_y(), 0.7));

    scene.add_mesh(Mesh::ground(
        "ground",
        GROUND_SIZE,
        GROUND_SIZE,
        Material::solid("groundMaterial", [0.3, 0.3, 0.4]),
    ));

    let mut box_material = Material::solid("boxMaterial", [0.8, 0.4, 0.2]);
    match load_diffuse_texture(BOX_TEXTURE) {
        Ok(texture) => box_material.diffuse_texture = Some(texture),
        Err(e) => log::warn!("failed to load box texture, using solid color: {e}"),
    }
    let mut cube = Mesh::cube("box", BOX_SIZE, box_material);
    cube.position.y = 1.0;
    scene.add_mesh(cube);

    scene.register_before_render(Box::new(|scene| {
        if let Some(mesh) = scene.mesh_mut("box") {
            mesh.rotation.y += BOX_SPIN_RADIANS_PER_FRAME;
        }
    }));

    log::info!(
        "scene populated: {} meshes, {} lights",
        scene.meshes().len(),
        scene.lights().len()
    );
}

/// Load a diffuse texture from the bundled `assets/` directory.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_diffuse_texture(file_name: &str) -> Result<TextureData, ViewerError> {
    let path = std::path::Path::new("./").join("assets").join(file_name);
    let bytes = std::fs::read(&path)
        .map_err(|e| ViewerError::TextureLoadFailed(format!("{}: {e}", path.display())))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| ViewerError::TextureLoadFailed(format!("{file_name}: {e}")))?;
    Ok(TextureData {
        name: file_name.to_string(),
        image,
    })
}

/// Scene population is synchronous, so on wasm the texture always takes the
/// solid-color fallback; fetching assets over HTTP would suspend.
#[cfg(target_arch = "wasm32")]
pub fn load_diffuse_texture(file_name: &str) -> Result<TextureData, ViewerError> {
    Err(ViewerError::TextureLoadFailed(format!(
        "{file_name}: synchronous asset loading is unavailable on wasm"
    )))
}
