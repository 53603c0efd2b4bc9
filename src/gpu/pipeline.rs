//! Solid-color pipeline and CPU-side mesh tessellation.
//!
//! Placeholder geometry is small enough to retessellate every frame, so the
//! vertex stream is rebuilt from scene data instead of keeping per-mesh GPU
//! buffers. Shading is precomputed per face against the scene's hemispheric
//! light.

use cgmath::{Deg, EuclideanSpace, Euler, InnerSpace, Matrix3, Matrix4, Point3, Rad, Vector3};

use crate::scene::{Light, Mesh, MeshShape, OrbitCamera, Scene};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const FOV_Y: Deg<f32> = Deg(45.0);
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 500.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SolidVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl SolidVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SolidVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, width: u32, height: u32) {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let proj = cgmath::perspective(FOV_Y, aspect, Z_NEAR, Z_FAR);
        let view = Matrix4::look_at_rh(
            camera.eye(),
            Point3::from_vec(camera.target),
            Vector3::unit_y(),
        );
        self.view_proj = (OPENGL_TO_WGPU_MATRIX * proj * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-face lambert term against the first hemispheric light, with an ambient
/// floor so back faces stay visible.
fn shade(base: [f32; 3], normal: Vector3<f32>, light: Option<&Light>) -> [f32; 3] {
    let factor = match light {
        Some(light) => {
            let direction = light.direction.normalize();
            let lambert = normal.normalize().dot(direction).max(0.0);
            (0.35 + 0.65 * lambert * light.intensity).min(1.0)
        }
        None => 1.0,
    };
    [base[0] * factor, base[1] * factor, base[2] * factor]
}

fn push_quad(
    out: &mut Vec<SolidVertex>,
    corners: [Vector3<f32>; 4],
    normal: Vector3<f32>,
    base: [f32; 3],
    light: Option<&Light>,
) {
    let color = shade(base, normal, light);
    for index in [0, 1, 2, 0, 2, 3] {
        out.push(SolidVertex {
            position: corners[index].into(),
            color,
        });
    }
}

fn push_ground(out: &mut Vec<SolidVertex>, mesh: &Mesh, width: f32, depth: f32, light: Option<&Light>) {
    let half_w = width / 2.0;
    let half_d = depth / 2.0;
    let p = mesh.position;
    push_quad(
        out,
        [
            p + Vector3::new(-half_w, 0.0, -half_d),
            p + Vector3::new(-half_w, 0.0, half_d),
            p + Vector3::new(half_w, 0.0, half_d),
            p + Vector3::new(half_w, 0.0, -half_d),
        ],
        Vector3::unit_y(),
        mesh.material.diffuse_color,
        light,
    );
}

fn push_box(out: &mut Vec<SolidVertex>, mesh: &Mesh, size: f32, light: Option<&Light>) {
    let rotation = Matrix3::from(Euler::new(
        Rad(mesh.rotation.x),
        Rad(mesh.rotation.y),
        Rad(mesh.rotation.z),
    ));
    let half = size / 2.0;
    // Each face as (normal, four corners ccw when seen from outside).
    let faces: [(Vector3<f32>, [Vector3<f32>; 4]); 6] = [
        (
            Vector3::unit_y(),
            [
                Vector3::new(-half, half, -half),
                Vector3::new(-half, half, half),
                Vector3::new(half, half, half),
                Vector3::new(half, half, -half),
            ],
        ),
        (
            -Vector3::unit_y(),
            [
                Vector3::new(-half, -half, half),
                Vector3::new(-half, -half, -half),
                Vector3::new(half, -half, -half),
                Vector3::new(half, -half, half),
            ],
        ),
        (
            Vector3::unit_z(),
            [
                Vector3::new(-half, -half, half),
                Vector3::new(half, -half, half),
                Vector3::new(half, half, half),
                Vector3::new(-half, half, half),
            ],
        ),
        (
            -Vector3::unit_z(),
            [
                Vector3::new(half, -half, -half),
                Vector3::new(-half, -half, -half),
                Vector3::new(-half, half, -half),
                Vector3::new(half, half, -half),
            ],
        ),
        (
            Vector3::unit_x(),
            [
                Vector3::new(half, -half, half),
                Vector3::new(half, -half, -half),
                Vector3::new(half, half, -half),
                Vector3::new(half, half, half),
            ],
        ),
        (
            -Vector3::unit_x(),
            [
                Vector3::new(-half, -half, -half),
                Vector3::new(-half, -half, half),
                Vector3::new(-half, half, half),
                Vector3::new(-half, half, -half),
            ],
        ),
    ];
    for (normal, corners) in faces {
        let corners = corners.map(|corner| mesh.position + rotation * corner);
        push_quad(out, corners, rotation * normal, mesh.material.diffuse_color, light);
    }
}

/// Flatten the scene's meshes into one triangle-list vertex stream.
// TODO: sample diffuse textures in the pipeline instead of flattening
// everything to the material's solid color.
pub fn tessellate(scene: &Scene) -> Vec<SolidVertex> {
    let light = scene.lights().first();
    let mut out = Vec::with_capacity(scene.meshes().len() * 36);
    for mesh in scene.meshes() {
        match mesh.shape {
            MeshShape::Ground { width, depth } => push_ground(&mut out, mesh, width, depth, light),
            MeshShape::Box { size } => push_box(&mut out, mesh, size, light),
        }
    }
    out
}

pub fn mk_solid_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Solid Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Solid Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Solid Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[SolidVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.format,
                blend: Some(wgpu::BlendState {
                    alpha: wgpu::BlendComponent::REPLACE,
                    color: wgpu::BlendComponent::REPLACE,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // The ground plane is viewed from both sides.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
