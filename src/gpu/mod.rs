//! wgpu-backed render engine.
//!
//! Owns the GPU handles (instance, surface, device, queue), the swapchain
//! configuration and one solid-color pipeline. Construction is the only
//! fatal step of a mount: every failure here maps to
//! [`ViewerError::BackendUnavailable`]. After construction the engine only
//! logs and recovers.

pub mod pipeline;

use std::any::Any;
use std::sync::{Arc, Mutex};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::engine::{EngineConfig, FrameCallback, PowerPreference, RenderEngine};
use crate::error::ViewerError;
use crate::scene::Scene;

use pipeline::{CameraUniform, SolidVertex};

/// Depth buffer sized to the swapchain, recreated on every resize.
struct DepthTexture {
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn create(device: &wgpu::Device, size: [u32; 2], format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[format],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view }
    }
}

/// Backing resolution for the swapchain. `adapt_to_device_ratio` keeps the
/// physical pixel size; otherwise the logical size is used and the compositor
/// scales up.
fn backing_resolution(window: &Window, config: &EngineConfig) -> (u32, u32) {
    let size = window.inner_size();
    if config.adapt_to_device_ratio {
        (size.width, size.height)
    } else {
        let logical = size.to_logical::<f64>(window.scale_factor());
        (logical.width.round() as u32, logical.height.round() as u32)
    }
}

pub struct WgpuEngine {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    engine_config: EngineConfig,
    depth_format: wgpu::TextureFormat,
    depth_texture: DepthTexture,
    pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    scene: Option<Arc<Mutex<Scene>>>,
    frame_callback: Option<FrameCallback>,
    loop_running: bool,
    disposed: bool,
    last_frame: instant::Instant,
    frame_count: u64,
}

impl WgpuEngine {
    pub async fn new(window: Arc<Window>, config: &EngineConfig) -> Result<Self, ViewerError> {
        let size = backing_resolution(&window, config);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: if config.force_legacy_backend {
                wgpu::Backends::GL
            } else {
                wgpu::Backends::PRIMARY
            },
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| ViewerError::BackendUnavailable(format!("surface creation: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: match config.power_preference {
                    PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
                    PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
                },
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::BackendUnavailable(format!("no adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);
        if config.fail_on_software_fallback && info.device_type == wgpu::DeviceType::Cpu {
            return Err(ViewerError::BackendUnavailable(
                "only a software rasterizer is available".into(),
            ));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::BackendUnavailable(format!("no device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader assumes an sRGB swapchain.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_format = if config.stencil {
            wgpu::TextureFormat::Depth24PlusStencil8
        } else {
            wgpu::TextureFormat::Depth32Float
        };
        let depth_texture =
            DepthTexture::create(&device, [surface_config.width, surface_config.height], depth_format);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let pipeline = pipeline::mk_solid_pipeline(
            &device,
            &surface_config,
            &camera_bind_group_layout,
            depth_format,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config: surface_config,
            engine_config: config.clone(),
            depth_format,
            depth_texture,
            pipeline,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            vertex_buffer: None,
            vertex_capacity: 0,
            scene: None,
            frame_callback: None,
            loop_running: false,
            disposed: false,
            last_frame: instant::Instant::now(),
            frame_count: 0,
        })
    }

    /// Point the engine at the scene it draws each frame.
    pub fn bind_scene(&mut self, scene: Arc<Mutex<Scene>>) {
        self.scene = Some(scene);
    }

    fn upload_vertices(&mut self, vertices: &[SolidVertex]) {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        match &self.vertex_buffer {
            Some(buffer) if vertices.len() <= self.vertex_capacity => {
                self.queue.write_buffer(buffer, 0, bytes);
            }
            _ => {
                self.vertex_buffer = Some(self.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Scene Vertex Buffer"),
                        contents: bytes,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
                self.vertex_capacity = vertices.len();
            }
        }
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(scene) = self.scene.clone() else {
            return Ok(());
        };
        let (vertices, camera) = {
            let scene = match scene.lock() {
                Ok(scene) => scene,
                Err(_) => return Ok(()),
            };
            if scene.is_disposed() {
                return Ok(());
            }
            (pipeline::tessellate(&scene), scene.active_camera().cloned())
        };
        if let Some(camera) = camera {
            self.camera_uniform
                .update_view_proj(&camera, self.config.width, self.config.height);
            self.queue.write_buffer(
                &self.camera_buffer,
                0,
                bytemuck::cast_slice(&[self.camera_uniform]),
            );
        }
        self.upload_vertices(&vertices);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Solid Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.06,
                            b: 0.09,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: if self.engine_config.stencil {
                        Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(0),
                            store: wgpu::StoreOp::Store,
                        })
                    } else {
                        None
                    },
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(buffer) = &self.vertex_buffer {
                if !vertices.is_empty() {
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &self.camera_bind_group, &[]);
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..vertices.len() as u32, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl RenderEngine for WgpuEngine {
    fn resize(&mut self) {
        let (width, height) = backing_resolution(&self.window, &self.engine_config);
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthTexture::create(&self.device, [width, height], self.depth_format);
        log::debug!("swapchain resized to {width}x{height}");
    }

    fn run_render_loop(&mut self, callback: FrameCallback) {
        self.frame_callback = Some(callback);
        self.loop_running = true;
        self.window.request_redraw();
        log::info!("render loop started");
    }

    fn render_loop_running(&self) -> bool {
        self.loop_running && !self.disposed
    }

    fn step_frame(&mut self) {
        if self.disposed || !self.loop_running {
            return;
        }
        // Next frame is requested up front, like the swapchain present model
        // expects.
        self.window.request_redraw();
        let dt = self.last_frame.elapsed();
        self.last_frame = instant::Instant::now();
        self.frame_count += 1;
        if self.frame_count % 300 == 0 {
            log::debug!("frame {} ({} ms)", self.frame_count, dt.as_millis());
        }
        if let Some(callback) = self.frame_callback.as_mut() {
            callback();
        }
        match self.draw() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.resize(),
            Err(e) => log::error!("unable to render: {e}"),
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.loop_running = false;
        self.frame_callback = None;
        self.scene = None;
        self.vertex_buffer = None;
        self.vertex_capacity = 0;
        self.disposed = true;
        log::debug!("render engine disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
