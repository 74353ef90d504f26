//! wgpu renderer: owns the surface, device, pipelines, and GPU resources,
//! and encodes one render pass per frame in the fixed scene order
//! (clear, skybox, opaque sphere instances, reflective instance, light
//! markers).

pub mod mesh;
pub mod pipeline;
pub mod texture;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use log::{error, warn};
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::assets;
use crate::lights::LightsUniform;
use crate::skybox;
use crate::sphere::SphereGeometry;
use mesh::MeshBuffers;
use pipeline::{
    create_validated_shader, GlobalUniform, LitPipeline, MarkerPipeline, MarkerUniform,
    ObjectUniform, ReflectivePipeline, ReflectiveUniform, SkyUniform, SkyboxPipeline,
};
use texture::{CubemapTexture, DepthBuffer, Texture2D};

/// Scale applied to the shared sphere mesh when drawing light markers.
const MARKER_SCALE: f32 = 0.5;

/// One frame's worth of scene state, assembled by the frame driver.
pub struct FrameState {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub lights: LightsUniform,
    pub skybox_pvm: Mat4,
    pub instance_models: Vec<Mat4>,
    pub reflective_model: Mat4,
    pub markers: Vec<MarkerInstance>,
    pub wireframe: bool,
}

/// A point-light marker: a small flat-colored sphere at the light position.
pub struct MarkerInstance {
    pub position: Vec3,
    pub color: Vec3,
}

/// GPU renderer backed by wgpu that draws the sphere field scene.
///
/// Pipelines whose shaders failed validation are simply absent; the
/// corresponding draws are skipped, with the failure reported once at
/// construction time.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    lit: Option<LitPipeline>,
    skybox_pipeline: Option<SkyboxPipeline>,
    reflective: Option<ReflectivePipeline>,
    marker: Option<MarkerPipeline>,
    sphere_mesh: MeshBuffers,
    cube_mesh: MeshBuffers,
    sphere_texture_bind_group: Option<wgpu::BindGroup>,
    skybox_cubemap_bind_group: Option<wgpu::BindGroup>,
    reflective_cubemap_bind_group: Option<wgpu::BindGroup>,
}

impl Renderer {
    /// Initializes the GPU renderer for the provided window, loading the
    /// shader sources and texture assets from `assets_dir`.
    pub async fn new(
        window: Arc<Window>,
        assets_dir: &Path,
        geometry: &SphereGeometry,
    ) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        // Line polygon mode backs the wireframe toggle; without it the
        // toggle stays inert.
        let wireframe_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        if !wireframe_supported {
            warn!("adapter does not support line polygon mode; wireframe toggle disabled");
        }
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("renderer-device"),
            required_features,
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let sphere_mesh = MeshBuffers::new(&device, &geometry.vertices, &geometry.indices, "sphere");
        let cube_mesh = MeshBuffers::new(
            &device,
            &skybox::CUBE_VERTICES,
            &skybox::CUBE_INDICES,
            "skybox-cube",
        );

        let shader_dir = assets_dir.join("shaders");
        let lit = load_pipeline(&device, &shader_dir, "lit.wgsl", pipeline::LIT_SHADER, |m| {
            LitPipeline::new(&device, surface_format, m, wireframe_supported)
        });
        let skybox_pipeline = load_pipeline(
            &device,
            &shader_dir,
            "skybox.wgsl",
            pipeline::SKYBOX_SHADER,
            |m| SkyboxPipeline::new(&device, surface_format, m),
        );
        let reflective = load_pipeline(
            &device,
            &shader_dir,
            "reflective.wgsl",
            pipeline::REFLECTIVE_SHADER,
            |m| ReflectivePipeline::new(&device, surface_format, m),
        );
        let marker = load_pipeline(
            &device,
            &shader_dir,
            "marker.wgsl",
            pipeline::MARKER_SHADER,
            |m| MarkerPipeline::new(&device, surface_format, m),
        );

        let base_image =
            assets::load_image_or_fallback(&assets_dir.join("textures").join("sphere.jpg"));
        let base_texture = Texture2D::from_image(&device, &queue, &base_image, "sphere-base");
        let cubemap_faces = assets::load_cubemap_faces(&skybox::face_paths(assets_dir));
        let cubemap = CubemapTexture::from_faces(&device, &queue, &cubemap_faces, "skybox-cubemap");

        let sphere_texture_bind_group = lit.as_ref().map(|p| {
            pipeline::texture_bind_group(
                &device,
                &p.texture_layout,
                &base_texture.view,
                &base_texture.sampler,
                "sphere-texture-bind-group",
            )
        });
        let skybox_cubemap_bind_group = skybox_pipeline.as_ref().map(|p| {
            pipeline::texture_bind_group(
                &device,
                &p.cubemap_layout,
                &cubemap.view,
                &cubemap.sampler,
                "skybox-cubemap-bind-group",
            )
        });
        let reflective_cubemap_bind_group = reflective.as_ref().map(|p| {
            pipeline::texture_bind_group(
                &device,
                &p.cubemap_layout,
                &cubemap.view,
                &cubemap.sampler,
                "reflective-cubemap-bind-group",
            )
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            lit,
            skybox_pipeline,
            reflective,
            marker,
            sphere_mesh,
            cube_mesh,
            sphere_texture_bind_group,
            skybox_cubemap_bind_group,
            reflective_cubemap_bind_group,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn wireframe_supported(&self) -> bool {
        self.lit.as_ref().is_some_and(LitPipeline::has_wireframe)
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Encodes and presents one frame.
    pub fn render(&mut self, frame: &FrameState) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(lit) = &self.lit {
            lit.update_globals(
                &self.queue,
                &GlobalUniform::new(frame.view_proj, frame.camera_position),
            );
            lit.update_lights(&self.queue, &frame.lights);
        }
        if let Some(skybox) = &self.skybox_pipeline {
            skybox.update(
                &self.queue,
                &SkyUniform {
                    pvm: frame.skybox_pvm.to_cols_array_2d(),
                },
            );
        }
        if let Some(reflective) = &self.reflective {
            reflective.update(
                &self.queue,
                &ReflectiveUniform {
                    pvm: (frame.view_proj * frame.reflective_model).to_cols_array_2d(),
                    model: frame.reflective_model.to_cols_array_2d(),
                    camera_position: frame.camera_position.extend(1.0).into(),
                },
            );
        }

        // Per-instance bind groups are rebuilt every frame; the shared mesh
        // is redrawn once per accepted position.
        let instance_bind_groups: Vec<wgpu::BindGroup> = match &self.lit {
            Some(lit) => frame
                .instance_models
                .iter()
                .map(|model| lit.create_object_bind_group(&self.device, &ObjectUniform::new(*model)))
                .collect(),
            None => Vec::new(),
        };
        let marker_bind_groups: Vec<wgpu::BindGroup> = match &self.marker {
            Some(marker) => frame
                .markers
                .iter()
                .map(|instance| {
                    let model = Mat4::from_translation(instance.position)
                        * Mat4::from_scale(Vec3::splat(MARKER_SCALE));
                    marker.create_marker_bind_group(
                        &self.device,
                        &MarkerUniform {
                            pvm: (frame.view_proj * model).to_cols_array_2d(),
                            color: instance.color.extend(1.0).into(),
                        },
                    )
                })
                .collect(),
            None => Vec::new(),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("renderer-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(skybox), Some(cubemap)) =
                (&self.skybox_pipeline, &self.skybox_cubemap_bind_group)
            {
                pass.set_pipeline(&skybox.pipeline);
                pass.set_bind_group(0, &skybox.uniform_bind_group, &[]);
                pass.set_bind_group(1, cubemap, &[]);
                self.cube_mesh.draw(&mut pass);
            }

            if let (Some(lit), Some(texture)) = (&self.lit, &self.sphere_texture_bind_group) {
                pass.set_pipeline(lit.pipeline(frame.wireframe));
                pass.set_bind_group(0, &lit.global_bind_group, &[]);
                pass.set_bind_group(2, texture, &[]);
                for bind_group in &instance_bind_groups {
                    pass.set_bind_group(1, bind_group, &[]);
                    self.sphere_mesh.draw(&mut pass);
                }
            }

            if let (Some(reflective), Some(cubemap)) =
                (&self.reflective, &self.reflective_cubemap_bind_group)
            {
                pass.set_pipeline(&reflective.pipeline);
                pass.set_bind_group(0, &reflective.uniform_bind_group, &[]);
                pass.set_bind_group(1, cubemap, &[]);
                self.sphere_mesh.draw(&mut pass);
            }

            if let Some(marker) = &self.marker {
                pass.set_pipeline(&marker.pipeline);
                for bind_group in &marker_bind_groups {
                    pass.set_bind_group(0, bind_group, &[]);
                    self.sphere_mesh.draw(&mut pass);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Loads one shader (disk source with embedded fallback), validates it, and
/// builds its pipeline. A validation failure leaves the pipeline absent so
/// the corresponding draws are skipped.
fn load_pipeline<P>(
    device: &wgpu::Device,
    shader_dir: &Path,
    file_name: &str,
    embedded: &str,
    build: impl FnOnce(&wgpu::ShaderModule) -> P,
) -> Option<P> {
    let source = assets::load_shader_source(&shader_dir.join(file_name), embedded);
    match create_validated_shader(device, file_name, &source) {
        Ok(module) => Some(build(&module)),
        Err(err) => {
            error!("{err}; draws using this shader will be skipped");
            None
        }
    }
}
