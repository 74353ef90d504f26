use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::mesh::{position_vertex_layout, scene_vertex_layout};
use super::texture::DepthBuffer;
use crate::assets::AssetError;
use crate::lights::LightsUniform;

/// Embedded copies of the shipped WGSL sources, used when the on-disk
/// shader file cannot be read.
pub const LIT_SHADER: &str = include_str!("../../assets/shaders/lit.wgsl");
pub const SKYBOX_SHADER: &str = include_str!("../../assets/shaders/skybox.wgsl");
pub const REFLECTIVE_SHADER: &str = include_str!("../../assets/shaders/reflective.wgsl");
pub const MARKER_SHADER: &str = include_str!("../../assets/shaders/marker.wgsl");

/// Compiles a WGSL module, surfacing validation diagnostics as a typed
/// error instead of an uncaptured device error.
///
/// Callers treat a failure as "the pipeline is absent": render paths check
/// for the pipeline before drawing and skip the draw when it never built.
pub fn create_validated_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, AssetError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(module),
        Some(err) => Err(AssetError::ShaderValidation {
            label: label.to_string(),
            message: err.to_string(),
        }),
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
}

impl GlobalUniform {
    pub fn new(view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.extend(1.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl ObjectUniform {
    pub fn new(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SkyUniform {
    pub pvm: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ReflectiveUniform {
    pub pvm: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MarkerUniform {
    pub pvm: [[f32; 4]; 4],
    pub color: [f32; 4],
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn cubemap_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Creates a texture+sampler bind group against `layout`.
pub fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

struct PipelineSettings<'a> {
    label: &'a str,
    vertex_layout: wgpu::VertexBufferLayout<'a>,
    depth_compare: wgpu::CompareFunction,
    depth_write_enabled: bool,
    polygon_mode: wgpu::PolygonMode,
}

fn build_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
    layouts: &[&wgpu::BindGroupLayout],
    settings: PipelineSettings<'_>,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(settings.label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(settings.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[settings.vertex_layout],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: settings.polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: settings.depth_write_enabled,
            depth_compare: settings.depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

/// Blinn-Phong pipeline for the opaque sphere instances, with an optional
/// wireframe twin when the adapter supports line polygon mode.
pub struct LitPipeline {
    fill: wgpu::RenderPipeline,
    line: Option<wgpu::RenderPipeline>,
    global_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    pub global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl LitPipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        shader: &wgpu::ShaderModule,
        wireframe_supported: bool,
    ) -> Self {
        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lit-global-layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lit-object-layout"),
            entries: &[uniform_entry(0)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lit-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layouts = [&global_layout, &object_layout, &texture_layout];
        let fill = build_pipeline(
            device,
            format,
            shader,
            &layouts,
            PipelineSettings {
                label: "lit-pipeline",
                vertex_layout: scene_vertex_layout(),
                depth_compare: wgpu::CompareFunction::Less,
                depth_write_enabled: true,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        );
        let line = wireframe_supported.then(|| {
            build_pipeline(
                device,
                format,
                shader,
                &layouts,
                PipelineSettings {
                    label: "lit-pipeline-wireframe",
                    vertex_layout: scene_vertex_layout(),
                    depth_compare: wgpu::CompareFunction::Less,
                    depth_write_enabled: true,
                    polygon_mode: wgpu::PolygonMode::Line,
                },
            )
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lit-global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lit-lights-uniform"),
            size: std::mem::size_of::<LightsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-global-bind-group"),
            layout: &global_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: global_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            fill,
            line,
            global_buffer,
            lights_buffer,
            global_bind_group,
            object_layout,
            texture_layout,
        }
    }

    /// Picks the wireframe twin when requested and available; falls back to
    /// the filled pipeline otherwise.
    pub fn pipeline(&self, wireframe: bool) -> &wgpu::RenderPipeline {
        if wireframe {
            self.line.as_ref().unwrap_or(&self.fill)
        } else {
            &self.fill
        }
    }

    pub fn has_wireframe(&self) -> bool {
        self.line.is_some()
    }

    pub fn update_globals(&self, queue: &wgpu::Queue, globals: &GlobalUniform) {
        queue.write_buffer(&self.global_buffer, 0, bytes_of(globals));
    }

    pub fn update_lights(&self, queue: &wgpu::Queue, lights: &LightsUniform) {
        queue.write_buffer(&self.lights_buffer, 0, bytes_of(lights));
    }

    /// Per-instance uniform buffer and bind group, created fresh each frame.
    pub fn create_object_bind_group(
        &self,
        device: &wgpu::Device,
        object: &ObjectUniform,
    ) -> wgpu::BindGroup {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lit-object-uniform"),
            contents: bytes_of(object),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}

/// Background pipeline: depth compare relaxed to less-or-equal and depth
/// writes off, so the box at maximum depth never occludes the scene and is
/// never clipped by the far plane.
pub struct SkyboxPipeline {
    pub pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    pub cubemap_layout: wgpu::BindGroupLayout,
}

impl SkyboxPipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        shader: &wgpu::ShaderModule,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox-uniform-layout"),
            entries: &[uniform_entry(0)],
        });
        let cubemap = cubemap_layout(device, "skybox-cubemap-layout");
        let pipeline = build_pipeline(
            device,
            format,
            shader,
            &[&uniform_layout, &cubemap],
            PipelineSettings {
                label: "skybox-pipeline",
                vertex_layout: position_vertex_layout(),
                depth_compare: wgpu::CompareFunction::LessEqual,
                depth_write_enabled: false,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skybox-uniform"),
            size: std::mem::size_of::<SkyUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-uniform-bind-group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            cubemap_layout: cubemap,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: &SkyUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(uniform));
    }
}

/// Mirror-sphere pipeline: samples the skybox cubemap through a reflection
/// vector, with the same relaxed depth compare so it composes against the
/// background at the far plane.
pub struct ReflectivePipeline {
    pub pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    pub cubemap_layout: wgpu::BindGroupLayout,
}

impl ReflectivePipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        shader: &wgpu::ShaderModule,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reflective-uniform-layout"),
            entries: &[uniform_entry(0)],
        });
        let cubemap = cubemap_layout(device, "reflective-cubemap-layout");
        let pipeline = build_pipeline(
            device,
            format,
            shader,
            &[&uniform_layout, &cubemap],
            PipelineSettings {
                label: "reflective-pipeline",
                vertex_layout: scene_vertex_layout(),
                depth_compare: wgpu::CompareFunction::LessEqual,
                depth_write_enabled: true,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reflective-uniform"),
            size: std::mem::size_of::<ReflectiveUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reflective-uniform-bind-group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            cubemap_layout: cubemap,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: &ReflectiveUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytes_of(uniform));
    }
}

/// Flat-color pipeline for the point-light marker spheres.
pub struct MarkerPipeline {
    pub pipeline: wgpu::RenderPipeline,
    object_layout: wgpu::BindGroupLayout,
}

impl MarkerPipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        shader: &wgpu::ShaderModule,
    ) -> Self {
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marker-object-layout"),
            entries: &[uniform_entry(0)],
        });
        let pipeline = build_pipeline(
            device,
            format,
            shader,
            &[&object_layout],
            PipelineSettings {
                label: "marker-pipeline",
                vertex_layout: scene_vertex_layout(),
                depth_compare: wgpu::CompareFunction::Less,
                depth_write_enabled: true,
                polygon_mode: wgpu::PolygonMode::Fill,
            },
        );
        Self {
            pipeline,
            object_layout,
        }
    }

    pub fn create_marker_bind_group(
        &self,
        device: &wgpu::Device,
        marker: &MarkerUniform,
    ) -> wgpu::BindGroup {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker-uniform"),
            contents: bytes_of(marker),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marker-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}
