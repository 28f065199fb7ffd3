use crate::capture::{CAPTURE_FORMAT, CubeTarget, face_view_projection};
use crate::mesh::{self, LineVertex, MeshData, Vertex};
use crate::shaders;
use crate::uniforms::{
    CameraUniform, camera_stride, lighting_uniform, object_uniform, shadow_view_projection,
    spot_light,
};
use cubecam_common::Color;
use cubecam_render::FrameBackend;
use cubecam_scene::{
    CaptureId, CapturePoint, Material, ObjectId, PerspectiveCamera, Scene, SceneId, Stage,
};
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{0} was not uploaded to the renderer")]
    UnknownScene(SceneId),
    #[error("{0} has no render target")]
    UnknownCapture(CaptureId),
    #[error("{scene} changed shape: uploaded {expected} objects, found {found}")]
    SceneChanged {
        scene: SceneId,
        expected: usize,
        found: usize,
    },
    #[error("camera slot {slot} lies at byte {offset}, past the 32-bit dynamic offset range")]
    CameraOffset { slot: u32, offset: u64 },
}

struct Layouts {
    camera: wgpu::BindGroupLayout,
    lighting: wgpu::BindGroupLayout,
    object: wgpu::BindGroupLayout,
    env: wgpu::BindGroupLayout,
    composite: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn cube_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::Cube,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: vertex_fragment,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let lighting = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                sampler_entry(2, wgpu::SamplerBindingType::Comparison),
            ],
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_layout"),
            entries: &[uniform_entry(0, vertex_fragment)],
        });
        let env = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("env_layout"),
            entries: &[
                cube_entry(0),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let composite = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_layout"),
            entries: &[
                cube_entry(0),
                cube_entry(1),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
            ],
        });
        Self {
            camera,
            lighting,
            object,
            env,
            composite,
        }
    }
}

#[derive(Clone, Copy)]
struct ColorTarget {
    format: wgpu::TextureFormat,
    samples: u32,
}

struct PipelineDesc<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vertex: &'a str,
    fragment: &'a str,
    buffer: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    /// `None` builds a depth-only pipeline.
    target: Option<ColorTarget>,
    depth_bias: wgpu::DepthBiasState,
}

fn create_pipeline(device: &wgpu::Device, desc: PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let targets = desc.target.map(|t| {
        [Some(wgpu::ColorTargetState {
            format: t.format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })]
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some(desc.vertex),
            compilation_options: Default::default(),
            buffers: &[desc.buffer],
        },
        fragment: targets.as_ref().map(|targets| wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(desc.fragment),
            compilation_options: Default::default(),
            targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: desc.topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: desc.depth_bias,
        }),
        multisample: wgpu::MultisampleState {
            count: desc.target.map_or(1, |t| t.samples),
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

struct Modules {
    mesh: wgpu::ShaderModule,
    lines: wgpu::ShaderModule,
    composite: wgpu::ShaderModule,
    shadow: wgpu::ShaderModule,
}

impl Modules {
    fn new(device: &wgpu::Device) -> Self {
        let module = |label, body| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shaders::program(body).into()),
            })
        };
        Self {
            mesh: module("mesh_shader", shaders::MESH),
            lines: module("lines_shader", shaders::LINES),
            composite: module("composite_shader", shaders::COMPOSITE),
            shadow: module("shadow_shader", shaders::SHADOW),
        }
    }
}

/// Pipelines for one kind of color target (the screen or a cube face).
struct Pipelines {
    mesh: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
}

struct PipelineLayouts {
    mesh: wgpu::PipelineLayout,
    lines: wgpu::PipelineLayout,
    composite: wgpu::PipelineLayout,
    shadow: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    fn new(device: &wgpu::Device, layouts: &Layouts) -> Self {
        let layout = |label, groups: &[&wgpu::BindGroupLayout]| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: groups,
                push_constant_ranges: &[],
            })
        };
        Self {
            mesh: layout(
                "mesh_layout",
                &[&layouts.camera, &layouts.lighting, &layouts.object, &layouts.env],
            ),
            lines: layout("lines_layout", &[&layouts.camera, &layouts.object]),
            composite: layout(
                "composite_layout",
                &[&layouts.camera, &layouts.object, &layouts.composite],
            ),
            shadow: layout("shadow_layout", &[&layouts.camera, &layouts.object]),
        }
    }
}

impl Pipelines {
    fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        modules: &Modules,
        target: ColorTarget,
    ) -> Self {
        let desc = |label, layout, module, vertex, fragment, buffer, topology| PipelineDesc {
            label,
            layout,
            module,
            vertex,
            fragment,
            buffer,
            topology,
            target: Some(target),
            depth_bias: Default::default(),
        };
        let triangles = wgpu::PrimitiveTopology::TriangleList;
        Self {
            mesh: create_pipeline(
                device,
                desc(
                    "mesh_pipeline",
                    &layouts.mesh,
                    &modules.mesh,
                    "vs_main",
                    "fs_main",
                    Vertex::layout(),
                    triangles,
                ),
            ),
            lines: create_pipeline(
                device,
                desc(
                    "lines_pipeline",
                    &layouts.lines,
                    &modules.lines,
                    "vs_lines",
                    "fs_lines",
                    LineVertex::layout(),
                    wgpu::PrimitiveTopology::LineList,
                ),
            ),
            composite: create_pipeline(
                device,
                desc(
                    "composite_pipeline",
                    &layouts.composite,
                    &modules.composite,
                    "vs_quad",
                    "fs_quad",
                    Vertex::layout(),
                    triangles,
                ),
            ),
        }
    }
}

enum DrawKind {
    /// Lit mesh; index into the renderer's env bind groups.
    Lit { env: usize },
    Lines,
    Composite(wgpu::BindGroup),
}

struct GpuObject {
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    kind: DrawKind,
}

struct SceneGpu {
    id: SceneId,
    objects: Vec<GpuObject>,
    lighting: wgpu::Buffer,
    lighting_group: wgpu::BindGroup,
    shadow_view: wgpu::TextureView,
    shadow_slot: u32,
}

fn depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    samples: u32,
    sampled: bool,
) -> wgpu::TextureView {
    let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn msaa_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    samples: u32,
) -> Option<wgpu::TextureView> {
    if samples <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("msaa_color"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&Default::default()))
}

/// Byte offset of camera slot `slot`. Dynamic offsets are 32-bit.
fn dynamic_offset(slot: u32, stride: u64) -> Result<u32, RenderError> {
    let offset = u64::from(slot) * stride;
    u32::try_from(offset).map_err(|_| RenderError::CameraOffset { slot, offset })
}

fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.r),
        g: f64::from(color.g),
        b: f64::from(color.b),
        a: 1.0,
    }
}

/// wgpu renderer for a [`Stage`]: uploads both scenes once, then draws them
/// through [`GpuFrame`].
pub struct WgpuRenderer {
    layouts: Layouts,
    screen: Pipelines,
    offscreen: Pipelines,
    shadow: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_group: wgpu::BindGroup,
    camera_stride: u64,
    /// Index 0 binds an empty cube for objects without an env map; index
    /// `i + 1` binds `targets[i]`.
    env_groups: Vec<wgpu::BindGroup>,
    targets: Vec<CubeTarget>,
    scenes: Vec<SceneGpu>,
    depth: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        width: u32,
        height: u32,
        stage: &Stage,
    ) -> Result<Self, RenderError> {
        let layouts = Layouts::new(device);
        let modules = Modules::new(device);
        let pipeline_layouts = PipelineLayouts::new(device, &layouts);

        let screen = Pipelines::new(
            device,
            &pipeline_layouts,
            &modules,
            ColorTarget {
                format: surface_format,
                samples: sample_count,
            },
        );
        let offscreen = Pipelines::new(
            device,
            &pipeline_layouts,
            &modules,
            ColorTarget {
                format: CAPTURE_FORMAT,
                samples: 1,
            },
        );
        let shadow = create_pipeline(
            device,
            PipelineDesc {
                label: "shadow_pipeline",
                layout: &pipeline_layouts.shadow,
                module: &modules.shadow,
                vertex: "vs_shadow",
                fragment: "",
                buffer: Vertex::layout(),
                topology: wgpu::PrimitiveTopology::TriangleList,
                target: None,
                depth_bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            },
        );

        // Slot 0 is the main camera, then six per capture, then one per scene
        // for its shadow view.
        let captures: Vec<CapturePoint> = stage
            .scenes()
            .iter()
            .flat_map(|scene| scene.captures().iter().copied())
            .collect();
        let targets: Vec<CubeTarget> = captures
            .iter()
            .enumerate()
            .map(|(i, capture)| CubeTarget::new(device, capture, 1 + 6 * i as u32))
            .collect();
        let first_shadow_slot = 1 + 6 * targets.len() as u32;
        let slot_count = u64::from(first_shadow_slot) + stage.scenes().len() as u64;

        let stride = camera_stride(device.limits().min_uniform_buffer_offset_alignment);
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_buffer"),
            size: stride * slot_count,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &camera_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<CameraUniform>() as u64),
                }),
            }],
        });

        let linear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let empty_cube = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("empty_cube"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: CAPTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::Cube),
                ..Default::default()
            });
        let env_group = |view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("env_group"),
                layout: &layouts.env,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&linear),
                    },
                ],
            })
        };
        let env_groups = std::iter::once(env_group(&empty_cube))
            .chain(targets.iter().map(|t| env_group(t.cube_view())))
            .collect();

        let mut renderer = Self {
            screen,
            offscreen,
            shadow,
            camera_buffer,
            camera_group,
            camera_stride: stride,
            env_groups,
            targets,
            scenes: Vec::new(),
            depth: depth_texture(device, "depth_texture", width, height, sample_count, false),
            msaa: msaa_texture(device, surface_format, width, height, sample_count),
            surface_format,
            sample_count,
            layouts,
        };

        for (i, scene) in stage.scenes().into_iter().enumerate() {
            let gpu = renderer.upload_scene(
                device,
                scene,
                first_shadow_slot + i as u32,
                &linear,
                &shadow_sampler,
            )?;
            renderer.scenes.push(gpu);
        }

        tracing::info!(
            captures = renderer.targets.len(),
            samples = sample_count,
            format = ?surface_format,
            "renderer ready"
        );
        Ok(renderer)
    }

    fn target_index(&self, id: CaptureId) -> Result<usize, RenderError> {
        self.targets
            .iter()
            .position(|t| t.id() == id)
            .ok_or(RenderError::UnknownCapture(id))
    }

    fn upload_scene(
        &self,
        device: &wgpu::Device,
        scene: &Scene,
        shadow_slot: u32,
        linear: &wgpu::Sampler,
        shadow_sampler: &wgpu::Sampler,
    ) -> Result<SceneGpu, RenderError> {
        let map_size = spot_light(scene)
            .and_then(|spot| spot.shadow)
            .map_or(1, |shadow| shadow.map_size);
        let shadow_view = depth_texture(device, "shadow_map", map_size, map_size, 1, true);

        let lighting = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lighting_buffer"),
            contents: bytemuck::bytes_of(&lighting_uniform(scene)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lighting_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting_group"),
            layout: &self.layouts.lighting,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lighting.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
            ],
        });

        let mut objects = Vec::with_capacity(scene.object_count());
        for (id, object) in scene.objects() {
            let (vertices, indices, count) = match mesh::build(&object.geometry) {
                MeshData::Triangles { vertices, indices } => {
                    let vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("mesh_vertices"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    if indices.is_empty() {
                        (vb, None, vertices.len() as u32)
                    } else {
                        let ib = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("mesh_indices"),
                            contents: bytemuck::cast_slice(&indices),
                            usage: wgpu::BufferUsages::INDEX,
                        });
                        (vb, Some(ib), indices.len() as u32)
                    }
                }
                MeshData::Lines(lines) => {
                    let vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("line_vertices"),
                        contents: bytemuck::cast_slice(&lines),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    (vb, None, lines.len() as u32)
                }
            };

            let kind = match object.material {
                Material::Lines => DrawKind::Lines,
                Material::Standard { .. } => DrawKind::Lit { env: 0 },
                Material::Lambert { env_map, .. } => DrawKind::Lit {
                    env: match env_map {
                        Some(capture) => self.target_index(capture)? + 1,
                        None => 0,
                    },
                },
                Material::Composite { map1, map2 } => {
                    let map1 = &self.targets[self.target_index(map1)?];
                    let map2 = &self.targets[self.target_index(map2)?];
                    DrawKind::Composite(device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("composite_group"),
                        layout: &self.layouts.composite,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(map1.cube_view()),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::TextureView(map2.cube_view()),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: wgpu::BindingResource::Sampler(linear),
                            },
                        ],
                    }))
                }
            };

            let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object_buffer"),
                contents: bytemuck::bytes_of(&object_uniform(object)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("object_group"),
                layout: &self.layouts.object,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            });
            tracing::debug!(scene = %scene.id(), object = %id, name = %object.name, "uploaded");

            objects.push(GpuObject {
                vertices,
                indices,
                count,
                uniform,
                bind_group,
                kind,
            });
        }

        Ok(SceneGpu {
            id: scene.id(),
            objects,
            lighting,
            lighting_group,
            shadow_view,
            shadow_slot,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = depth_texture(
            device,
            "depth_texture",
            width,
            height,
            self.sample_count,
            false,
        );
        self.msaa = msaa_texture(device, self.surface_format, width, height, self.sample_count);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Borrow the renderer for one frame's worth of passes recorded into
    /// `encoder`, with `target` as the screen image.
    pub fn frame<'a>(
        &'a self,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        target: &'a wgpu::TextureView,
    ) -> GpuFrame<'a> {
        GpuFrame {
            renderer: self,
            queue,
            encoder,
            target,
        }
    }

    fn scene_gpu(&self, scene: &Scene) -> Result<&SceneGpu, RenderError> {
        let gpu = self
            .scenes
            .iter()
            .find(|s| s.id == scene.id())
            .ok_or(RenderError::UnknownScene(scene.id()))?;
        if gpu.objects.len() != scene.object_count() {
            return Err(RenderError::SceneChanged {
                scene: scene.id(),
                expected: gpu.objects.len(),
                found: scene.object_count(),
            });
        }
        Ok(gpu)
    }

    /// Write `uniform` into camera slot `slot` and return its dynamic offset.
    fn write_camera(
        &self,
        queue: &wgpu::Queue,
        slot: u32,
        uniform: &CameraUniform,
    ) -> Result<u32, RenderError> {
        let offset = dynamic_offset(slot, self.camera_stride)?;
        queue.write_buffer(&self.camera_buffer, u64::from(offset), bytemuck::bytes_of(uniform));
        Ok(offset)
    }

    /// Refresh per-object and lighting uniforms from the scene's current state.
    fn write_scene(&self, queue: &wgpu::Queue, scene: &Scene, gpu: &SceneGpu) {
        queue.write_buffer(&gpu.lighting, 0, bytemuck::bytes_of(&lighting_uniform(scene)));
        for ((_, object), obj) in scene.objects().zip(&gpu.objects) {
            queue.write_buffer(&obj.uniform, 0, bytemuck::bytes_of(&object_uniform(object)));
        }
    }

    fn shadow_pass(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        gpu: &SceneGpu,
    ) -> Result<(), RenderError> {
        let Some((spot, shadow)) =
            spot_light(scene).and_then(|spot| spot.shadow.map(|shadow| (spot, shadow)))
        else {
            return Ok(());
        };
        let view_proj = shadow_view_projection(spot, &shadow);
        let offset = self.write_camera(
            queue,
            gpu.shadow_slot,
            &CameraUniform::new(view_proj, spot.position, false),
        )?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow_pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gpu.shadow_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_pipeline(&self.shadow);
        pass.set_bind_group(0, &self.camera_group, &[offset]);
        for ((_, object), obj) in scene.objects().zip(&gpu.objects) {
            if !object.visible || !object.cast_shadow || object.geometry.is_lines() {
                continue;
            }
            pass.set_bind_group(1, &obj.bind_group, &[]);
            draw_mesh(&mut pass, obj);
        }
        Ok(())
    }

    /// Draw the scene's visible objects into an open pass, in [`draw_order`].
    fn draw_objects(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &Pipelines,
        scene: &Scene,
        gpu: &SceneGpu,
        camera_offset: u32,
        skip: Option<CaptureId>,
    ) {
        for id in draw_order(scene, skip) {
            let Some(obj) = gpu.objects.get(id.0) else {
                continue;
            };
            pass.set_bind_group(0, &self.camera_group, &[camera_offset]);
            match &obj.kind {
                DrawKind::Lit { env } => {
                    pass.set_pipeline(&pipelines.mesh);
                    pass.set_bind_group(1, &gpu.lighting_group, &[]);
                    pass.set_bind_group(2, &obj.bind_group, &[]);
                    pass.set_bind_group(3, &self.env_groups[*env], &[]);
                }
                DrawKind::Lines => {
                    pass.set_pipeline(&pipelines.lines);
                    pass.set_bind_group(1, &obj.bind_group, &[]);
                }
                DrawKind::Composite(maps) => {
                    pass.set_pipeline(&pipelines.composite);
                    pass.set_bind_group(1, &obj.bind_group, &[]);
                    pass.set_bind_group(2, maps, &[]);
                }
            }
            draw_mesh(pass, obj);
        }
    }
}

/// Visible objects in draw order: opaque ones first, then transparent ones,
/// each group in scene order. Objects that sample `skip` are left out.
fn draw_order(scene: &Scene, skip: Option<CaptureId>) -> Vec<ObjectId> {
    let (opaque, transparent): (Vec<_>, Vec<_>) = scene
        .objects()
        .filter(|(_, object)| object.visible && !skip.is_some_and(|c| object.material.samples(c)))
        .partition(|(_, object)| !object.material.is_transparent());
    opaque
        .into_iter()
        .chain(transparent)
        .map(|(id, _)| id)
        .collect()
}

fn draw_mesh(pass: &mut wgpu::RenderPass<'_>, obj: &GpuObject) {
    pass.set_vertex_buffer(0, obj.vertices.slice(..));
    match &obj.indices {
        Some(indices) => {
            pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..obj.count, 0, 0..1);
        }
        None => pass.draw(0..obj.count, 0..1),
    }
}

/// One frame of GPU work. Each backend call records its passes into the
/// shared encoder; nothing reaches the GPU until the caller submits it.
pub struct GpuFrame<'a> {
    renderer: &'a WgpuRenderer,
    queue: &'a wgpu::Queue,
    encoder: &'a mut wgpu::CommandEncoder,
    target: &'a wgpu::TextureView,
}

impl FrameBackend for GpuFrame<'_> {
    type Error = RenderError;

    fn update_capture(&mut self, scene: &Scene, capture: &CapturePoint) -> Result<(), RenderError> {
        let r = self.renderer;
        let gpu = r.scene_gpu(scene)?;
        let cube = &r.targets[r.target_index(capture.id)?];

        r.write_scene(self.queue, scene, gpu);
        r.shadow_pass(self.queue, self.encoder, scene, gpu)?;

        for face in 0..6 {
            let view_proj = face_view_projection(capture.position, face, capture.near, capture.far);
            let offset = r.write_camera(
                self.queue,
                cube.slot(face),
                &CameraUniform::new(view_proj, capture.position, false),
            )?;
            let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("capture_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: cube.face_view(face),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.background())),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: cube.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            r.draw_objects(&mut pass, &r.offscreen, scene, gpu, offset, Some(capture.id));
        }
        Ok(())
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        let r = self.renderer;
        let gpu = r.scene_gpu(scene)?;

        r.write_scene(self.queue, scene, gpu);
        r.shadow_pass(self.queue, self.encoder, scene, gpu)?;

        let offset = r.write_camera(
            self.queue,
            0,
            &CameraUniform::new(camera.view_projection(), camera.position, true),
        )?;
        let (view, resolve_target) = match &r.msaa {
            Some(msaa) => (msaa, Some(self.target)),
            None => (self.target, None),
        };
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(scene.background())),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &r.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        r.draw_objects(&mut pass, &r.screen, scene, gpu, offset, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubecam_render::RenderLoop;
    use cubecam_scene::builder::{PRIMARY_CAPTURE, SECONDARY_CAPTURE};
    use cubecam_scene::{Config, build_stage};
    use std::time::Instant;

    #[test]
    fn clear_color_is_opaque_linear() {
        let c = clear_color(Color::rgb(0.25, 0.5, 1.0));
        assert_eq!((c.r, c.g, c.b, c.a), (0.25, 0.5, 1.0, 1.0));
    }

    #[test]
    fn errors_name_the_scene() {
        let err = RenderError::SceneChanged {
            scene: SceneId(2),
            expected: 4,
            found: 5,
        };
        assert_eq!(
            err.to_string(),
            "scene#2 changed shape: uploaded 4 objects, found 5"
        );
        assert_eq!(
            RenderError::UnknownCapture(CaptureId(3)).to_string(),
            "capture#3 has no render target"
        );
    }

    #[test]
    fn camera_offsets_fit_in_u32() {
        assert_eq!(dynamic_offset(0, 256).unwrap(), 0);
        assert_eq!(dynamic_offset(3, 256).unwrap(), 768);
        let err = dynamic_offset(u32::MAX, 256).unwrap_err();
        assert!(matches!(err, RenderError::CameraOffset { slot: u32::MAX, .. }));
    }

    #[test]
    fn capture_pass_leaves_out_its_samplers() {
        let stage = build_stage(&Config::default());
        let order = draw_order(&stage.primary, Some(PRIMARY_CAPTURE));
        assert!(!order.contains(&stage.handles.quad));
        assert!(!order.contains(&stage.handles.primary_sphere));
        assert!(order.contains(&stage.handles.primary_cube));

        let order = draw_order(&stage.secondary, Some(SECONDARY_CAPTURE));
        assert!(!order.contains(&stage.handles.secondary_sphere));
        assert!(order.contains(&stage.handles.secondary_cube));
    }

    #[test]
    fn screen_pass_draws_ground_after_opaque_objects() {
        let stage = build_stage(&Config::default());
        let scene = &stage.primary;
        let ground = scene.find("ground").unwrap();
        let order = draw_order(scene, None);

        assert_eq!(order.len(), scene.object_count());
        let ground_at = order.iter().position(|&id| id == ground).unwrap();
        for (at, id) in order.iter().enumerate() {
            let transparent = scene.get(*id).unwrap().material.is_transparent();
            assert_eq!(at >= ground_at, transparent, "{id}");
        }
    }

    #[test]
    fn hidden_objects_are_never_drawn() {
        let mut stage = build_stage(&Config::default());
        let grid = stage.handles.grid;
        let sphere = stage.handles.primary_sphere;
        stage.primary.set_visible(grid, false);
        stage.primary.set_visible(sphere, false);

        for skip in [None, Some(PRIMARY_CAPTURE), Some(SECONDARY_CAPTURE)] {
            let order = draw_order(&stage.primary, skip);
            assert!(!order.contains(&grid));
            assert!(!order.contains(&sphere));
        }
    }

    #[test]
    fn frames_validate_on_available_adapter() {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let Some(adapter) =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
        else {
            eprintln!("no wgpu adapter, skipping");
            return;
        };
        let Ok((device, queue)) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None))
        else {
            eprintln!("no wgpu device, skipping");
            return;
        };

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let samples = if adapter
            .get_texture_format_features(format)
            .flags
            .sample_count_supported(4)
        {
            4
        } else {
            1
        };
        let (width, height) = (64, 48);
        let target = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("test_target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default());

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut stage = build_stage(&Config::default());
        let renderer = WgpuRenderer::new(&device, format, samples, width, height, &stage).unwrap();
        let mut frames = RenderLoop::new();
        for _ in 0..2 {
            let mut encoder = device.create_command_encoder(&Default::default());
            let mut frame = renderer.frame(&queue, &mut encoder, &target);
            frames.frame(&mut frame, &mut stage, Instant::now()).unwrap();
            queue.submit(std::iter::once(encoder.finish()));
        }
        let _ = device.poll(wgpu::Maintain::Wait);

        let error = pollster::block_on(device.pop_error_scope());
        assert!(error.is_none(), "{error:?}");
        assert_eq!(stage.primary.is_visible(stage.handles.primary_sphere), Some(true));
    }
}
