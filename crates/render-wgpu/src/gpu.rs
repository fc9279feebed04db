use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};
use wgpu::util::DeviceExt;

use gnomon_assets::{AssetId, MeshData, TextureData};
use gnomon_common::{MeshHandle, TextureHandle};
use gnomon_render::FrameContext;
use gnomon_scene::{LightBuffer, MeshRef, NodeKind, SceneGraph};

use crate::shaders;

/// Light slots baked into the shader. The per-frame [`LightBuffer`] may be
/// configured smaller; it is never larger.
pub const MAX_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    light_space: [[f32; 4]; 4],
    /// xyz = direction sunlight travels, w = day factor.
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    /// xyz = camera world position, w = active light count.
    camera_pos: [f32; 4],
    light_positions: [[f32; 4]; MAX_LIGHTS],
    light_colors: [[f32; 4]; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct NodeUniforms {
    model: [[f32; 4]; 4],
    mvp: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    /// x > 0.5 means the bound texture is meaningful.
    flags: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ShadowUniforms {
    light_space: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SkyUniforms {
    inv_view_proj: [[f32; 4]; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
}

/// Round `value` up to the next multiple of `alignment`.
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Normal matrix for `model`: transpose of the inverse of its upper-left
/// 3x3, widened back to a mat4 for uniform upload. The model matrix itself
/// would skew normals under non-uniform scale.
pub(crate) fn normal_matrix(model: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(model).inverse().transpose())
}

/// The camera view with its translation stripped, so the sky pass sees a
/// backdrop at infinite distance.
pub(crate) fn strip_translation(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

/// One geometry draw recorded from the scene graph, in pre-order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshRef,
    pub texture: Option<TextureHandle>,
    pub model: Mat4,
    pub mvp: Mat4,
}

/// Walk the graph and list every node both passes will draw: geometry kind
/// with a bound mesh. Lights and environment markers carry no drawable
/// surface; geometry without a mesh is a grouping node.
pub fn collect_draws(graph: &SceneGraph) -> Vec<DrawItem> {
    let mut draws = Vec::new();
    graph.visit(graph.root(), &mut |_, node| match node.kind {
        NodeKind::Geometry => {
            if let Some(mesh) = node.mesh {
                draws.push(DrawItem {
                    mesh,
                    texture: node.texture,
                    model: node.model_matrix,
                    mvp: node.mvp,
                });
            }
        }
        NodeKind::PointLight | NodeKind::SpotLight | NodeKind::Environment => {}
    });
    draws
}

fn interleave(mesh: &MeshData) -> Vec<Vertex> {
    let has_uvs = mesh.texcoords.len() == mesh.positions.len();
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex {
            position: p.to_array(),
            normal: mesh.normals[i].to_array(),
            uv: if has_uvs {
                mesh.texcoords[i].to_array()
            } else {
                [0.0, 0.0]
            },
        })
        .collect()
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    bind_group: wgpu::BindGroup,
}

/// wgpu renderer for the scene graph demo.
///
/// Owns every GPU resource for the process lifetime: uploaded meshes and
/// textures, the shadow depth target, and the three pipelines. One call to
/// [`render`](Self::render) records the whole frame in strict order: shadow
/// pass, then the color pass reading the shadow map, then the sky.
pub struct SceneRenderer {
    shadow_pipeline: wgpu::RenderPipeline,
    scene_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow_cast_buffer: wgpu::Buffer,
    shadow_cast_bind_group: wgpu::BindGroup,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,

    node_layout: wgpu::BindGroupLayout,
    node_buffer: wgpu::Buffer,
    node_bind_group: wgpu::BindGroup,
    node_capacity: u32,
    node_stride: u32,

    texture_layout: wgpu::BindGroupLayout,
    texture_sampler: wgpu::Sampler,
    default_texture: GpuTexture,
    meshes: BTreeMap<MeshHandle, GpuMesh>,
    textures: BTreeMap<TextureHandle, GpuTexture>,
    texture_dedup: BTreeMap<AssetId, TextureHandle>,
    next_mesh: u64,
    next_texture: u64,

    shadow_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        shadow_resolution: u32,
    ) -> Self {
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_cast_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow_cast_uniforms"),
            size: std::mem::size_of::<ShadowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sky_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sky_uniforms"),
            size: std::mem::size_of::<SkyUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow_view = Self::create_shadow_target(device, shadow_resolution);
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let uniform_layout = |label| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        };
        let shadow_cast_layout = uniform_layout("shadow_cast_bind_group_layout");
        let shadow_cast_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_cast_bind_group"),
            layout: &shadow_cast_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_cast_buffer.as_entire_binding(),
            }],
        });
        let sky_layout = uniform_layout("sky_bind_group_layout");
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sky_bind_group"),
            layout: &sky_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_buffer.as_entire_binding(),
            }],
        });

        // Per-node uniforms share one buffer, addressed by dynamic offsets
        // aligned to the device's uniform offset requirement.
        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let node_stride = align_to(std::mem::size_of::<NodeUniforms>() as u32, min_alignment);
        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("node_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<NodeUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let node_capacity = 64;
        let (node_buffer, node_bind_group) =
            Self::create_node_buffer(device, &node_layout, node_stride, node_capacity);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
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
        let texture_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        // Untextured nodes keep a valid binding through this 1x1 white pixel;
        // the shader's flag decides whether the sample is used.
        let default_texture = Self::upload_rgba(
            device,
            queue,
            &texture_layout,
            &texture_sampler,
            1,
            1,
            &[255, 255, 255, 255],
        );

        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SHADOW_SHADER.into()),
        });
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sky_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SKY_SHADER.into()),
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x3,
                1 => Float32x3,
                2 => Float32x2,
            ],
        };

        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow_pipeline_layout"),
                bind_group_layouts: &[&shadow_cast_layout, &node_layout],
                push_constant_ranges: &[],
            });
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout.clone()],
            },
            // Depth only; color writes disabled by having no color target.
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &node_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sky_pipeline_layout"),
            bind_group_layouts: &[&sky_layout],
            push_constant_ranges: &[],
        });
        let sky_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sky_pipeline"),
            layout: Some(&sky_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sky_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &sky_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Passes only where geometry left the far plane untouched.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = Self::create_depth_target(device, width, height);

        tracing::info!(
            shadow_resolution,
            node_stride,
            "scene renderer initialized"
        );

        Self {
            shadow_pipeline,
            scene_pipeline,
            sky_pipeline,
            frame_buffer,
            frame_bind_group,
            shadow_cast_buffer,
            shadow_cast_bind_group,
            sky_buffer,
            sky_bind_group,
            node_layout,
            node_buffer,
            node_bind_group,
            node_capacity,
            node_stride,
            texture_layout,
            texture_sampler,
            default_texture,
            meshes: BTreeMap::new(),
            textures: BTreeMap::new(),
            texture_dedup: BTreeMap::new(),
            next_mesh: 1,
            next_texture: 1,
            shadow_view,
            depth_view,
            surface_format,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = Self::create_depth_target(device, width, height);
    }

    /// Upload a CPU mesh and return the handle plus index count a node
    /// needs to reference it.
    pub fn upload_mesh(&mut self, device: &wgpu::Device, mesh: &MeshData) -> MeshRef {
        let vertices = interleave(mesh);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        let index_count = mesh.index_count();
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count,
            },
        );
        tracing::debug!(handle = handle.0, index_count, "uploaded mesh");
        MeshRef {
            handle,
            index_count,
        }
    }

    /// Upload a decoded texture. Repeated uploads of identical pixels are
    /// deduplicated by content id.
    pub fn upload_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &TextureData,
    ) -> TextureHandle {
        if let Some(&existing) = self.texture_dedup.get(&texture.id) {
            tracing::debug!(handle = existing.0, "texture content already resident");
            return existing;
        }
        let gpu = Self::upload_rgba(
            device,
            queue,
            &self.texture_layout,
            &self.texture_sampler,
            texture.width,
            texture.height,
            &texture.rgba,
        );
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, gpu);
        self.texture_dedup.insert(texture.id, handle);
        tracing::debug!(
            handle = handle.0,
            width = texture.width,
            height = texture.height,
            "uploaded texture"
        );
        handle
    }

    /// Record and submit one frame: shadow pass from the light, color pass
    /// from the camera sampling the shadow map, sky last. The graph must
    /// already hold this frame's propagated matrices.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        graph: &SceneGraph,
        ctx: &FrameContext,
        lights: &LightBuffer,
    ) {
        let draws = collect_draws(graph);
        self.ensure_node_capacity(device, draws.len() as u32);
        self.write_uniforms(queue, &draws, ctx, lights);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&self.shadow_pipeline);
            pass.set_bind_group(0, &self.shadow_cast_bind_group, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&draw.mesh.handle) else {
                    tracing::warn!(handle = draw.mesh.handle.0, "mesh not resident, skipping");
                    continue;
                };
                pass.set_bind_group(1, &self.node_bind_group, &[i as u32 * self.node_stride]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.mesh.index_count.min(mesh.index_count), 0, 0..1);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("color_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&self.scene_pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&draw.mesh.handle) else {
                    continue;
                };
                let texture = draw
                    .texture
                    .and_then(|handle| self.textures.get(&handle))
                    .unwrap_or(&self.default_texture);
                pass.set_bind_group(1, &self.node_bind_group, &[i as u32 * self.node_stride]);
                pass.set_bind_group(2, &texture.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.mesh.index_count.min(mesh.index_count), 0, 0..1);
            }

            // Backdrop last, behind everything already drawn.
            pass.set_pipeline(&self.sky_pipeline);
            pass.set_bind_group(0, &self.sky_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn write_uniforms(
        &self,
        queue: &wgpu::Queue,
        draws: &[DrawItem],
        ctx: &FrameContext,
        lights: &LightBuffer,
    ) {
        let mut frame = FrameUniforms {
            light_space: ctx.light_space_matrix.to_cols_array_2d(),
            sun_dir: ctx.sun_dir.extend(ctx.day_factor).to_array(),
            sun_color: ctx.sun_color.extend(1.0).to_array(),
            camera_pos: ctx
                .camera_position
                .extend(lights.len().min(MAX_LIGHTS) as f32)
                .to_array(),
            light_positions: [[0.0; 4]; MAX_LIGHTS],
            light_colors: [[0.0; 4]; MAX_LIGHTS],
        };
        for (slot, light) in lights.lights().iter().take(MAX_LIGHTS).enumerate() {
            frame.light_positions[slot] = light.position.extend(1.0).to_array();
            frame.light_colors[slot] = light.color.extend(1.0).to_array();
        }
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        queue.write_buffer(
            &self.shadow_cast_buffer,
            0,
            bytemuck::bytes_of(&ShadowUniforms {
                light_space: ctx.light_space_matrix.to_cols_array_2d(),
            }),
        );

        let sky_view_proj = ctx.projection * strip_translation(ctx.view);
        queue.write_buffer(
            &self.sky_buffer,
            0,
            bytemuck::bytes_of(&SkyUniforms {
                inv_view_proj: sky_view_proj.inverse().to_cols_array_2d(),
                sun_dir: ctx.sun_dir.extend(ctx.day_factor).to_array(),
                sun_color: ctx.sun_color.extend(1.0).to_array(),
            }),
        );

        if draws.is_empty() {
            return;
        }
        let mut staging = vec![0u8; draws.len() * self.node_stride as usize];
        for (i, draw) in draws.iter().enumerate() {
            let uniforms = NodeUniforms {
                model: draw.model.to_cols_array_2d(),
                mvp: draw.mvp.to_cols_array_2d(),
                normal_matrix: normal_matrix(draw.model).to_cols_array_2d(),
                flags: Vec4::new(
                    if draw.texture.is_some() { 1.0 } else { 0.0 },
                    0.0,
                    0.0,
                    0.0,
                )
                .to_array(),
            };
            let offset = i * self.node_stride as usize;
            staging[offset..offset + std::mem::size_of::<NodeUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        queue.write_buffer(&self.node_buffer, 0, &staging);
    }

    fn ensure_node_capacity(&mut self, device: &wgpu::Device, required: u32) {
        if required <= self.node_capacity {
            return;
        }
        let mut capacity = self.node_capacity.max(1);
        while capacity < required {
            capacity *= 2;
        }
        tracing::debug!(capacity, "growing per-node uniform buffer");
        let (buffer, bind_group) =
            Self::create_node_buffer(device, &self.node_layout, self.node_stride, capacity);
        self.node_buffer = buffer;
        self.node_bind_group = bind_group;
        self.node_capacity = capacity;
    }

    fn create_node_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u32,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("node_uniforms"),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("node_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<NodeUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn upload_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> GpuTexture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("diffuse_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&Default::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        GpuTexture { bind_group }
    }

    fn create_shadow_target(device: &wgpu::Device, resolution: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: resolution.max(1),
                height: resolution.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn create_depth_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use gnomon_common::{MeshHandle, TextureHandle};

    #[test]
    fn align_to_rounds_up_to_multiples() {
        assert_eq!(align_to(208, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(0, 64), 0);
    }

    #[test]
    fn normal_matrix_fixes_nonuniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(model);
        // A normal on the stretched axis must stay axis-aligned after
        // renormalization; the raw model matrix would agree here, so check
        // a slanted surface instead.
        let slanted = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        let surface_normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let wrong = (slanted * surface_normal.extend(0.0)).truncate().normalize();
        let right = (normal_matrix(slanted) * surface_normal.extend(0.0))
            .truncate()
            .normalize();
        assert!((wrong - right).length() > 1e-2, "cases should disagree");
        // The corrected normal stays perpendicular to the transformed surface
        // tangent.
        let tangent = (slanted * Vec3::new(1.0, -1.0, 0.0).extend(0.0)).truncate();
        assert!(right.dot(tangent).abs() < 1e-5);
        assert!((n * Vec4::new(0.0, 0.0, 1.0, 0.0)).truncate().z > 0.0);
    }

    #[test]
    fn strip_translation_keeps_rotation_only() {
        let view = Mat4::look_at_rh(Vec3::new(10.0, 20.0, 30.0), Vec3::ZERO, Vec3::Y);
        let stripped = strip_translation(view);
        assert_eq!(stripped.w_axis, Vec4::new(0.0, 0.0, 0.0, 1.0));
        // Rotation part unchanged.
        assert_eq!(stripped.x_axis, view.x_axis);
        assert_eq!(stripped.y_axis, view.y_axis);
        assert_eq!(stripped.z_axis, view.z_axis);
    }

    #[test]
    fn collect_draws_takes_geometry_with_meshes_in_preorder() {
        let mut graph = SceneGraph::new();
        let group = graph.create_node(); // geometry kind, no mesh
        let a = graph.create_node();
        let b = graph.create_node();
        let light = graph.create_node();
        graph.node_mut(a).mesh = Some(MeshRef {
            handle: MeshHandle(1),
            index_count: 36,
        });
        graph.node_mut(b).mesh = Some(MeshRef {
            handle: MeshHandle(2),
            index_count: 6,
        });
        graph.node_mut(b).texture = Some(TextureHandle(7));
        graph.node_mut(light).kind = NodeKind::PointLight;
        graph.add_child(graph.root(), group);
        graph.add_child(group, a);
        graph.add_child(graph.root(), light);
        graph.add_child(graph.root(), b);

        let draws = collect_draws(&graph);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mesh.handle, MeshHandle(1));
        assert_eq!(draws[0].texture, None);
        assert_eq!(draws[1].mesh.handle, MeshHandle(2));
        assert_eq!(draws[1].texture, Some(TextureHandle(7)));
    }

    #[test]
    fn collect_draws_skips_lights_and_environment() {
        let mut graph = SceneGraph::new();
        for kind in [NodeKind::PointLight, NodeKind::SpotLight, NodeKind::Environment] {
            let id = graph.create_node();
            let node = graph.node_mut(id);
            node.kind = kind;
            // Even a bound mesh on a non-geometry node is not drawn here.
            node.mesh = Some(MeshRef {
                handle: MeshHandle(9),
                index_count: 3,
            });
            graph.add_child(graph.root(), id);
        }
        assert!(collect_draws(&graph).is_empty());
    }

    #[test]
    fn collect_draws_carries_propagated_matrices() {
        let mut graph = SceneGraph::new();
        let child = graph.create_node();
        graph.node_mut(child).transform.position = Vec3::new(0.0, 0.0, -80.0);
        graph.node_mut(child).mesh = Some(MeshRef {
            handle: MeshHandle(1),
            index_count: 3,
        });
        graph.add_child(graph.root(), child);
        let vp = Mat4::perspective_rh(1.2, 1.0, 0.1, 350.0);
        let mut lights = LightBuffer::new(1);
        graph.propagate(Mat4::IDENTITY, vp, &mut lights);

        let draws = collect_draws(&graph);
        assert_eq!(draws[0].model, graph.node(child).model_matrix);
        assert_eq!(draws[0].mvp, graph.node(child).mvp);
    }

    #[test]
    fn interleave_pads_missing_uvs() {
        let mesh = MeshData {
            positions: vec![Vec3::X, Vec3::Y, Vec3::Z],
            normals: vec![Vec3::Y; 3],
            texcoords: Vec::new(),
            indices: vec![0, 1, 2],
            diffuse_texture: None,
        };
        let vertices = interleave(&mesh);
        assert_eq!(vertices.len(), 3);
        assert!(vertices.iter().all(|v| v.uv == [0.0, 0.0]));
        assert_eq!(vertices[0].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn interleave_keeps_uvs_when_present() {
        let mesh = MeshData {
            positions: vec![Vec3::ZERO, Vec3::X],
            normals: vec![Vec3::Y; 2],
            texcoords: vec![Vec2::new(0.25, 0.5), Vec2::new(1.0, 0.0)],
            indices: vec![0, 1],
            diffuse_texture: None,
        };
        let vertices = interleave(&mesh);
        assert_eq!(vertices[0].uv, [0.25, 0.5]);
        assert_eq!(vertices[1].uv, [1.0, 0.0]);
    }

    #[test]
    fn node_uniforms_fit_the_common_offset_alignment() {
        let stride = align_to(std::mem::size_of::<NodeUniforms>() as u32, 256);
        assert_eq!(stride, 256);
    }
}
