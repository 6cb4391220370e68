use glam::Mat4;

use crate::assets::SurfacePixels;
use crate::mesh::TriangleMesh;
use crate::noise;
use crate::renderer::camera::{CameraUniform, OrbitCamera};
use crate::renderer::targets::{MAP_RESOLUTION, RenderTarget};

const MAX_MESH_VERTICES: usize = 400_000;
const MAX_MESH_INDICES: usize = 1_600_000;

/// Framebuffer clear color behind the mesh and the debug overlays.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.5,
    g: 0.0,
    b: 0.5,
    a: 1.0,
};

/// Per-frame inputs the passes consume, assembled by the shell from UI state
/// and the clock.
pub struct FrameParams {
    pub time: f32,
    pub amplitude: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub falloff_enabled: bool,
    pub model: Mat4,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DisplacementUniforms {
    time: f32,
    amplitude: f32,
    lacunarity: f32,
    octaves: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct NormalUniforms {
    inv_amplitude: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshUniforms {
    model: [[f32; 4]; 4],
    falloff_enabled: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

/// Fixed-size GPU buffers for the displaced mesh. Uploads clamp to capacity
/// so a mesh beyond the limits renders truncated instead of failing.
pub struct MeshBuffers {
    pub position_buffer: wgpu::Buffer,
    pub normal_buffer: wgpu::Buffer,
    pub uv_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device) -> Self {
        let position_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Position Buffer"),
            size: (MAX_MESH_VERTICES * 3 * 4) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let normal_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Normal Buffer"),
            size: (MAX_MESH_VERTICES * 3 * 4) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uv_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh UV Buffer"),
            size: (MAX_MESH_VERTICES * 2 * 4) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Index Buffer"),
            size: (MAX_MESH_INDICES * 4) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            position_buffer,
            normal_buffer,
            uv_buffer,
            index_buffer,
            vertex_count: 0,
            index_count: 0,
        }
    }

    pub fn upload(&mut self, queue: &wgpu::Queue, mesh: &TriangleMesh) {
        let vertex_floats = mesh.positions.len().min(MAX_MESH_VERTICES * 3);
        let vertex_count = (vertex_floats / 3) as u32;
        let uv_floats = vertex_count as usize * 2;
        let index_count = mesh.indices.len().min(MAX_MESH_INDICES);

        queue.write_buffer(
            &self.position_buffer,
            0,
            bytemuck::cast_slice(&mesh.positions[..vertex_floats]),
        );
        queue.write_buffer(
            &self.normal_buffer,
            0,
            bytemuck::cast_slice(&mesh.normals[..vertex_floats]),
        );
        queue.write_buffer(
            &self.uv_buffer,
            0,
            bytemuck::cast_slice(&mesh.uvs[..uv_floats]),
        );
        queue.write_buffer(
            &self.index_buffer,
            0,
            bytemuck::cast_slice(&mesh.indices[..index_count]),
        );

        self.vertex_count = vertex_count;
        self.index_count = index_count as u32;
    }
}

fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn normal_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn uv_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        }],
    }
}

/// Sampler for reads from the off-screen targets. Clamped, so bilinear taps
/// at the map border never blend in texels from the opposite edge.
fn target_sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("Target Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

/// Sampler for the diffuse surface texture, which tiles across the grid.
fn surface_sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("Surface Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

struct PipelineSet {
    displacement: wgpu::RenderPipeline,
    normal_map: wgpu::RenderPipeline,
    overlay_height: wgpu::RenderPipeline,
    overlay_normal: wgpu::RenderPipeline,
    mesh: wgpu::RenderPipeline,
    mesh_wireframe: Option<wgpu::RenderPipeline>,
}

/// Everything the map and mesh passes own: off-screen targets, mesh buffers,
/// the diffuse texture, uniforms, bind groups and pipelines. Window-level
/// resources (surface, depth) stay in GpuState.
pub struct RenderState {
    displacement_target: RenderTarget,
    normal_target: RenderTarget,

    camera_buffer: wgpu::Buffer,
    displacement_uniform_buffer: wgpu::Buffer,
    normal_uniform_buffer: wgpu::Buffer,
    mesh_uniform_buffer: wgpu::Buffer,

    camera_layout: wgpu::BindGroupLayout,
    mesh_uniform_layout: wgpu::BindGroupLayout,
    maps_layout: wgpu::BindGroupLayout,
    displacement_layout: wgpu::BindGroupLayout,
    normal_pass_layout: wgpu::BindGroupLayout,
    overlay_layout: wgpu::BindGroupLayout,

    camera_bind_group: wgpu::BindGroup,
    mesh_uniform_bind_group: wgpu::BindGroup,
    maps_bind_group: wgpu::BindGroup,
    displacement_bind_group: wgpu::BindGroup,
    normal_pass_bind_group: wgpu::BindGroup,
    overlay_bind_group: wgpu::BindGroup,

    pipelines: PipelineSet,
    pub mesh_buffers: MeshBuffers,
    pub wireframe_supported: bool,
}

impl RenderState {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        shader_source: &str,
        surface_pixels: &SurfacePixels,
        wireframe_supported: bool,
    ) -> Result<Self, String> {
        let displacement_target = RenderTarget::new(
            device,
            "Displacement Map",
            wgpu::TextureFormat::R32Float,
            MAP_RESOLUTION,
        );
        let normal_target = RenderTarget::new(
            device,
            "Normal Map",
            wgpu::TextureFormat::Rgba8Unorm,
            MAP_RESOLUTION,
        );

        let surface_view = create_surface_texture(device, queue, surface_pixels);

        let target_sampler = device.create_sampler(&target_sampler_descriptor());
        let surface_sampler = device.create_sampler(&surface_sampler_descriptor());

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let displacement_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Displacement Uniform Buffer"),
            size: std::mem::size_of::<DisplacementUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let normal_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Normal Uniform Buffer"),
            size: std::mem::size_of::<NormalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mesh_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Uniform Buffer"),
            size: std::mem::size_of::<MeshUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_entry = |binding: u32, visibility: wgpu::ShaderStages| {
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
        };
        let texture_entry = |binding: u32, visibility: wgpu::ShaderStages, filterable: bool| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }
        };

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let mesh_uniform_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mesh Uniform Bind Group Layout"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                )],
            });

        let maps_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Maps Bind Group Layout"),
            entries: &[
                // R32Float is only loadable, never filtered.
                texture_entry(0, wgpu::ShaderStages::VERTEX, false),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                texture_entry(2, wgpu::ShaderStages::FRAGMENT, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let displacement_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Displacement Bind Group Layout"),
                entries: &[uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
            });

        let normal_pass_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Normal Pass Bind Group Layout"),
                entries: &[
                    uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(3, wgpu::ShaderStages::FRAGMENT, false),
                ],
            });

        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Bind Group Layout"),
            entries: &[
                texture_entry(4, wgpu::ShaderStages::FRAGMENT, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let mesh_uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Uniform Bind Group"),
            layout: &mesh_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: mesh_uniform_buffer.as_entire_binding(),
            }],
        });

        let maps_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Maps Bind Group"),
            layout: &maps_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&displacement_target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normal_target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&surface_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&target_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&surface_sampler),
                },
            ],
        });

        let displacement_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Displacement Bind Group"),
            layout: &displacement_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 1,
                resource: displacement_uniform_buffer.as_entire_binding(),
            }],
        });

        let normal_pass_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Normal Pass Bind Group"),
            layout: &normal_pass_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: normal_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&displacement_target.view),
                },
            ],
        });

        let overlay_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&normal_target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&target_sampler),
                },
            ],
        });

        let pipelines = build_pipelines(
            device,
            shader_source,
            &PipelineTargets {
                surface_format,
                displacement_format: displacement_target.format,
                normal_format: normal_target.format,
                wireframe_supported,
            },
            &PipelineLayouts {
                camera: &camera_layout,
                mesh_uniforms: &mesh_uniform_layout,
                maps: &maps_layout,
                displacement: &displacement_layout,
                normal_pass: &normal_pass_layout,
                overlay: &overlay_layout,
            },
        )?;

        Ok(Self {
            displacement_target,
            normal_target,
            camera_buffer,
            displacement_uniform_buffer,
            normal_uniform_buffer,
            mesh_uniform_buffer,
            camera_layout,
            mesh_uniform_layout,
            maps_layout,
            displacement_layout,
            normal_pass_layout,
            overlay_layout,
            camera_bind_group,
            mesh_uniform_bind_group,
            maps_bind_group,
            displacement_bind_group,
            normal_pass_bind_group,
            overlay_bind_group,
            pipelines,
            mesh_buffers: MeshBuffers::new(device),
            wireframe_supported,
        })
    }

    /// Recompiles the shader and swaps in a fresh pipeline set. On failure
    /// the existing pipelines stay installed and the captured validation
    /// error is returned for display.
    pub fn rebuild_pipelines(
        &mut self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        shader_source: &str,
    ) -> Result<(), String> {
        let pipelines = build_pipelines(
            device,
            shader_source,
            &PipelineTargets {
                surface_format,
                displacement_format: self.displacement_target.format,
                normal_format: self.normal_target.format,
                wireframe_supported: self.wireframe_supported,
            },
            &PipelineLayouts {
                camera: &self.camera_layout,
                mesh_uniforms: &self.mesh_uniform_layout,
                maps: &self.maps_layout,
                displacement: &self.displacement_layout,
                normal_pass: &self.normal_pass_layout,
                overlay: &self.overlay_layout,
            },
        )?;
        self.pipelines = pipelines;
        Ok(())
    }

    pub fn write_frame_uniforms(&self, queue: &wgpu::Queue, params: &FrameParams) {
        let displacement = DisplacementUniforms {
            time: params.time,
            amplitude: params.amplitude,
            lacunarity: params.lacunarity,
            octaves: params.octaves,
        };
        queue.write_buffer(
            &self.displacement_uniform_buffer,
            0,
            bytemuck::cast_slice(&[displacement]),
        );

        let normal = NormalUniforms {
            inv_amplitude: noise::inverse_amplitude(params.amplitude),
            _pad0: 0.0,
            _pad1: 0.0,
            _pad2: 0.0,
        };
        queue.write_buffer(
            &self.normal_uniform_buffer,
            0,
            bytemuck::cast_slice(&[normal]),
        );

        let mesh = MeshUniforms {
            model: params.model.to_cols_array_2d(),
            falloff_enabled: params.falloff_enabled as u32,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        };
        queue.write_buffer(
            &self.mesh_uniform_buffer,
            0,
            bytemuck::cast_slice(&[mesh]),
        );
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &OrbitCamera) {
        let uniform = CameraUniform::from_camera(camera);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn render_displacement(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Displacement Map Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.displacement_target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipelines.displacement);
        render_pass.set_bind_group(0, &self.displacement_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    pub fn render_normal_map(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Normal Map Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.normal_target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipelines.normal_map);
        render_pass.set_bind_group(0, &self.normal_pass_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    /// Clears the frame and blits both maps side by side at native size,
    /// height field left, normal map right. Viewport state resets when the
    /// pass ends, so no restore is needed.
    pub fn render_map_overlays(
        &self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        surface_width: u32,
        surface_height: u32,
    ) {
        let (height_rect, normal_rect) =
            overlay_rects(surface_width as f32, surface_height as f32);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Map Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipelines.overlay_height);
        render_pass.set_bind_group(0, &self.normal_pass_bind_group, &[]);
        render_pass.set_viewport(
            height_rect[0],
            height_rect[1],
            height_rect[2],
            height_rect[3],
            0.0,
            1.0,
        );
        render_pass.draw(0..3, 0..1);

        render_pass.set_pipeline(&self.pipelines.overlay_normal);
        render_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
        render_pass.set_viewport(
            normal_rect[0],
            normal_rect[1],
            normal_rect[2],
            normal_rect[3],
            0.0,
            1.0,
        );
        render_pass.draw(0..3, 0..1);
    }

    pub fn render_mesh(
        &self,
        view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        clear: bool,
        wireframe: bool,
    ) {
        let load_op = if clear {
            wgpu::LoadOp::Clear(CLEAR_COLOR)
        } else {
            wgpu::LoadOp::Load
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let pipeline = if wireframe {
            self.pipelines
                .mesh_wireframe
                .as_ref()
                .unwrap_or(&self.pipelines.mesh)
        } else {
            &self.pipelines.mesh
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.mesh_uniform_bind_group, &[]);
        render_pass.set_bind_group(2, &self.maps_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.mesh_buffers.position_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.mesh_buffers.normal_buffer.slice(..));
        render_pass.set_vertex_buffer(2, self.mesh_buffers.uv_buffer.slice(..));
        render_pass.set_index_buffer(
            self.mesh_buffers.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        render_pass.draw_indexed(0..self.mesh_buffers.index_count, 0, 0..1);
    }
}

struct PipelineTargets {
    surface_format: wgpu::TextureFormat,
    displacement_format: wgpu::TextureFormat,
    normal_format: wgpu::TextureFormat,
    wireframe_supported: bool,
}

struct PipelineLayouts<'a> {
    camera: &'a wgpu::BindGroupLayout,
    mesh_uniforms: &'a wgpu::BindGroupLayout,
    maps: &'a wgpu::BindGroupLayout,
    displacement: &'a wgpu::BindGroupLayout,
    normal_pass: &'a wgpu::BindGroupLayout,
    overlay: &'a wgpu::BindGroupLayout,
}

/// Compiles the WGSL module and builds every pipeline inside a validation
/// error scope, so a broken shader surfaces as an Err instead of a panic.
fn build_pipelines(
    device: &wgpu::Device,
    shader_source: &str,
    targets: &PipelineTargets,
    layouts: &PipelineLayouts<'_>,
) -> Result<PipelineSet, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Field Shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let displacement_pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Displacement Pipeline Layout"),
            bind_group_layouts: &[layouts.displacement],
            push_constant_ranges: &[],
        });

    let displacement = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Displacement Pipeline"),
        layout: Some(&displacement_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_displacement"),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.displacement_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let normal_pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Normal Pipeline Layout"),
            bind_group_layouts: &[layouts.normal_pass],
            push_constant_ranges: &[],
        });

    let normal_map = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Normal Map Pipeline"),
        layout: Some(&normal_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_normal_map"),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.normal_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let overlay_height = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Height Overlay Pipeline"),
        layout: Some(&normal_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_overlay_height"),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let overlay_pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[layouts.overlay],
            push_constant_ranges: &[],
        });

    let overlay_normal = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Normal Overlay Pipeline"),
        layout: Some(&overlay_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_overlay_normal"),
            targets: &[Some(wgpu::ColorTargetState {
                format: targets.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let mesh_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[layouts.camera, layouts.mesh_uniforms, layouts.maps],
        push_constant_ranges: &[],
    });

    let mesh_vertex_buffers = [position_layout(), normal_layout(), uv_layout()];
    let mesh_targets = [Some(wgpu::ColorTargetState {
        format: targets.surface_format,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    let mesh_descriptor = |polygon_mode: wgpu::PolygonMode| wgpu::RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&mesh_pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_mesh"),
            buffers: &mesh_vertex_buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_mesh"),
            targets: &mesh_targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    };

    let mesh = device.create_render_pipeline(&mesh_descriptor(wgpu::PolygonMode::Fill));
    let mesh_wireframe = targets
        .wireframe_supported
        .then(|| device.create_render_pipeline(&mesh_descriptor(wgpu::PolygonMode::Line)));

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(format!("shader rebuild failed: {error}"));
    }

    Ok(PipelineSet {
        displacement,
        normal_map,
        overlay_height,
        overlay_normal,
        mesh,
        mesh_wireframe,
    })
}

/// Overlay placement: native map size in the top-left corner, shrunk only
/// when the window cannot fit both maps side by side.
fn overlay_rects(surface_width: f32, surface_height: f32) -> ([f32; 4], [f32; 4]) {
    let side = (MAP_RESOLUTION as f32)
        .min(surface_width / 2.0)
        .min(surface_height)
        .max(1.0);
    ([0.0, 0.0, side, side], [side, 0.0, side, side])
}

fn create_surface_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &SurfacePixels,
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: pixels.width,
        height: pixels.height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Surface Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &pixels.rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(pixels.width * 4),
            rows_per_image: Some(pixels.height),
        },
        size,
    );

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_structs_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<DisplacementUniforms>(), 16);
        assert_eq!(std::mem::size_of::<NormalUniforms>(), 16);
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 80);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn overlays_keep_native_size_on_large_surfaces() {
        let (height_rect, normal_rect) = overlay_rects(1920.0, 1080.0);
        assert_eq!(height_rect, [0.0, 0.0, 256.0, 256.0]);
        assert_eq!(normal_rect, [256.0, 0.0, 256.0, 256.0]);
    }

    #[test]
    fn overlays_shrink_to_fit_small_surfaces() {
        let (height_rect, normal_rect) = overlay_rects(300.0, 200.0);
        assert_eq!(height_rect, [0.0, 0.0, 150.0, 150.0]);
        assert_eq!(normal_rect, [150.0, 0.0, 150.0, 150.0]);
    }

    // Mesh UVs reach exactly 0, where a wrapping sampler would blend the
    // opposite edge of the normal map into the border band.
    #[test]
    fn target_reads_clamp_and_surface_reads_tile() {
        let target = target_sampler_descriptor();
        assert_eq!(target.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(target.address_mode_v, wgpu::AddressMode::ClampToEdge);

        let surface = surface_sampler_descriptor();
        assert_eq!(surface.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(surface.address_mode_v, wgpu::AddressMode::Repeat);
    }
}
