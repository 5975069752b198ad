//! Render passes expressed as command plans.
//!
//! Each pass first produces a plain `Vec<Command>` describing what it binds
//! and draws. Plans are pure data: [`state::BindingState`] replays them to
//! check that every pass leaves the binding state neutral, and [`encode`]
//! turns them into wgpu calls against whatever a [`Resolve`] implementation
//! hands out.
//!
//! - `geometry` writes the G-buffer
//! - `lighting` accumulates light batches
//! - `shadow` is the placeholder shadow target
//! - `output` composites the final image or the debug mosaic

pub mod geometry;
pub mod lighting;
pub mod output;
pub mod shadow;
pub mod state;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{DrawMesh, Mesh, VertexLayout},
        scene::{MaterialId, MeshId},
    },
    shader::ShaderProgram,
};

/// Render targets a pass can draw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    GBuffer,
    Lighting,
    Shadow,
    /// The surface texture or caller-provided view.
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Load {
    Clear(wgpu::Color),
    /// Keep what earlier passes wrote.
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Geometry,
    Lighting,
    Shadow,
    Composite,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Camera,
    Material(MaterialId),
    GBufferInputs,
    /// Light batch by index, bound at its own dynamic offset.
    LightBatch(usize),
    CompositeInputs,
    DebugTile(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// One mesh draw using row `slot` of the instance buffer.
    Instance { mesh: MeshId, slot: u32 },
    ScreenQuad,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    BeginPass { target: Target, load: Load },
    SetProgram(Program),
    BindGroup { slot: u32, group: Group },
    UnbindGroup { slot: u32 },
    Draw(Geometry),
    UnsetProgram,
    EndPass,
}

/// Views a pass renders into.
pub struct PassTarget<'a> {
    pub colors: Vec<&'a wgpu::TextureView>,
    pub depth: Option<&'a wgpu::TextureView>,
}

/// Maps plan identifiers to the device objects of the current frame.
pub trait Resolve {
    fn target(&self, target: Target) -> Option<PassTarget<'_>>;
    fn pipeline(&self, program: Program) -> Option<&wgpu::RenderPipeline>;
    /// Bind group plus its dynamic offset, if the layout uses one.
    fn bind_group(&self, group: Group) -> Option<(&wgpu::BindGroup, Option<u32>)>;
    fn mesh(&self, id: MeshId) -> Option<&Mesh>;
    fn instances(&self) -> Option<&wgpu::Buffer>;
    fn quad(&self) -> &ScreenQuad;
}

/// Counters from one [`encode`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub passes: usize,
    pub draws: usize,
    pub skipped: usize,
}

/// Records `commands` into `encoder`. Anything the resolver cannot supply
/// (an invalid program, a missing mesh) skips the affected draws instead of
/// failing the frame.
pub fn encode(
    encoder: &mut wgpu::CommandEncoder,
    commands: &[Command],
    frame: &impl Resolve,
) -> EncodeStats {
    let mut stats = EncodeStats::default();
    let mut pass: Option<wgpu::RenderPass<'static>> = None;
    let mut program_ready = false;
    // slots whose group could not be resolved
    let mut missing: Vec<u32> = Vec::new();

    for command in commands {
        match *command {
            Command::BeginPass { target, load } => {
                drop(pass.take());
                let Some(views) = frame.target(target) else {
                    log::warn!("no views for {target:?}; skipping pass");
                    continue;
                };
                let (color_load, depth_load) = match load {
                    Load::Clear(color) => (wgpu::LoadOp::Clear(color), wgpu::LoadOp::Clear(1.0)),
                    Load::Keep => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
                };
                let color_attachments: Vec<_> = views
                    .colors
                    .iter()
                    .map(|view| {
                        Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            depth_slice: None,
                            ops: wgpu::Operations {
                                load: color_load,
                                store: wgpu::StoreOp::Store,
                            },
                        })
                    })
                    .collect();
                let depth_stencil_attachment =
                    views
                        .depth
                        .map(|view| wgpu::RenderPassDepthStencilAttachment {
                            view,
                            depth_ops: Some(wgpu::Operations {
                                load: depth_load,
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        });
                let label = format!("{target:?} Pass");
                pass = Some(
                    encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some(&label),
                            color_attachments: &color_attachments,
                            depth_stencil_attachment,
                            ..Default::default()
                        })
                        .forget_lifetime(),
                );
                stats.passes += 1;
            }
            Command::SetProgram(program) => {
                let Some(pass) = pass.as_mut() else { continue };
                match frame.pipeline(program) {
                    Some(pipeline) => {
                        pass.set_pipeline(pipeline);
                        program_ready = true;
                    }
                    None => {
                        log::debug!("{program:?} has no pipeline; its draws are skipped");
                        program_ready = false;
                    }
                }
            }
            Command::BindGroup { slot, group } => {
                let Some(pass) = pass.as_mut() else { continue };
                match frame.bind_group(group) {
                    Some((bind_group, offset)) => {
                        let offsets: &[u32] = match &offset {
                            Some(offset) => std::slice::from_ref(offset),
                            None => &[],
                        };
                        pass.set_bind_group(slot, bind_group, offsets);
                        missing.retain(|s| *s != slot);
                    }
                    None => {
                        log::warn!("{group:?} is not available; skipping its draws");
                        if !missing.contains(&slot) {
                            missing.push(slot);
                        }
                    }
                }
            }
            Command::UnbindGroup { slot } => {
                if let Some(pass) = pass.as_mut() {
                    pass.set_bind_group(slot, None::<&wgpu::BindGroup>, &[]);
                }
                missing.retain(|s| *s != slot);
            }
            Command::Draw(geometry) => {
                let Some(pass) = pass.as_mut() else { continue };
                if !program_ready || !missing.is_empty() {
                    stats.skipped += 1;
                    continue;
                }
                match geometry {
                    Geometry::Instance { mesh, slot } => {
                        let (Some(mesh), Some(instances)) = (frame.mesh(mesh), frame.instances())
                        else {
                            stats.skipped += 1;
                            continue;
                        };
                        pass.set_vertex_buffer(1, instances.slice(..));
                        pass.draw_mesh_instanced(mesh, slot..slot + 1);
                    }
                    Geometry::ScreenQuad => frame.quad().draw(pass),
                }
                stats.draws += 1;
            }
            Command::UnsetProgram => program_ready = false,
            Command::EndPass => {
                drop(pass.take());
                missing.clear();
            }
        }
    }
    stats
}

/// Full-screen quad vertex: clip-space position and UV with `v` pointing up.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl VertexLayout for ScreenVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ScreenVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

pub const SCREEN_QUAD: [ScreenVertex; 4] = [
    ScreenVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 0.0],
    },
    ScreenVertex {
        position: [1.0, -1.0],
        uv: [1.0, 0.0],
    },
    ScreenVertex {
        position: [1.0, 1.0],
        uv: [1.0, 1.0],
    },
    ScreenVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 1.0],
    },
];

const SCREEN_QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Shared geometry of all screen-space passes.
#[derive(Debug)]
pub struct ScreenQuad {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl ScreenQuad {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&SCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Index Buffer"),
            contents: bytemuck::cast_slice(&SCREEN_QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..SCREEN_QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

/// Builds a pipeline from a realized program. Returns `None` for programs
/// that failed a lenient compile, which makes the pass skip its draws.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    program: &ShaderProgram,
    targets: &[Option<wgpu::ColorTargetState>],
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
) -> Option<wgpu::RenderPipeline> {
    let (Some(vertex), Some(fragment)) = (program.vertex(), program.fragment()) else {
        log::warn!("{label}: program is invalid, no pipeline created");
        return None;
    };
    log::info!("creating {label}");

    Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    }))
}

/// Pipeline layout helper shared by the passes.
pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    let bind_group_layouts: Vec<Option<&wgpu::BindGroupLayout>> =
        bind_group_layouts.iter().copied().map(Some).collect();
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    })
}

/// Layout entry for a texture read with `textureLoad` (no sampler).
pub fn texel_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

/// Layout entry for a uniform buffer.
pub fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size: None,
        },
        count: None,
    }
}
