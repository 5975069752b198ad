//! Final output: either the composited image or an 8-tile debug mosaic of
//! the intermediate targets.

use wgpu::util::DeviceExt;

use crate::{
    config::{OutputMode, ShaderPolicy},
    context::Context,
    data_structures::{model::VertexLayout, texture::Attachment},
    error::RenderError,
    pipelines::{
        Command, Geometry, Group, Load, Program, ScreenVertex, Target,
        geometry::{GBuffer, GBufferSlot},
        lighting::SCREEN_VERTEX_SHADER,
        mk_pipeline_layout, mk_render_pipeline, texel_entry, uniform_entry,
    },
    shader::{CompiledProgram, ShaderProgram},
};

pub const COMPOSITE_SHADER: &str = include_str!("composite.frag.wgsl");
pub const DEBUG_VERTEX_SHADER: &str = include_str!("debug.vert.wgsl");
pub const DEBUG_FRAGMENT_SHADER: &str = include_str!("debug.frag.wgsl");

pub const COMPOSITE_CLEAR: wgpu::Color = wgpu::Color::BLACK;
/// Background behind the debug tiles.
pub const DEBUG_CLEAR: wgpu::Color = wgpu::Color {
    r: 75.0 / 255.0,
    g: 0.0,
    b: 130.0 / 255.0,
    a: 1.0,
};

/// Targets shown in the debug mosaic, in tile order (row-major from the top
/// left, four per row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugSource {
    Position,
    Normal,
    Lit,
    Shadow,
    Albedo,
    Specular,
    Emissive,
    Reflection,
}

impl DebugSource {
    pub const ALL: [DebugSource; 8] = [
        DebugSource::Position,
        DebugSource::Normal,
        DebugSource::Lit,
        DebugSource::Shadow,
        DebugSource::Albedo,
        DebugSource::Specular,
        DebugSource::Emissive,
        DebugSource::Reflection,
    ];
}

/// Placement of a debug tile in clip space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Tile {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
}

impl Tile {
    pub const COLUMNS: usize = 4;
    pub const SIZE: f32 = 0.5;

    /// Tile `index` spans `offset..offset + scale` in clip space.
    pub fn at(index: usize) -> Self {
        let (col, row) = (index % Self::COLUMNS, index / Self::COLUMNS);
        Self {
            offset: [
                -1.0 + Self::SIZE * col as f32,
                0.0 - Self::SIZE * row as f32,
            ],
            scale: [Self::SIZE, Self::SIZE],
        }
    }
}

pub fn plan(mode: OutputMode) -> Vec<Command> {
    match mode {
        OutputMode::Composite => vec![
            Command::BeginPass {
                target: Target::Frame,
                load: Load::Clear(COMPOSITE_CLEAR),
            },
            Command::SetProgram(Program::Composite),
            Command::BindGroup {
                slot: 0,
                group: Group::CompositeInputs,
            },
            Command::Draw(Geometry::ScreenQuad),
            Command::UnbindGroup { slot: 0 },
            Command::UnsetProgram,
            Command::EndPass,
        ],
        OutputMode::Debug => {
            let mut commands = vec![
                Command::BeginPass {
                    target: Target::Frame,
                    load: Load::Clear(DEBUG_CLEAR),
                },
                Command::SetProgram(Program::Debug),
            ];
            for tile in 0..DebugSource::ALL.len() {
                commands.push(Command::BindGroup {
                    slot: 0,
                    group: Group::DebugTile(tile),
                });
                commands.push(Command::Draw(Geometry::ScreenQuad));
            }
            commands.extend([
                Command::UnbindGroup { slot: 0 },
                Command::UnsetProgram,
                Command::EndPass,
            ]);
            commands
        }
    }
}

/// Targets the output pass samples from.
pub struct OutputSources<'a> {
    pub gbuffer: &'a GBuffer,
    pub lit: &'a Attachment,
    pub shadow: &'a Attachment,
}

impl OutputSources<'_> {
    fn attachment(&self, source: DebugSource) -> &Attachment {
        match source {
            DebugSource::Position => self.gbuffer.attachment(GBufferSlot::Position),
            DebugSource::Normal => self.gbuffer.attachment(GBufferSlot::Normal),
            DebugSource::Lit => self.lit,
            DebugSource::Shadow => self.shadow,
            DebugSource::Albedo => self.gbuffer.attachment(GBufferSlot::Albedo),
            DebugSource::Specular => self.gbuffer.attachment(GBufferSlot::Specular),
            DebugSource::Emissive => self.gbuffer.attachment(GBufferSlot::Emissive),
            DebugSource::Reflection => self.gbuffer.attachment(GBufferSlot::Reflection),
        }
    }

    fn generations(&self) -> [u64; 3] {
        [
            self.gbuffer.attachment(GBufferSlot::Position).generation(),
            self.lit.generation(),
            self.shadow.generation(),
        ]
    }
}

#[derive(Debug)]
pub struct OutputPass {
    composite_program: ShaderProgram,
    debug_program: ShaderProgram,
    composite_pipeline: Option<wgpu::RenderPipeline>,
    debug_pipeline: Option<wgpu::RenderPipeline>,
    composite_layout: wgpu::BindGroupLayout,
    debug_layout: wgpu::BindGroupLayout,
    tile_buffers: Vec<wgpu::Buffer>,
    composite_inputs: Option<wgpu::BindGroup>,
    debug_tiles: Vec<wgpu::BindGroup>,
    generations: Option<[u64; 3]>,
}

impl OutputPass {
    pub fn new(
        ctx: &Context,
        format: wgpu::TextureFormat,
        policy: ShaderPolicy,
    ) -> Result<Self, RenderError> {
        let device = &ctx.device;
        let composite_program = ShaderProgram::new(
            device,
            CompiledProgram::compile("composite", SCREEN_VERTEX_SHADER, COMPOSITE_SHADER, policy)?,
        );
        let debug_program = ShaderProgram::new(
            device,
            CompiledProgram::compile("debug", DEBUG_VERTEX_SHADER, DEBUG_FRAGMENT_SHADER, policy)?,
        );

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_bind_group_layout"),
            entries: &[
                texel_entry(0, wgpu::ShaderStages::FRAGMENT),
                texel_entry(1, wgpu::ShaderStages::FRAGMENT),
                texel_entry(2, wgpu::ShaderStages::FRAGMENT),
                texel_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let debug_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("debug_tile_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX, false),
                texel_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let target = [Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let composite_pipeline = mk_render_pipeline(
            device,
            "Composite Pipeline",
            &mk_pipeline_layout(device, "Composite Pipeline Layout", &[&composite_layout]),
            &composite_program,
            &target,
            None,
            &[ScreenVertex::desc()],
        );
        let debug_pipeline = mk_render_pipeline(
            device,
            "Debug Pipeline",
            &mk_pipeline_layout(device, "Debug Pipeline Layout", &[&debug_layout]),
            &debug_program,
            &target,
            None,
            &[ScreenVertex::desc()],
        );

        let tile_buffers = (0..DebugSource::ALL.len())
            .map(|i| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Debug Tile {i} Buffer")),
                    contents: bytemuck::bytes_of(&Tile::at(i)),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
            })
            .collect();

        Ok(Self {
            composite_program,
            debug_program,
            composite_pipeline,
            debug_pipeline,
            composite_layout,
            debug_layout,
            tile_buffers,
            composite_inputs: None,
            debug_tiles: Vec::new(),
            generations: None,
        })
    }

    /// Rebuilds the input groups whenever a source target was reallocated.
    pub fn prepare(&mut self, ctx: &Context, sources: &OutputSources<'_>) {
        let generations = sources.generations();
        if self.generations == Some(generations) {
            return;
        }
        let views: Option<Vec<&wgpu::TextureView>> = DebugSource::ALL
            .iter()
            .map(|source| sources.attachment(*source).view())
            .collect();
        let Some(views) = views else {
            self.composite_inputs = None;
            self.debug_tiles.clear();
            self.generations = None;
            return;
        };

        let composite_views = [
            sources.gbuffer.view(GBufferSlot::Albedo),
            sources.gbuffer.view(GBufferSlot::Emissive),
            sources.gbuffer.view(GBufferSlot::Reflection),
            sources.lit.view(),
        ];
        let entries: Option<Vec<wgpu::BindGroupEntry>> = composite_views
            .into_iter()
            .enumerate()
            .map(|(i, view)| {
                view.map(|view| wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: wgpu::BindingResource::TextureView(view),
                })
            })
            .collect();
        self.composite_inputs = entries.map(|entries| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("composite_bind_group"),
                layout: &self.composite_layout,
                entries: &entries,
            })
        });

        self.debug_tiles = views
            .into_iter()
            .zip(&self.tile_buffers)
            .zip(DebugSource::ALL)
            .map(|((view, buffer), source)| {
                ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("debug_tile_{source:?}_bind_group")),
                    layout: &self.debug_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                    ],
                })
            })
            .collect();
        self.generations = Some(generations);
    }

    pub fn program(&self, mode: OutputMode) -> &ShaderProgram {
        match mode {
            OutputMode::Composite => &self.composite_program,
            OutputMode::Debug => &self.debug_program,
        }
    }

    pub fn pipeline(&self, mode: OutputMode) -> Option<&wgpu::RenderPipeline> {
        match mode {
            OutputMode::Composite => self.composite_pipeline.as_ref(),
            OutputMode::Debug => self.debug_pipeline.as_ref(),
        }
    }

    pub fn composite_inputs(&self) -> Option<&wgpu::BindGroup> {
        self.composite_inputs.as_ref()
    }

    pub fn debug_tile(&self, index: usize) -> Option<&wgpu::BindGroup> {
        self.debug_tiles.get(index)
    }

    pub fn dispose(&mut self) {
        self.composite_program.dispose();
        self.debug_program.dispose();
        self.composite_pipeline = None;
        self.debug_pipeline = None;
        self.composite_inputs = None;
        self.debug_tiles.clear();
        self.generations = None;
    }
}
