//! Lighting pass: additive accumulation of light batches.
//!
//! The lit target is cleared once, then each batch of up to
//! `lights_per_batch` records is drawn as one full-screen quad blended with
//! `One + One`. Batches live side by side in a single uniform buffer and are
//! selected with a dynamic offset.

use std::num::NonZeroU64;

use cgmath::Vector3;

use crate::{
    camera::Camera,
    config::ShaderPolicy,
    context::Context,
    data_structures::{
        light::{Light, LightBatch, pack_batches},
        model::VertexLayout,
        texture::Attachment,
    },
    error::RenderError,
    pipelines::{
        Command, Geometry, Group, Load, Program, ScreenVertex, Target,
        geometry::{GBuffer, GBufferSlot},
        mk_pipeline_layout, mk_render_pipeline, texel_entry,
    },
    shader::{CompiledProgram, ShaderProgram},
};

pub const SCREEN_VERTEX_SHADER: &str = include_str!("screen.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("lighting.frag.wgsl");

pub const LIT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const LIT_CLEAR: wgpu::Color = wgpu::Color::BLACK;

/// Light contributions add up; alpha is overwritten with the last value.
pub const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::REPLACE,
};

/// One clear, then one draw per batch. With no batches only the clear runs.
pub fn plan(batches: usize) -> Vec<Command> {
    let mut commands = vec![
        Command::BeginPass {
            target: Target::Lighting,
            load: Load::Clear(LIT_CLEAR),
        },
        Command::SetProgram(Program::Lighting),
        Command::BindGroup {
            slot: 1,
            group: Group::GBufferInputs,
        },
    ];
    for batch in 0..batches {
        commands.push(Command::BindGroup {
            slot: 0,
            group: Group::LightBatch(batch),
        });
        commands.push(Command::Draw(Geometry::ScreenQuad));
    }
    if batches > 0 {
        commands.push(Command::UnbindGroup { slot: 0 });
    }
    commands.extend([
        Command::UnbindGroup { slot: 1 },
        Command::UnsetProgram,
        Command::EndPass,
    ]);
    commands
}

/// Direction from the scene toward the viewer.
pub fn view_direction(camera: &Camera) -> Vector3<f32> {
    -camera.forward()
}

/// Byte distance between consecutive batches in the uniform buffer.
pub fn batch_stride(alignment: u32) -> u64 {
    let size = std::mem::size_of::<LightBatch>() as u64;
    let alignment = alignment.max(1) as u64;
    size.div_ceil(alignment) * alignment
}

#[derive(Debug)]
pub struct LightingPass {
    pub lit: Attachment,
    program: ShaderProgram,
    pipeline: Option<wgpu::RenderPipeline>,
    batch_layout: wgpu::BindGroupLayout,
    inputs_layout: wgpu::BindGroupLayout,
    batch_buffer: Option<wgpu::Buffer>,
    batch_bind_group: Option<wgpu::BindGroup>,
    batch_capacity: usize,
    stride: u64,
    inputs: Option<(u64, wgpu::BindGroup)>,
    batches: usize,
}

impl LightingPass {
    pub fn new(ctx: &Context, policy: ShaderPolicy) -> Result<Self, RenderError> {
        let device = &ctx.device;
        let compiled =
            CompiledProgram::compile("lighting", SCREEN_VERTEX_SHADER, FRAGMENT_SHADER, policy)?;
        let program = ShaderProgram::new(device, compiled);

        let batch_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light_batch_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<LightBatch>() as u64),
                },
                count: None,
            }],
        });
        let inputs_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gbuffer_inputs_bind_group_layout"),
            entries: &[
                texel_entry(0, wgpu::ShaderStages::FRAGMENT),
                texel_entry(1, wgpu::ShaderStages::FRAGMENT),
                texel_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let layout = mk_pipeline_layout(
            device,
            "Lighting Pipeline Layout",
            &[&batch_layout, &inputs_layout],
        );
        let pipeline = mk_render_pipeline(
            device,
            "Lighting Pipeline",
            &layout,
            &program,
            &[Some(wgpu::ColorTargetState {
                format: LIT_FORMAT,
                blend: Some(ADDITIVE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            None,
            &[ScreenVertex::desc()],
        );

        Ok(Self {
            lit: Attachment::new("lit", LIT_FORMAT),
            program,
            pipeline,
            batch_layout,
            inputs_layout,
            batch_buffer: None,
            batch_bind_group: None,
            batch_capacity: 0,
            stride: batch_stride(device.limits().min_uniform_buffer_offset_alignment),
            inputs: None,
            batches: 0,
        })
    }

    /// Packs and uploads `lights`, returning the number of batches.
    pub fn prepare(
        &mut self,
        ctx: &Context,
        gbuffer: &GBuffer,
        lights: &[Light],
        view_direction: Vector3<f32>,
        lights_per_batch: usize,
    ) -> usize {
        self.sync_inputs(ctx, gbuffer);

        let batches = pack_batches(lights, view_direction, lights_per_batch);
        self.batches = batches.len();
        if batches.is_empty() {
            return 0;
        }
        if batches.len() > self.batch_capacity {
            let capacity = batches.len().next_power_of_two();
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Light Batch Buffer"),
                size: self.stride * capacity as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("light_batch_bind_group"),
                layout: &self.batch_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<LightBatch>() as u64),
                    }),
                }],
            });
            if let Some(old) = self.batch_buffer.replace(buffer) {
                old.destroy();
            }
            self.batch_bind_group = Some(bind_group);
            self.batch_capacity = capacity;
            log::debug!("light batch buffer grown to {capacity} batches");
        }
        if let Some(buffer) = &self.batch_buffer {
            for (i, batch) in batches.iter().enumerate() {
                ctx.queue
                    .write_buffer(buffer, self.stride * i as u64, bytemuck::bytes_of(batch));
            }
        }
        self.batches
    }

    /// Rebuilds the G-buffer input group after the G-buffer reallocates.
    fn sync_inputs(&mut self, ctx: &Context, gbuffer: &GBuffer) {
        let generation = gbuffer.attachment(GBufferSlot::Position).generation();
        if matches!(&self.inputs, Some((g, _)) if *g == generation) {
            return;
        }
        let (Some(position), Some(normal), Some(specular)) = (
            gbuffer.view(GBufferSlot::Position),
            gbuffer.view(GBufferSlot::Normal),
            gbuffer.view(GBufferSlot::Specular),
        ) else {
            self.inputs = None;
            return;
        };
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gbuffer_inputs_bind_group"),
            layout: &self.inputs_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(position),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(specular),
                },
            ],
        });
        self.inputs = Some((generation, bind_group));
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn inputs_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.inputs.as_ref().map(|(_, group)| group)
    }

    /// Bind group and dynamic offset of batch `index` from the last prepare.
    pub fn batch_bind_group(&self, index: usize) -> Option<(&wgpu::BindGroup, Option<u32>)> {
        if index >= self.batches {
            return None;
        }
        let offset = u32::try_from(self.stride * index as u64).ok()?;
        self.batch_bind_group.as_ref().map(|group| (group, Some(offset)))
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn dispose(&mut self) {
        self.lit.dispose();
        self.program.dispose();
        self.pipeline = None;
        self.inputs = None;
        self.batch_bind_group = None;
        if let Some(buffer) = self.batch_buffer.take() {
            buffer.destroy();
        }
        self.batch_capacity = 0;
        self.batches = 0;
    }
}
