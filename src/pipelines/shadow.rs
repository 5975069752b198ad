//! Shadow target.
//!
//! No shadow maps are computed yet. The pass fills its target with the
//! screen UV so the debug mosaic shows the target is wired up.

use crate::{
    config::ShaderPolicy,
    context::Context,
    data_structures::{model::VertexLayout, texture::Attachment},
    error::RenderError,
    pipelines::{
        Command, Geometry, Load, Program, ScreenVertex, Target, lighting::SCREEN_VERTEX_SHADER,
        mk_pipeline_layout, mk_render_pipeline,
    },
    shader::{CompiledProgram, ShaderProgram},
};

pub const FRAGMENT_SHADER: &str = include_str!("shadow.frag.wgsl");
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub fn plan() -> Vec<Command> {
    vec![
        Command::BeginPass {
            target: Target::Shadow,
            load: Load::Clear(wgpu::Color::BLACK),
        },
        Command::SetProgram(Program::Shadow),
        Command::Draw(Geometry::ScreenQuad),
        Command::UnsetProgram,
        Command::EndPass,
    ]
}

#[derive(Debug)]
pub struct ShadowPass {
    pub target: Attachment,
    program: ShaderProgram,
    pipeline: Option<wgpu::RenderPipeline>,
}

impl ShadowPass {
    pub fn new(ctx: &Context, policy: ShaderPolicy) -> Result<Self, RenderError> {
        let compiled =
            CompiledProgram::compile("shadow", SCREEN_VERTEX_SHADER, FRAGMENT_SHADER, policy)?;
        let program = ShaderProgram::new(&ctx.device, compiled);
        let layout = mk_pipeline_layout(&ctx.device, "Shadow Pipeline Layout", &[]);
        let pipeline = mk_render_pipeline(
            &ctx.device,
            "Shadow Pipeline",
            &layout,
            &program,
            &[Some(wgpu::ColorTargetState {
                format: SHADOW_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            None,
            &[ScreenVertex::desc()],
        );
        Ok(Self {
            target: Attachment::new("shadow", SHADOW_FORMAT),
            program,
            pipeline,
        })
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn dispose(&mut self) {
        self.target.dispose();
        self.program.dispose();
        self.pipeline = None;
    }
}
