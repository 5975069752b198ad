//! Frame orchestration.
//!
//! A frame is Geometry, Lighting, Shadow, Output, recorded into one command
//! encoder and submitted once. The sequence itself is pure data
//! ([`frame_plan`]) so it can be checked without a device.

use crate::{
    camera::Camera,
    config::{OutputMode, RendererConfig},
    context::Context,
    data_structures::{
        light::batch_count,
        model::{Mesh, Triangle, Vertex},
        scene::{Assets, InstanceId, MeshId, Scene},
        texture::Attachment,
    },
    error::RenderError,
    pipelines::{
        self, Command, EncodeStats, Group, PassTarget, Program, Resolve, ScreenQuad, Target,
        geometry::{self, GBuffer, GeometryPass},
        lighting::{self, LightingPass},
        output::{self, OutputPass, OutputSources},
        shadow::{self, ShadowPass},
    },
};

/// Every command of one frame plus the data the plan was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub commands: Vec<Command>,
    /// Instance in each slot of the instance buffer.
    pub instance_order: Vec<InstanceId>,
    pub batches: usize,
}

pub fn frame_plan(scene: &Scene, light_count: usize, config: &RendererConfig) -> FramePlan {
    let geometry = geometry::plan(scene);
    let batches = batch_count(light_count, config.batch_capacity());
    let mut commands = geometry.commands;
    commands.extend(lighting::plan(batches));
    commands.extend(shadow::plan());
    commands.extend(output::plan(config.output));
    FramePlan {
        commands,
        instance_order: geometry.order,
        batches,
    }
}

#[derive(Debug)]
pub struct DeferredRenderer {
    config: RendererConfig,
    geometry: GeometryPass,
    lighting: LightingPass,
    shadow: ShadowPass,
    output: OutputPass,
    quad: ScreenQuad,
}

impl DeferredRenderer {
    /// Compiles every program and builds the pipelines. Attachments are
    /// allocated lazily on the first frame.
    pub fn new(ctx: &Context, config: RendererConfig) -> Result<Self, RenderError> {
        let policy = config.shader_policy;
        let renderer = Self {
            geometry: GeometryPass::new(ctx, policy)?,
            lighting: LightingPass::new(ctx, policy)?,
            shadow: ShadowPass::new(ctx, policy)?,
            output: OutputPass::new(ctx, ctx.format(), policy)?,
            quad: ScreenQuad::new(&ctx.device),
            config,
        };
        log::info!(
            "deferred renderer ready ({:?} shaders, {} lights per batch)",
            renderer.config.shader_policy,
            renderer.config.batch_capacity()
        );
        Ok(renderer)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Builds a mesh with this renderer's tangent policy.
    pub fn create_mesh(
        &self,
        ctx: &Context,
        name: &str,
        vertices: &[Vertex],
        triangles: &[Triangle],
    ) -> Result<Mesh, RenderError> {
        Mesh::new(&ctx.device, name, vertices, triangles, self.config.tangent_policy)
    }

    pub fn output_mode(&self) -> OutputMode {
        self.config.output
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        if self.config.output != mode {
            log::info!("output mode: {mode:?}");
        }
        self.config.output = mode;
    }

    pub fn toggle_output_mode(&mut self) {
        self.set_output_mode(self.config.output.toggled());
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.geometry.gbuffer
    }

    pub fn lit(&self) -> &Attachment {
        &self.lighting.lit
    }

    pub fn shadow(&self) -> &Attachment {
        &self.shadow.target
    }

    /// Renders one frame into `target`. Attachments follow the camera
    /// viewport; `camera.update` must have run for this frame.
    pub fn render(
        &mut self,
        ctx: &Context,
        scene: &Scene,
        assets: &Assets,
        camera: &Camera,
        target: &wgpu::TextureView,
    ) -> EncodeStats {
        let (width, height) = match camera.size() {
            (0, _) | (_, 0) => ctx.size(),
            size => size,
        };
        let resized = self.geometry.gbuffer.resize(&ctx.device, width, height)
            | self.lighting.lit.resize(&ctx.device, width, height)
            | self.shadow.target.resize(&ctx.device, width, height);
        if resized {
            log::debug!("attachments resized to {width}x{height}");
        }

        let plan = frame_plan(scene, scene.lights().len(), &self.config);
        self.geometry
            .prepare(ctx, scene, assets, camera, &plan.instance_order);
        self.lighting.prepare(
            ctx,
            &self.geometry.gbuffer,
            scene.lights(),
            lighting::view_direction(camera),
            self.config.batch_capacity(),
        );
        self.output.prepare(
            ctx,
            &OutputSources {
                gbuffer: &self.geometry.gbuffer,
                lit: &self.lighting.lit,
                shadow: &self.shadow.target,
            },
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Deferred Frame Encoder"),
            });
        let stats = pipelines::encode(
            &mut encoder,
            &plan.commands,
            &FrameResources {
                renderer: self,
                assets,
                frame: target,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));
        if stats.skipped > 0 {
            log::debug!("{} draws skipped this frame", stats.skipped);
        }
        stats
    }

    /// Acquires the surface texture, renders into it and presents.
    /// A lost or outdated surface is reconfigured and the frame dropped.
    pub fn render_to_surface(
        &mut self,
        ctx: &Context,
        scene: &Scene,
        assets: &Assets,
        camera: &Camera,
    ) -> Result<EncodeStats, RenderError> {
        let Some(surface) = &ctx.surface else {
            return Err(RenderError::Device("context has no surface".into()));
        };
        let frame = match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(frame)
            | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("surface lost or outdated; reconfiguring");
                ctx.reconfigure();
                return Ok(EncodeStats::default());
            }
            wgpu::CurrentSurfaceTexture::Timeout => {
                log::warn!("surface acquire timed out; dropping frame");
                return Ok(EncodeStats::default());
            }
            e => return Err(RenderError::Device(format!("surface error: {e:?}"))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let stats = self.render(ctx, scene, assets, camera, &view);
        frame.present();
        Ok(stats)
    }

    /// Releases every GPU resource the renderer owns. Calling it twice is
    /// harmless; rendering afterwards skips all draws.
    pub fn dispose(&mut self) {
        self.geometry.dispose();
        self.lighting.dispose();
        self.shadow.dispose();
        self.output.dispose();
    }
}

struct FrameResources<'a> {
    renderer: &'a DeferredRenderer,
    assets: &'a Assets,
    frame: &'a wgpu::TextureView,
}

impl Resolve for FrameResources<'_> {
    fn target(&self, target: Target) -> Option<PassTarget<'_>> {
        let r = self.renderer;
        match target {
            Target::GBuffer => Some(PassTarget {
                colors: r.geometry.gbuffer.color_views()?,
                depth: Some(r.geometry.gbuffer.depth().view()?),
            }),
            Target::Lighting => Some(PassTarget {
                colors: vec![r.lighting.lit.view()?],
                depth: None,
            }),
            Target::Shadow => Some(PassTarget {
                colors: vec![r.shadow.target.view()?],
                depth: None,
            }),
            Target::Frame => Some(PassTarget {
                colors: vec![self.frame],
                depth: None,
            }),
        }
    }

    fn pipeline(&self, program: Program) -> Option<&wgpu::RenderPipeline> {
        let r = self.renderer;
        match program {
            Program::Geometry => r.geometry.pipeline(),
            Program::Lighting => r.lighting.pipeline(),
            Program::Shadow => r.shadow.pipeline(),
            Program::Composite => r.output.pipeline(OutputMode::Composite),
            Program::Debug => r.output.pipeline(OutputMode::Debug),
        }
    }

    fn bind_group(&self, group: Group) -> Option<(&wgpu::BindGroup, Option<u32>)> {
        let r = self.renderer;
        match group {
            Group::Camera => Some((r.geometry.camera_bind_group(), None)),
            Group::Material(id) => r.geometry.material_bind_group(id).map(|g| (g, None)),
            Group::GBufferInputs => r.lighting.inputs_bind_group().map(|g| (g, None)),
            Group::LightBatch(index) => r.lighting.batch_bind_group(index),
            Group::CompositeInputs => r.output.composite_inputs().map(|g| (g, None)),
            Group::DebugTile(index) => r.output.debug_tile(index).map(|g| (g, None)),
        }
    }

    fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.assets.mesh(id).filter(|mesh| !mesh.is_disposed())
    }

    fn instances(&self) -> Option<&wgpu::Buffer> {
        self.renderer.geometry.instance_buffer()
    }

    fn quad(&self) -> &ScreenQuad {
        &self.renderer.quad
    }
}
