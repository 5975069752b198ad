//! Geometry pass: rasterizes every instance into the G-buffer.
//!
//! Draws are grouped by material so each material's block and textures are
//! bound once. The camera is uploaded once per frame and instance matrices
//! go into a single instance buffer indexed by draw slot.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform},
    config::ShaderPolicy,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        material::{Material, MaterialUniform},
        model::{DeferredVertex, VertexLayout},
        scene::{Assets, InstanceId, MaterialId, Scene, TextureId},
        texture::{Attachment, Texture, create_sampler},
    },
    error::RenderError,
    pipelines::{Command, Geometry, Group, Load, Program, Target, mk_pipeline_layout, mk_render_pipeline, uniform_entry},
    shader::{CompiledProgram, ShaderProgram},
};

pub const VERTEX_SHADER: &str = include_str!("geometry.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("geometry.frag.wgsl");

/// Colour attachments of the G-buffer, in shader output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferSlot {
    Position,
    Normal,
    Albedo,
    Specular,
    Emissive,
    Reflection,
}

impl GBufferSlot {
    pub const ALL: [GBufferSlot; 6] = [
        GBufferSlot::Position,
        GBufferSlot::Normal,
        GBufferSlot::Albedo,
        GBufferSlot::Specular,
        GBufferSlot::Emissive,
        GBufferSlot::Reflection,
    ];

    /// World-space vectors need full float precision; colours fit in 8 bits.
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            GBufferSlot::Position | GBufferSlot::Normal => wgpu::TextureFormat::Rgba32Float,
            _ => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GBufferSlot::Position => "gbuffer position",
            GBufferSlot::Normal => "gbuffer normal",
            GBufferSlot::Albedo => "gbuffer albedo",
            GBufferSlot::Specular => "gbuffer specular",
            GBufferSlot::Emissive => "gbuffer emissive",
            GBufferSlot::Reflection => "gbuffer reflection",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Bytes per sample across all colour attachments
/// (two Rgba32Float plus four Rgba8Unorm, as counted by the device limit).
pub const GBUFFER_BYTES_PER_SAMPLE: u32 = 16 + 16 + 8 * 4;

pub const GBUFFER_CLEAR: wgpu::Color = wgpu::Color::TRANSPARENT;

#[derive(Debug)]
pub struct GBuffer {
    colors: [Attachment; 6],
    depth: Attachment,
}

impl Default for GBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GBuffer {
    pub fn new() -> Self {
        Self {
            colors: GBufferSlot::ALL.map(|slot| Attachment::new(slot.label(), slot.format())),
            depth: Attachment::new("gbuffer depth", Texture::DEPTH_FORMAT),
        }
    }

    /// Resizes every attachment. Returns true if anything was reallocated.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        let mut changed = false;
        for attachment in self.colors.iter_mut() {
            changed |= attachment.resize(device, width, height);
        }
        changed |= self.depth.resize(device, width, height);
        changed
    }

    pub fn attachment(&self, slot: GBufferSlot) -> &Attachment {
        &self.colors[slot.index()]
    }

    pub fn depth(&self) -> &Attachment {
        &self.depth
    }

    pub fn view(&self, slot: GBufferSlot) -> Option<&wgpu::TextureView> {
        self.attachment(slot).view()
    }

    pub fn color_views(&self) -> Option<Vec<&wgpu::TextureView>> {
        self.colors.iter().map(Attachment::view).collect()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.depth.size()
    }

    pub fn dispose(&mut self) {
        self.colors.iter_mut().for_each(Attachment::dispose);
        self.depth.dispose();
    }
}

/// Plan output: the commands plus which instance sits in each draw slot.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryPlan {
    pub commands: Vec<Command>,
    pub order: Vec<InstanceId>,
}

/// Builds the geometry pass for `scene`. Slot `i` of the instance buffer
/// holds `order[i]`.
pub fn plan(scene: &Scene) -> GeometryPlan {
    let mut commands = vec![
        Command::BeginPass {
            target: Target::GBuffer,
            load: Load::Clear(GBUFFER_CLEAR),
        },
        Command::SetProgram(Program::Geometry),
        Command::BindGroup {
            slot: 0,
            group: Group::Camera,
        },
    ];
    let mut order = Vec::with_capacity(scene.instances().len());
    for group in scene.groups() {
        commands.push(Command::BindGroup {
            slot: 1,
            group: Group::Material(group.material),
        });
        for id in group.instances {
            let Some(instance) = scene.instance(id) else {
                continue;
            };
            commands.push(Command::Draw(Geometry::Instance {
                mesh: instance.mesh(),
                slot: order.len() as u32,
            }));
            order.push(id);
        }
        commands.push(Command::UnbindGroup { slot: 1 });
    }
    commands.extend([
        Command::UnbindGroup { slot: 0 },
        Command::UnsetProgram,
        Command::EndPass,
    ]);
    GeometryPlan { commands, order }
}

#[derive(Debug)]
struct MaterialBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    revision: u64,
}

#[derive(Debug)]
pub struct GeometryPass {
    pub gbuffer: GBuffer,
    program: ShaderProgram,
    pipeline: Option<wgpu::RenderPipeline>,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    materials: HashMap<MaterialId, MaterialBinding>,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,
    white: Texture,
    white_cube: Texture,
    surface_sampler: wgpu::Sampler,
    cube_sampler: wgpu::Sampler,
}

impl GeometryPass {
    pub fn new(ctx: &Context, policy: ShaderPolicy) -> Result<Self, RenderError> {
        let device = &ctx.device;
        let compiled = CompiledProgram::compile("geometry", VERTEX_SHADER, FRAGMENT_SHADER, policy)?;
        let program = ShaderProgram::new(device, compiled);

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, false)],
        });
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let material_layout = material_layout(device);
        let layout = mk_pipeline_layout(
            device,
            "Geometry Pipeline Layout",
            &[&camera_layout, &material_layout],
        );
        let targets: Vec<_> = GBufferSlot::ALL
            .iter()
            .map(|slot| {
                Some(wgpu::ColorTargetState {
                    format: slot.format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();
        let pipeline = mk_render_pipeline(
            device,
            "Geometry Pipeline",
            &layout,
            &program,
            &targets,
            Some(Texture::DEPTH_FORMAT),
            &[DeferredVertex::desc(), InstanceRaw::desc()],
        );

        Ok(Self {
            gbuffer: GBuffer::new(),
            program,
            pipeline,
            camera_buffer,
            camera_bind_group,
            material_layout,
            materials: HashMap::new(),
            instance_buffer: None,
            instance_capacity: 0,
            white: Texture::solid(device, &ctx.queue, [255; 4], "white fallback"),
            white_cube: Texture::solid_cube(device, &ctx.queue, [255; 4], "white cube fallback"),
            surface_sampler: create_sampler(device, wgpu::AddressMode::Repeat),
            cube_sampler: create_sampler(device, wgpu::AddressMode::ClampToEdge),
        })
    }

    /// Uploads camera, materials and instance matrices for this frame.
    pub fn prepare(
        &mut self,
        ctx: &Context,
        scene: &Scene,
        assets: &Assets,
        camera: &Camera,
        order: &[InstanceId],
    ) {
        ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.uniform()]),
        );

        for (id, material) in scene.materials() {
            self.sync_material(ctx, assets, id, material);
        }

        let raws: Vec<InstanceRaw> = order
            .iter()
            .filter_map(|id| scene.instance(*id))
            .map(|instance| instance.to_raw())
            .collect();
        if raws.is_empty() {
            return;
        }
        if raws.len() > self.instance_capacity {
            let capacity = raws.len().next_power_of_two();
            self.instance_buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Instance Buffer"),
                size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.instance_capacity = capacity;
            log::debug!("instance buffer grown to {capacity} slots");
        }
        if let Some(buffer) = &self.instance_buffer {
            ctx.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raws));
        }
    }

    /// Re-uploads the material block (whole buffer) and rebuilds its bind
    /// group whenever the material changed since the last upload.
    fn sync_material(&mut self, ctx: &Context, assets: &Assets, id: MaterialId, material: &Material) {
        if let Some(binding) = self.materials.get(&id) {
            if binding.revision == material.revision() {
                return;
            }
        }
        let uniform: MaterialUniform = material.uniform();
        let buffer = match self.materials.remove(&id) {
            Some(binding) => {
                ctx.queue.write_buffer(&binding.buffer, 0, bytemuck::cast_slice(&[uniform]));
                binding.buffer
            }
            None => ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Material {} Buffer", id.0)),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }),
        };

        let [albedo, normal, specular, emissive, cube] = material.textures();
        let flat = |texture: Option<TextureId>| self.view_2d(assets, texture);
        let views = [flat(albedo), flat(normal), flat(specular), flat(emissive)];
        let cube_view = self.view_cube(assets, cube);

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        for (i, view) in views.into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.extend([
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::TextureView(cube_view),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: wgpu::BindingResource::Sampler(&self.surface_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 7,
                resource: wgpu::BindingResource::Sampler(&self.cube_sampler),
            },
        ]);
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material {} Bind Group", id.0)),
            layout: &self.material_layout,
            entries: &entries,
        });
        self.materials.insert(
            id,
            MaterialBinding {
                buffer,
                bind_group,
                revision: material.revision(),
            },
        );
    }

    fn view_2d<'a>(&'a self, assets: &'a Assets, id: Option<TextureId>) -> &'a wgpu::TextureView {
        match id.and_then(|id| assets.texture(id)) {
            Some(texture) if texture.texture.depth_or_array_layers() == 1 => &texture.view,
            Some(_) => {
                log::warn!("texture {id:?} is not a 2D texture; using the fallback");
                &self.white.view
            }
            None => &self.white.view,
        }
    }

    fn view_cube<'a>(&'a self, assets: &'a Assets, id: Option<TextureId>) -> &'a wgpu::TextureView {
        match id.and_then(|id| assets.texture(id)) {
            Some(texture) if texture.texture.depth_or_array_layers() == 6 => &texture.view,
            Some(_) => {
                log::warn!("texture {id:?} is not a cube map; using the fallback");
                &self.white_cube.view
            }
            None => &self.white_cube.view,
        }
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn camera_bind_group(&self) -> &wgpu::BindGroup {
        &self.camera_bind_group
    }

    pub fn material_bind_group(&self, id: MaterialId) -> Option<&wgpu::BindGroup> {
        self.materials.get(&id).map(|binding| &binding.bind_group)
    }

    pub fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.instance_buffer.as_ref()
    }

    pub fn dispose(&mut self) {
        self.gbuffer.dispose();
        self.program.dispose();
        self.pipeline = None;
        self.materials.clear();
        if let Some(buffer) = self.instance_buffer.take() {
            buffer.destroy();
        }
        self.instance_capacity = 0;
    }
}

fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding, view_dimension| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false),
            texture(1, wgpu::TextureViewDimension::D2),
            texture(2, wgpu::TextureViewDimension::D2),
            texture(3, wgpu::TextureViewDimension::D2),
            texture(4, wgpu::TextureViewDimension::D2),
            texture(5, wgpu::TextureViewDimension::Cube),
            sampler(6),
            sampler(7),
        ],
    })
}
