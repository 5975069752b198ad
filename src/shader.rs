//! Shader programs: compile and link on the CPU, realize on the device.
//!
//! [`CompiledProgram`] is pure data. It parses and validates the vertex and
//! fragment WGSL sources with `naga`, checks that the two stages agree on
//! their interface, and keeps a reflection table for name lookups.
//! [`ShaderProgram`] turns a valid compiled program into device modules.
//!
//! Which program is bound is not tracked here; passes express that in their
//! command plan (see [`crate::pipelines::Command`]).

use std::collections::BTreeMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::{
    config::ShaderPolicy,
    error::{RenderError, ResourceKind, Stage},
};

/// `(group, binding)` of a resource variable.
pub type BindingSlot = (u32, u32);

#[derive(Debug, Clone, PartialEq)]
struct Varying {
    location: u32,
    name: Option<String>,
    ty: naga::TypeInner,
}

#[derive(Debug, Clone, Default)]
struct Interface {
    varyings: Vec<Varying>,
    writes_position: bool,
}

/// Name tables gathered from both stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    attributes: BTreeMap<String, u32>,
    uniforms: BTreeMap<String, BindingSlot>,
    blocks: BTreeMap<String, BindingSlot>,
}

impl Reflection {
    fn collect_globals(&mut self, module: &naga::Module) {
        for (_, var) in module.global_variables.iter() {
            let (Some(name), Some(binding)) = (&var.name, &var.binding) else {
                continue;
            };
            let slot = (binding.group, binding.binding);
            self.uniforms.insert(name.clone(), slot);
            if var.space == naga::AddressSpace::Uniform {
                self.blocks.insert(name.clone(), slot);
                if let Some(type_name) = &module.types[var.ty].name {
                    self.blocks.insert(type_name.clone(), slot);
                }
            }
        }
    }

    fn collect_attributes(&mut self, inputs: &Interface) {
        for varying in &inputs.varyings {
            if let Some(name) = &varying.name {
                self.attributes.insert(name.clone(), varying.location);
            }
        }
    }
}

/// A vertex + fragment pair that has been parsed, validated and linked.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    label: String,
    vertex_source: String,
    fragment_source: String,
    reflection: Reflection,
    diagnostic: Option<String>,
}

impl CompiledProgram {
    /// Compiles both stages and links them.
    ///
    /// Under [`ShaderPolicy::Strict`] the first diagnostic is returned as an
    /// error. Under [`ShaderPolicy::Lenient`] it is logged and an invalid
    /// program is returned; lookups still work for whatever stage parsed.
    pub fn compile(
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        policy: ShaderPolicy,
    ) -> Result<Self, RenderError> {
        let mut reflection = Reflection::default();
        let vertex = compile_stage(Stage::Vertex, vertex_source);
        let fragment = compile_stage(Stage::Fragment, fragment_source);

        if let Ok(module) = &vertex {
            reflection.collect_globals(module);
            if let Some(ep) = entry_point(module, naga::ShaderStage::Vertex) {
                reflection.collect_attributes(&inputs_of(module, ep));
            }
        }
        if let Ok(module) = &fragment {
            reflection.collect_globals(module);
        }

        let outcome = match (&vertex, &fragment) {
            (Err(e), _) | (_, Err(e)) => Err(clone_error(e)),
            (Ok(v), Ok(f)) => link(v, f),
        };

        let diagnostic = match outcome {
            Ok(()) => None,
            Err(error) => match policy {
                ShaderPolicy::Strict => return Err(error),
                ShaderPolicy::Lenient => {
                    log::warn!("shader program `{label}` is unusable: {error}");
                    Some(error.to_string())
                }
            },
        };
        if diagnostic.is_none() {
            log::debug!("compiled shader program `{label}`");
        }

        Ok(Self {
            label: label.to_string(),
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            reflection,
            diagnostic,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// False when a lenient compile swallowed a diagnostic.
    pub fn is_valid(&self) -> bool {
        self.diagnostic.is_none()
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Location of a vertex input by argument or struct member name.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.reflection.attributes.get(name).copied()
    }

    /// Slot of any bound resource variable (buffers, textures, samplers).
    pub fn uniform_binding(&self, name: &str) -> Option<BindingSlot> {
        self.reflection.uniforms.get(name).copied()
    }

    /// Slot of a uniform block, by variable name or by its struct type name.
    pub fn uniform_block(&self, name: &str) -> Option<BindingSlot> {
        self.reflection.blocks.get(name).copied()
    }

    pub fn require_attribute(&self, name: &str) -> Result<u32, RenderError> {
        self.attribute_location(name)
            .ok_or_else(|| RenderError::not_found(ResourceKind::Attribute, name))
    }

    pub fn require_uniform(&self, name: &str) -> Result<BindingSlot, RenderError> {
        self.uniform_binding(name)
            .ok_or_else(|| RenderError::not_found(ResourceKind::Uniform, name))
    }

    pub fn require_block(&self, name: &str) -> Result<BindingSlot, RenderError> {
        self.uniform_block(name)
            .ok_or_else(|| RenderError::not_found(ResourceKind::UniformBlock, name))
    }
}

fn compile_stage(stage: Stage, source: &str) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| RenderError::ShaderCompile {
            stage,
            diagnostic: e.emit_to_string(source),
        })?;
    let wanted = match stage {
        Stage::Vertex => naga::ShaderStage::Vertex,
        Stage::Fragment => naga::ShaderStage::Fragment,
    };
    if entry_point(&module, wanted).is_none() {
        return Err(RenderError::ShaderCompile {
            stage,
            diagnostic: format!("no @{stage} entry point"),
        });
    }
    Ok(module)
}

fn clone_error(error: &RenderError) -> RenderError {
    match error {
        RenderError::ShaderCompile { stage, diagnostic } => RenderError::ShaderCompile {
            stage: *stage,
            diagnostic: diagnostic.clone(),
        },
        other => RenderError::ShaderLink {
            diagnostic: other.to_string(),
        },
    }
}

fn entry_point(module: &naga::Module, stage: naga::ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|ep| ep.stage == stage)
}

fn collect_binding(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    name: Option<&String>,
    out: &mut Interface,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.varyings.push(Varying {
            location: *location,
            name: name.cloned(),
            ty: module.types[ty].inner.clone(),
        }),
        Some(naga::Binding::BuiltIn(naga::BuiltIn::Position { .. })) => {
            out.writes_position = true;
        }
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_binding(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

fn inputs_of(module: &naga::Module, ep: &naga::EntryPoint) -> Interface {
    let mut interface = Interface::default();
    for arg in &ep.function.arguments {
        collect_binding(
            module,
            arg.ty,
            arg.binding.as_ref(),
            arg.name.as_ref(),
            &mut interface,
        );
    }
    interface
}

fn outputs_of(module: &naga::Module, ep: &naga::EntryPoint) -> Interface {
    let mut interface = Interface::default();
    if let Some(result) = &ep.function.result {
        collect_binding(module, result.ty, result.binding.as_ref(), None, &mut interface);
    }
    interface
}

/// Every fragment input must be written by the vertex stage with the same
/// type, and the vertex stage must write the clip position.
fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), RenderError> {
    let link_error = |diagnostic: String| RenderError::ShaderLink { diagnostic };
    let (Some(vs), Some(fs)) = (
        entry_point(vertex, naga::ShaderStage::Vertex),
        entry_point(fragment, naga::ShaderStage::Fragment),
    ) else {
        return Err(link_error("missing entry point".into()));
    };

    let outputs = outputs_of(vertex, vs);
    if !outputs.writes_position {
        return Err(link_error(format!(
            "vertex entry `{}` does not write @builtin(position)",
            vs.name
        )));
    }

    for input in inputs_of(fragment, fs).varyings {
        let label = input.name.as_deref().unwrap_or("<unnamed>");
        let Some(output) = outputs
            .varyings
            .iter()
            .find(|o| o.location == input.location)
        else {
            return Err(link_error(format!(
                "fragment input `{label}` at location {} is not written by the vertex stage",
                input.location
            )));
        };
        if output.ty != input.ty {
            return Err(link_error(format!(
                "fragment input `{label}` at location {} is {:?} but the vertex stage writes {:?}",
                input.location, input.ty, output.ty
            )));
        }
    }
    Ok(())
}

/// Device-side modules for a compiled program.
#[derive(Debug)]
pub struct ShaderProgram {
    compiled: CompiledProgram,
    modules: Option<(wgpu::ShaderModule, wgpu::ShaderModule)>,
}

impl ShaderProgram {
    /// Creates the stage modules. Invalid programs get no modules, so every
    /// pipeline built from them is skipped at draw time.
    pub fn new(device: &wgpu::Device, compiled: CompiledProgram) -> Self {
        let modules = compiled.is_valid().then(|| {
            let make = |suffix: &str, source: &str| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("{} {suffix}", compiled.label)),
                    source: wgpu::ShaderSource::Wgsl(source.to_string().into()),
                })
            };
            (
                make("vertex", &compiled.vertex_source),
                make("fragment", &compiled.fragment_source),
            )
        });
        Self { compiled, modules }
    }

    pub fn compiled(&self) -> &CompiledProgram {
        &self.compiled
    }

    pub fn is_valid(&self) -> bool {
        self.modules.is_some()
    }

    pub fn vertex(&self) -> Option<&wgpu::ShaderModule> {
        self.modules.as_ref().map(|(v, _)| v)
    }

    pub fn fragment(&self) -> Option<&wgpu::ShaderModule> {
        self.modules.as_ref().map(|(_, f)| f)
    }

    /// Drops the device modules. Repeated calls do nothing.
    pub fn dispose(&mut self) {
        if self.modules.take().is_some() {
            log::debug!("disposed shader program `{}`", self.compiled.label);
        }
    }
}
