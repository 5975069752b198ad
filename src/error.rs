//! Error taxonomy for the renderer.
//!
//! Construction-time failures (shader compilation, linking, device setup)
//! surface as [`RenderError`] and abort whatever was being built. Per-frame
//! binding mistakes are caught by the plan tracker in
//! [`crate::pipelines::state`] instead.

use std::fmt;

/// Shader stage a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// What kind of named resource a lookup was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Attribute,
    Uniform,
    UniformBlock,
    Vertex,
    Mesh,
    Material,
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Attribute => "attribute",
            ResourceKind::Uniform => "uniform",
            ResourceKind::UniformBlock => "uniform block",
            ResourceKind::Vertex => "vertex",
            ResourceKind::Mesh => "mesh",
            ResourceKind::Material => "material",
            ResourceKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    ShaderCompile { stage: Stage, diagnostic: String },

    #[error("shader program failed to link: {diagnostic}")]
    ShaderLink { diagnostic: String },

    #[error("{kind} `{name}` not found")]
    ResourceNotFound { kind: ResourceKind, name: String },

    #[error("triangle {triangle} has a degenerate UV parameterization")]
    DegenerateGeometry { triangle: usize },

    #[error("device error: {0}")]
    Device(String),

    #[error("readback failed: {0}")]
    Readback(String),
}

impl RenderError {
    pub(crate) fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        RenderError::ResourceNotFound {
            kind,
            name: name.into(),
        }
    }
}
