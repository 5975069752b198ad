//! Mesh construction with flat tangent space.
//!
//! Every triangle is expanded into three vertices that share the triangle's
//! tangent and bitangent, so the index buffer is simply `0..n`.

use std::ops::Range;

use cgmath::{InnerSpace, Vector2, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    config::TangentPolicy,
    error::{RenderError, ResourceKind},
};

/// Below this absolute UV determinant a triangle counts as degenerate.
pub const DEGENERATE_EPSILON: f32 = 1e-9;

/// Describes how a `Pod` vertex type is laid out in a vertex buffer.
pub trait VertexLayout {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Input vertex as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Three positional indices into a vertex slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle(pub [u32; 3]);

/// Expanded, interleaved vertex as stored on the GPU (14 floats).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DeferredVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexLayout for DeferredVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x3,
            3 => Float32x3,
            4 => Float32x2
        ];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<DeferredVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Tangent and bitangent of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vector3<f32>,
    pub bitangent: Vector3<f32>,
    /// True when the UV determinant was below [`DEGENERATE_EPSILON`].
    pub degenerate: bool,
}

/// Solves the UV-space system of a triangle against its two edges.
///
/// With `TangentPolicy::Propagate` a degenerate triangle yields whatever the
/// division produces; otherwise a basis orthogonal to the face normal is
/// substituted (the caller decides whether that is an error).
pub fn tangent_basis(a: &Vertex, b: &Vertex, c: &Vertex, policy: TangentPolicy) -> TangentBasis {
    let p0 = Vector3::from(a.position);
    let e1 = Vector3::from(b.position) - p0;
    let e2 = Vector3::from(c.position) - p0;

    let uv0 = Vector2::from(a.uv);
    let duv1 = Vector2::from(b.uv) - uv0;
    let duv2 = Vector2::from(c.uv) - uv0;

    let det = duv1.x * duv2.y - duv2.x * duv1.y;
    let degenerate = !(det.abs() >= DEGENERATE_EPSILON);
    if degenerate && policy != TangentPolicy::Propagate {
        let (tangent, bitangent) = fallback_basis(e1, e2, Vector3::from(a.normal));
        return TangentBasis {
            tangent,
            bitangent,
            degenerate,
        };
    }

    let f = 1.0 / det;
    TangentBasis {
        tangent: (e1 * duv2.y - e2 * duv1.y) * f,
        bitangent: (e1 * -duv2.x + e2 * duv1.x) * f,
        degenerate,
    }
}

fn fallback_basis(
    e1: Vector3<f32>,
    e2: Vector3<f32>,
    vertex_normal: Vector3<f32>,
) -> (Vector3<f32>, Vector3<f32>) {
    let face = e1.cross(e2);
    let normal = if face.magnitude2() > f32::EPSILON {
        face.normalize()
    } else if vertex_normal.magnitude2() > f32::EPSILON {
        vertex_normal.normalize()
    } else {
        Vector3::unit_z()
    };
    let helper = if normal.x.abs() > 0.9 {
        Vector3::unit_y()
    } else {
        Vector3::unit_x()
    };
    let tangent = (helper - normal * normal.dot(helper)).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}

/// Expands an indexed triangle list into per-triangle vertices carrying
/// the triangle's tangent space.
pub fn build_vertices(
    vertices: &[Vertex],
    triangles: &[Triangle],
    policy: TangentPolicy,
) -> Result<Vec<DeferredVertex>, RenderError> {
    let mut out = Vec::with_capacity(triangles.len() * 3);
    for (index, Triangle(corners)) in triangles.iter().enumerate() {
        let fetch = |i: u32| {
            vertices
                .get(i as usize)
                .ok_or_else(|| RenderError::not_found(ResourceKind::Vertex, i.to_string()))
        };
        let (a, b, c) = (fetch(corners[0])?, fetch(corners[1])?, fetch(corners[2])?);
        let basis = tangent_basis(a, b, c, policy);
        if basis.degenerate {
            match policy {
                TangentPolicy::Reject => {
                    return Err(RenderError::DegenerateGeometry { triangle: index });
                }
                TangentPolicy::Fallback => {
                    log::warn!("triangle {index} has degenerate UVs; using a normal-derived basis")
                }
                TangentPolicy::Propagate => {}
            }
        }
        for v in [a, b, c] {
            out.push(DeferredVertex {
                position: v.position,
                normal: v.normal,
                tangent: basis.tangent.into(),
                bitangent: basis.bitangent.into(),
                uv: v.uv,
            });
        }
    }
    Ok(out)
}

/// GPU vertex and index buffers for one expanded mesh.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    buffers: Option<(wgpu::Buffer, wgpu::Buffer)>,
    pub num_elements: u32,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[Vertex],
        triangles: &[Triangle],
        policy: TangentPolicy,
    ) -> Result<Self, RenderError> {
        let expanded = build_vertices(vertices, triangles, policy)?;
        let indices: Vec<u32> = (0..expanded.len() as u32).collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(&expanded),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            name: name.to_string(),
            buffers: Some((vertex_buffer, index_buffer)),
            num_elements: indices.len() as u32,
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.buffers.is_none()
    }

    /// Destroys both buffers. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some((vertex, index)) = self.buffers.take() {
            vertex.destroy();
            index.destroy();
        }
    }
}

/// Indexed draws of a [`Mesh`]. Program, bind groups and the instance
/// buffer (slot 1) must already be set on the pass.
pub trait DrawMesh {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: Range<u32>);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, instances: Range<u32>) {
        let Some((vertex, index)) = &mesh.buffers else {
            log::warn!("skipping draw of disposed mesh `{}`", mesh.name);
            return;
        };
        self.set_vertex_buffer(0, vertex.slice(..));
        self.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}
