//! Placed copies of a mesh.
//!
//! A [`ModelInstance`] pairs a mesh with a material (both shared, referenced
//! by id) and a position/rotation/scale. The model matrix is cached and only
//! recomputed after a setter has run.

use cgmath::{Matrix4, One, Quaternion, Vector3};

use crate::data_structures::{
    dirty::Dirty,
    model::VertexLayout,
    scene::{MaterialId, MeshId},
};

#[derive(Debug, Clone)]
pub struct ModelInstance {
    mesh: MeshId,
    material: MaterialId,
    position: Vector3<f32>,
    rotation: Quaternion<f32>,
    scale: Vector3<f32>,
    transform: Dirty<[[f32; 4]; 4]>,
}

impl ModelInstance {
    /// Instance at the origin with identity rotation and unit scale.
    pub fn new(mesh: MeshId, material: MaterialId) -> Self {
        Self {
            mesh,
            material,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            transform: Dirty::new(),
        }
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_mesh(&mut self, mesh: MeshId) {
        self.mesh = mesh;
    }

    pub fn set_material(&mut self, material: MaterialId) {
        self.material = material;
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.transform.invalidate();
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
        self.transform.invalidate();
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.transform.invalidate();
    }

    /// Model matrix `T * R * S`: scale first, then rotate, then translate.
    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
            .get_or_rebuild(|| {
                (Matrix4::from_translation(self.position)
                    * Matrix4::from(self.rotation)
                    * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z))
                .into()
            })
            .into()
    }

    pub fn is_dirty(&self) -> bool {
        self.transform.is_dirty()
    }

    pub fn rebuilds(&self) -> u64 {
        self.transform.rebuilds()
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.transform().into(),
        }
    }
}

/// Per-instance data as stored in the instance vertex buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl VertexLayout for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance, not per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // A mat4 occupies four vec4 slots
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}
