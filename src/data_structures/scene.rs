//! Flat scene model.
//!
//! [`Scene`] holds materials, model instances and lights in append-only
//! lists. GPU resources that instances and materials share (meshes,
//! textures) live in [`Assets`] and are referenced by id, so ownership stays
//! in one place.

use std::collections::HashMap;

use crate::data_structures::{
    instance::ModelInstance, light::Light, material::Material, model::Mesh, texture::Texture,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub usize);

/// Instances sharing one material, drawn back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialGroup {
    pub material: MaterialId,
    pub instances: Vec<InstanceId>,
}

#[derive(Debug, Default)]
pub struct Scene {
    materials: Vec<Material>,
    instances: Vec<ModelInstance>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_instance(&mut self, instance: ModelInstance) -> InstanceId {
        self.instances.push(instance);
        InstanceId(self.instances.len() - 1)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&ModelInstance> {
        self.instances.get(id.0)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut ModelInstance> {
        self.instances.get_mut(id.0)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }

    pub fn instances(&self) -> &[ModelInstance] {
        &self.instances
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// Groups instances by material. Groups appear in the order their
    /// material is first used; members keep insertion order.
    pub fn groups(&self) -> Vec<MaterialGroup> {
        let mut groups: Vec<MaterialGroup> = Vec::new();
        let mut index: HashMap<MaterialId, usize> = HashMap::new();
        for (i, instance) in self.instances.iter().enumerate() {
            let slot = *index.entry(instance.material()).or_insert_with(|| {
                groups.push(MaterialGroup {
                    material: instance.material(),
                    instances: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].instances.push(InstanceId(i));
        }
        groups
    }
}

/// Shared GPU resources referenced by scenes.
#[derive(Debug, Default)]
pub struct Assets {
    meshes: Vec<Mesh>,
    textures: Vec<Texture>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    /// Releases every mesh buffer. Textures are freed when dropped.
    pub fn dispose(&mut self) {
        self.meshes.iter_mut().for_each(Mesh::dispose);
    }
}
