//! Surface description shared by many model instances.
//!
//! A [`Material`] references textures by id (it never owns them) and carries
//! optional override colours. The GPU-facing [`MaterialUniform`] is derived
//! lazily: every setter invalidates it and the next [`Material::uniform`]
//! call rebuilds it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::data_structures::{dirty::Dirty, scene::TextureId};

/// Source of material revisions. Shared by every material so a revision is
/// never handed out twice, even across materials swapped into one slot.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Material block as laid out in the geometry shader (96 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub albedo_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub emissive_color: [f32; 4],
    pub cube_color: [f32; 4],
    pub albedo_bound: i32,
    pub normal_bound: i32,
    pub specular_bound: i32,
    pub emissive_bound: i32,
    pub cube_bound: i32,
    // Uniform structs round up to 16 bytes
    _padding: [i32; 3],
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    albedo: Option<TextureId>,
    normal: Option<TextureId>,
    specular: Option<TextureId>,
    emissive: Option<TextureId>,
    cube: Option<TextureId>,
    albedo_color: Option<[f32; 4]>,
    specular_color: Option<[f32; 4]>,
    emissive_color: Option<[f32; 4]>,
    cube_color: Option<[f32; 4]>,
    uniform: Dirty<MaterialUniform>,
    revision: u64,
}

macro_rules! material_field {
    ($field:ident, $setter:ident, $builder:ident, $ty:ty) => {
        pub fn $field(&self) -> Option<$ty> {
            self.$field
        }

        pub fn $setter(&mut self, value: Option<$ty>) {
            self.$field = value;
            self.touch();
        }

        pub fn $builder(mut self, value: $ty) -> Self {
            self.$setter(Some(value));
            self
        }
    };
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    material_field!(albedo, set_albedo, with_albedo, TextureId);
    material_field!(normal, set_normal, with_normal, TextureId);
    material_field!(specular, set_specular, with_specular, TextureId);
    material_field!(emissive, set_emissive, with_emissive, TextureId);
    material_field!(cube, set_cube, with_cube, TextureId);
    material_field!(albedo_color, set_albedo_color, with_albedo_color, [f32; 4]);
    material_field!(specular_color, set_specular_color, with_specular_color, [f32; 4]);
    material_field!(emissive_color, set_emissive_color, with_emissive_color, [f32; 4]);
    material_field!(cube_color, set_cube_color, with_cube_color, [f32; 4]);

    fn touch(&mut self) {
        self.uniform.invalidate();
        self.revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
    }

    /// The uniform block for the current field values, rebuilt only if a
    /// setter ran since the last read.
    pub fn uniform(&self) -> MaterialUniform {
        self.uniform.get_or_rebuild(|| self.build_uniform())
    }

    pub fn is_dirty(&self) -> bool {
        self.uniform.is_dirty()
    }

    /// Number of uniform rebuilds so far.
    pub fn rebuilds(&self) -> u64 {
        self.uniform.rebuilds()
    }

    /// Replaced by every setter with a process-unique value; device-side
    /// caches compare it to decide when to upload again. Only untouched
    /// defaults and clones share a revision, and those share their contents.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Texture slots in binding order: albedo, normal, specular, emissive, cube.
    pub fn textures(&self) -> [Option<TextureId>; 5] {
        [
            self.albedo,
            self.normal,
            self.specular,
            self.emissive,
            self.cube,
        ]
    }

    fn build_uniform(&self) -> MaterialUniform {
        let color = |over: Option<[f32; 4]>, texture: Option<TextureId>| {
            over.unwrap_or(if texture.is_some() { WHITE } else { TRANSPARENT })
        };
        let flag = |texture: Option<TextureId>| texture.is_some() as i32;
        MaterialUniform {
            albedo_color: color(self.albedo_color, self.albedo),
            specular_color: color(self.specular_color, self.specular),
            emissive_color: color(self.emissive_color, self.emissive),
            cube_color: color(self.cube_color, self.cube),
            albedo_bound: flag(self.albedo),
            normal_bound: flag(self.normal),
            specular_bound: flag(self.specular),
            emissive_bound: flag(self.emissive),
            cube_bound: flag(self.cube),
            _padding: [0; 3],
        }
    }
}
