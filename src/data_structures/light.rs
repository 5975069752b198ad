//! Light sources and their uniform wire format.
//!
//! All variants share one fixed-stride record ([`LightRaw`]) with a trailing
//! type tag; fields a variant does not use stay zero. Records are packed into
//! fixed-capacity [`LightBatch`] blocks, one lighting draw per batch.

use cgmath::{Deg, InnerSpace, Vector3};

/// Records per batch, matching the array length in the lighting shader.
pub const MAX_LIGHTS: usize = 512;

pub const KIND_NONE: i32 = 0;
pub const KIND_AMBIENT: i32 = 1;
pub const KIND_DIRECTIONAL: i32 = 2;
pub const KIND_POINT: i32 = 3;
pub const KIND_SPOT: i32 = 4;

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.045,
            quadratic: 0.0075,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    Directional {
        color: [f32; 3],
        intensity: f32,
        direction: Vector3<f32>,
    },
    Point {
        color: [f32; 3],
        intensity: f32,
        position: Vector3<f32>,
        attenuation: Attenuation,
    },
    Spot {
        color: [f32; 3],
        intensity: f32,
        position: Vector3<f32>,
        direction: Vector3<f32>,
        attenuation: Attenuation,
        /// Full intensity inside this angle from the axis.
        inner: Deg<f32>,
        /// Zero intensity outside this angle.
        outer: Deg<f32>,
    },
}

impl Light {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Light::Ambient { color, intensity }
    }

    pub fn directional(color: [f32; 3], intensity: f32, direction: Vector3<f32>) -> Self {
        Light::Directional {
            color,
            intensity,
            direction,
        }
    }

    pub fn point(color: [f32; 3], intensity: f32, position: Vector3<f32>) -> Self {
        Light::Point {
            color,
            intensity,
            position,
            attenuation: Attenuation::default(),
        }
    }

    pub fn spot(
        color: [f32; 3],
        intensity: f32,
        position: Vector3<f32>,
        direction: Vector3<f32>,
        inner: Deg<f32>,
        outer: Deg<f32>,
    ) -> Self {
        Light::Spot {
            color,
            intensity,
            position,
            direction,
            attenuation: Attenuation::default(),
            inner,
            outer,
        }
    }

    pub fn kind(&self) -> i32 {
        match self {
            Light::Ambient { .. } => KIND_AMBIENT,
            Light::Directional { .. } => KIND_DIRECTIONAL,
            Light::Point { .. } => KIND_POINT,
            Light::Spot { .. } => KIND_SPOT,
        }
    }

    pub fn to_raw(&self) -> LightRaw {
        let mut raw = LightRaw::zeroed_record();
        self.write_into(&mut raw);
        raw
    }

    /// Overwrites `raw` with this light. Fields the variant does not use are
    /// reset to zero.
    pub fn write_into(&self, raw: &mut LightRaw) {
        *raw = LightRaw::zeroed_record();
        raw.kind = self.kind();
        match *self {
            Light::Ambient { color, intensity } => {
                raw.color = rgbi(color, intensity);
            }
            Light::Directional {
                color,
                intensity,
                direction,
            } => {
                raw.color = rgbi(color, intensity);
                raw.direction = unit(direction);
            }
            Light::Point {
                color,
                intensity,
                position,
                attenuation,
            } => {
                raw.color = rgbi(color, intensity);
                raw.position = point(position);
                raw.set_attenuation(attenuation);
            }
            Light::Spot {
                color,
                intensity,
                position,
                direction,
                attenuation,
                inner,
                outer,
            } => {
                raw.color = rgbi(color, intensity);
                raw.position = point(position);
                raw.direction = unit(direction);
                raw.set_attenuation(attenuation);
                // The shader compares against dot products, so store cosines
                raw.cutoff_inner = cgmath::Rad::from(inner).0.cos();
                raw.cutoff_outer = cgmath::Rad::from(outer).0.cos();
            }
        }
    }
}

fn rgbi(color: [f32; 3], intensity: f32) -> [f32; 4] {
    [color[0], color[1], color[2], intensity]
}

fn point(v: Vector3<f32>) -> [f32; 4] {
    [v.x, v.y, v.z, 1.0]
}

fn unit(v: Vector3<f32>) -> [f32; 4] {
    let v = if v.magnitude2() > 0.0 { v.normalize() } else { v };
    [v.x, v.y, v.z, 0.0]
}

/// One light as seen by the lighting shader (80 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    /// rgb colour, intensity in `w`
    pub color: [f32; 4],
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub cutoff_inner: f32,
    pub cutoff_outer: f32,
    pub kind: i32,
    _padding: [f32; 2],
}

impl LightRaw {
    fn zeroed_record() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    fn set_attenuation(&mut self, attenuation: Attenuation) {
        self.constant = attenuation.constant;
        self.linear = attenuation.linear;
        self.quadratic = attenuation.quadratic;
    }
}

/// Uniform block uploaded once per lighting draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightBatch {
    pub lights: [LightRaw; MAX_LIGHTS],
    /// Unit vector from the scene toward the viewer.
    pub view_direction: [f32; 4],
    pub count: u32,
    _padding: [u32; 3],
}

impl LightBatch {
    pub fn empty(view_direction: Vector3<f32>) -> Self {
        let mut batch: Self = bytemuck::Zeroable::zeroed();
        batch.view_direction = unit(view_direction);
        batch
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn lights(&self) -> &[LightRaw] {
        &self.lights[..self.len()]
    }
}

/// Number of lighting draws needed for `lights` at `capacity` per batch.
pub fn batch_count(lights: usize, capacity: usize) -> usize {
    lights.div_ceil(capacity.clamp(1, MAX_LIGHTS))
}

/// Splits `lights` into consecutive batches of at most `capacity` records
/// (clamped to `1..=MAX_LIGHTS`), preserving order.
pub fn pack_batches(
    lights: &[Light],
    view_direction: Vector3<f32>,
    capacity: usize,
) -> Vec<LightBatch> {
    let capacity = capacity.clamp(1, MAX_LIGHTS);
    lights
        .chunks(capacity)
        .map(|chunk| {
            let mut batch = LightBatch::empty(view_direction);
            for (slot, light) in batch.lights.iter_mut().zip(chunk) {
                light.write_into(slot);
            }
            batch.count = chunk.len() as u32;
            batch
        })
        .collect()
}
